use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

use code_arrange::adapter::server::{run_server, ServerConfig};

type Lines = tokio::io::Lines<BufReader<OwnedReadHalf>>;

async fn spawn_server(tick_ms: u64) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tick_ms,
        ..ServerConfig::default()
    };
    let (ready_tx, ready_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        let _ = run_server(config, Some(ready_tx)).await;
    });

    let addr = tokio::time::timeout(Duration::from_secs(2), ready_rx)
        .await
        .expect("server did not signal ready")
        .expect("ready channel dropped");
    (server_handle, addr)
}

async fn connect(addr: SocketAddr) -> (Lines, OwnedWriteHalf) {
    let stream = TcpStream::connect(addr).await.expect("connect failed");
    let (read_half, write_half) = stream.into_split();
    (BufReader::new(read_half).lines(), write_half)
}

async fn send(writer: &mut OwnedWriteHalf, value: serde_json::Value) {
    let line = serde_json::to_string(&value).unwrap();
    writer.write_all(line.as_bytes()).await.unwrap();
    writer.write_all(b"\n").await.unwrap();
    writer.flush().await.unwrap();
}

async fn read_json_line(lines: &mut Lines) -> serde_json::Value {
    let line = tokio::time::timeout(Duration::from_secs(3), lines.next_line())
        .await
        .expect("timeout waiting for line")
        .expect("io error")
        .expect("expected line");
    serde_json::from_str(&line).expect("invalid json")
}

#[tokio::test]
async fn adapter_load_play_and_complete() {
    let (server_handle, addr) = spawn_server(0).await;
    let (mut lines, mut writer) = connect(addr).await;

    send(
        &mut writer,
        serde_json::json!({"type": "load", "seq": 1, "ts": 0, "source": "a\n  b\nc", "difficulty": "easy", "seed": 3}),
    )
    .await;
    let ack = read_json_line(&mut lines).await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["request_seq"], 1);
    let obs = read_json_line(&mut lines).await;
    assert_eq!(obs["type"], "observation");
    assert_eq!(obs["status"], "waiting");
    assert_eq!(obs["total"], 3);

    send(&mut writer, serde_json::json!({"type": "command", "seq": 2, "command": "start"})).await;
    assert_eq!(read_json_line(&mut lines).await["type"], "ack");
    assert_eq!(read_json_line(&mut lines).await["status"], "active");

    for (seq, (id, index)) in [("block-0", 0), ("block-1", 1), ("block-2", 2)].into_iter().enumerate() {
        send(
            &mut writer,
            serde_json::json!({"type": "command", "seq": 3 + seq, "command": "drop", "fragment_id": id, "index": index}),
        )
        .await;
        assert_eq!(read_json_line(&mut lines).await["type"], "ack");
        let obs = read_json_line(&mut lines).await;
        assert_eq!(obs["correct_prefix"], index + 1);
    }

    // The last observation above was the completing one; a late drop is rejected.
    send(
        &mut writer,
        serde_json::json!({"type": "command", "seq": 9, "command": "withdraw", "fragment_id": "block-2"}),
    )
    .await;
    let err = read_json_line(&mut lines).await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "invalid_transition");
    assert_eq!(err["request_seq"], 9);

    server_handle.abort();
}

#[tokio::test]
async fn adapter_host_clock_fails_exercise() {
    let (server_handle, addr) = spawn_server(50).await;
    let (mut lines, mut writer) = connect(addr).await;

    send(
        &mut writer,
        serde_json::json!({"type": "load", "seq": 1, "source": "a\nb", "time_limit": 1}),
    )
    .await;
    read_json_line(&mut lines).await;
    read_json_line(&mut lines).await;

    send(&mut writer, serde_json::json!({"type": "command", "seq": 2, "command": "start"})).await;
    assert_eq!(read_json_line(&mut lines).await["type"], "ack");
    assert_eq!(read_json_line(&mut lines).await["status"], "active");

    // The next unsolicited observation is the clock expiring the single second.
    let obs = read_json_line(&mut lines).await;
    assert_eq!(obs["status"], "failed");
    assert_eq!(obs["time_remaining"], 0);
    assert_eq!(obs["cues"][0]["kind"], "failed");

    server_handle.abort();
}

#[tokio::test]
async fn adapter_connections_are_isolated() {
    let (server_handle, addr) = spawn_server(0).await;
    let (mut lines_a, mut writer_a) = connect(addr).await;
    let (mut lines_b, mut writer_b) = connect(addr).await;

    send(&mut writer_a, serde_json::json!({"type": "load", "seq": 1, "source": "x\ny"})).await;
    read_json_line(&mut lines_a).await;
    read_json_line(&mut lines_a).await;

    send(&mut writer_b, serde_json::json!({"type": "command", "seq": 1, "command": "start"})).await;
    let err = read_json_line(&mut lines_b).await;
    assert_eq!(err["code"], "no_exercise");

    send(&mut writer_b, serde_json::json!({"type": "nonsense", "seq": 2})).await;
    assert_eq!(read_json_line(&mut lines_b).await["code"], "invalid_command");

    server_handle.abort();
}
