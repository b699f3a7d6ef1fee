//! TCP server for the exercise adapter
//!
//! Each connection gets its own [`Session`]. Inbound lines and the host clock are
//! multiplexed with `tokio::select!` inside the connection task, so a tick and a drop can
//! never run concurrently against the same exercise.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::logging::LogFormat;
use crate::protocol::ServerMessage;
use crate::session::Session;
use crate::types::DEFAULT_TIME_LIMIT_SECS;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Host clock period; 0 disables server-side ticking (clients send `tick` themselves)
    pub tick_ms: u64,
    pub default_time_limit: u32,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            tick_ms: 1000,
            default_time_limit: DEFAULT_TIME_LIMIT_SECS,
            log_format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    /// Create from `CODE_ARRANGE_*` environment variables
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();

        let host = env::var("CODE_ARRANGE_HOST").unwrap_or(defaults.host);
        let port = env::var("CODE_ARRANGE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);
        let tick_ms = env::var("CODE_ARRANGE_TICK_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.tick_ms);
        let default_time_limit = env::var("CODE_ARRANGE_DEFAULT_TIME_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&secs: &u32| secs > 0)
            .unwrap_or(defaults.default_time_limit);
        let log_format = env::var("CODE_ARRANGE_LOG")
            .ok()
            .and_then(|s| LogFormat::from_str(s.trim()))
            .unwrap_or(defaults.log_format);

        Self {
            host,
            port,
            tick_ms,
            default_time_limit,
            log_format,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

/// Fail fast when the port is already taken
pub fn check_tcp_listen_available(host: &str, port: u16) -> std::io::Result<()> {
    let listener = std::net::TcpListener::bind((host, port))?;
    drop(listener);
    Ok(())
}

/// Accept connections until the listener fails
///
/// `ready_tx` receives the bound address once listening (useful with port 0).
pub async fn run_server(
    config: ServerConfig,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr).await?;
    let bound = listener.local_addr()?;
    info!(addr = %bound, "listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let mut client_id_counter = 0usize;
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;
        info!(client_id, %addr, "client connected");

        let config = config.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, &config).await {
                warn!(client_id, error = %e, "client error");
            }
            info!(client_id, "client disconnected");
        });
    }
}

/// Handle a single client connection
async fn handle_client(socket: TcpStream, config: &ServerConfig) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut session = Session::new(config.default_time_limit);

    let clock_enabled = config.tick_ms > 0;
    let mut clock = interval(Duration::from_millis(config.tick_ms.max(1)));
    clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();
    let mut buf: Vec<u8> = Vec::with_capacity(4096);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let was_active = session.is_active();
                let replies = session.handle_line(line);
                if !was_active && session.is_active() {
                    // The clock starts counting from the moment the exercise goes active.
                    last_tick = Instant::now();
                }
                write_messages(&mut writer, &mut buf, &replies).await?;
            }
            _ = clock.tick(), if clock_enabled => {
                let now = Instant::now();
                let elapsed = now.duration_since(last_tick).as_millis() as u64;
                last_tick = now;
                let updates = session.advance_clock(elapsed);
                if !updates.is_empty() {
                    debug!(count = updates.len(), "clock observations");
                }
                write_messages(&mut writer, &mut buf, &updates).await?;
            }
        }
    }
    Ok(())
}

async fn write_messages<W>(
    writer: &mut W,
    buf: &mut Vec<u8>,
    messages: &[ServerMessage],
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if messages.is_empty() {
        return Ok(());
    }
    buf.clear();
    for msg in messages {
        serde_json::to_writer(&mut *buf, msg)?;
        buf.push(b'\n');
    }
    writer.write_all(&buf[..]).await?;
    writer.flush().await?;
    Ok(())
}
