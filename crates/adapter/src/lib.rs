//! Adapter module - drive code-ordering exercises over a TCP socket with JSON lines
//!
//! The core crate is pure logic with no clock and no I/O. This crate is the host: it
//! parses client messages, owns one exercise per connection, ticks it from a timer and
//! streams observations back.
//!
//! # Protocol Overview
//!
//! The adapter implements a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Client connects to TCP socket (default: 127.0.0.1:7878)
//! 2. **Load**: Client sends `load` with the source code; the server replies `ack` and an
//!    `observation` of the waiting exercise
//! 3. **Commanding**: Client sends `command` messages (`start`, `drop`, `withdraw`, ...)
//! 4. **Observation Streaming**: Every change, including host clock ticks, produces an
//!    `observation` with the full snapshot and any derived cues
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **load**: `source`, optional `time_limit`, `difficulty`, `seed`
//! - **command**: `command` plus `fragment_id`, `index`, `pointer_y`/`positions` or
//!   `elapsed` as the command needs
//!
//! ## Server → Client
//!
//! - **ack**: Command acknowledgment (`request_seq` echoes the client's seq)
//! - **error**: Error response with a stable `code` and message
//! - **observation**: Exercise snapshot, progress facts and cues
//!
//! # Environment Variables
//!
//! - `CODE_ARRANGE_HOST`: Bind address (default: "127.0.0.1")
//! - `CODE_ARRANGE_PORT`: Port number (default: 7878)
//! - `CODE_ARRANGE_TICK_MS`: Host clock period in ms, 0 to disable (default: 1000)
//! - `CODE_ARRANGE_DEFAULT_TIME_LIMIT`: Seconds when `load` omits one (default: 120)
//! - `CODE_ARRANGE_LOG`: `pretty`, `compact` or `json` (default: compact)
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"load","seq":1,"ts":0,"source":"fn main() {\n    run();\n}","difficulty":"easy"}
//! Server -> Client: {"type":"ack","seq":1,"ts":1234567890,"request_seq":1}
//! Server -> Client: {"type":"observation","seq":2,"ts":1234567890,"status":"waiting",...}
//! Client -> Server: {"type":"command","seq":2,"ts":0,"command":"start"}
//! Client -> Server: {"type":"command","seq":3,"ts":0,"command":"drop","fragment_id":"block-0","index":0}
//! Server -> Client: {"type":"observation",...,"cues":[{"kind":"score","delta":10}]}
//! ```
//!
//! # Testing
//!
//! ```bash
//! nc 127.0.0.1 7878
//! {"type":"load","seq":1,"source":"a\nb\nc"}
//! ```

pub mod cues;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod session;

pub use code_arrange_core as core;
pub use code_arrange_types as types;

// Re-export protocol types for convenience
pub use cues::{derive_cues, Cue};
pub use logging::{init_logging, LogConfig, LogFormat};
pub use protocol::*;
pub use server::*;
pub use session::Session;
