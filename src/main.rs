//! Exercise server (default binary).
//!
//! Listens for line-delimited JSON clients and hosts one code-ordering exercise per
//! connection. Configuration comes from `CODE_ARRANGE_*` environment variables.

use anyhow::{Context, Result};
use tracing::info;

use code_arrange::adapter::{
    check_tcp_listen_available, init_logging, run_server, LogConfig, ServerConfig,
};

fn main() -> Result<()> {
    let config = ServerConfig::from_env();
    init_logging(&LogConfig::default().with_format(config.log_format))?;

    check_tcp_listen_available(&config.host, config.port)
        .with_context(|| format!("cannot listen on {}:{}", config.host, config.port))?;

    info!(
        tick_ms = config.tick_ms,
        default_time_limit = config.default_time_limit,
        "starting exercise server"
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_server(config, None))
}
