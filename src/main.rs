mod availability;
mod booking;
mod config;
mod error;
mod server;

use anyhow::Result;
use rmcp::ServiceExt;

use crate::config::AgendaConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AgendaConfig::from_env()?;

    // stdout carries the MCP stdio transport
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!(
        tick_minutes = config.tick_minutes,
        utc_offset_seconds = config.timezone.offset().local_minus_utc(),
        horizon_days = config.limits.horizon_days,
        "Starting Agenda MCP server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let server = server::AgendaServer::new(&config);
    let router = server.into_router();
    let service = router.serve(rmcp::transport::io::stdio()).await?;

    tracing::info!("Agenda is ready");
    service.waiting().await?;

    Ok(())
}
