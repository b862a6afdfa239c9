use rmcp::{ServiceExt, transport::stdio};
use showgrid_mcp::McpServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, so logs go to stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .write_style(env_logger::WriteStyle::Never)
        .init();

    let server = McpServer::new()
        .inspect_err(|e| log::error!("Cannot build the pricing clients: {e}"))?;

    log::info!("showgrid MCP server listening on stdio");

    let running = server
        .serve(stdio())
        .await
        .inspect_err(|e| log::error!("stdio handshake failed: {e}"))?;

    let reason = running.waiting().await?;
    log::info!("showgrid MCP server stopped: {reason:?}");

    Ok(())
}
