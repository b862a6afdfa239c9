use std::io;

use anyhow::Context;
use rmcp::transport::{
    StreamableHttpServerConfig, StreamableHttpService,
    streamable_http_server::session::local::LocalSessionManager,
};
use showgrid_mcp::McpServer;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8055";
const MCP_PATH: &str = "/mcp";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .write_style(env_logger::WriteStyle::Never)
        .init();

    let shutdown = CancellationToken::new();

    // One server per MCP session; each gets its own HTTP clients.
    let service = StreamableHttpService::new(
        || {
            McpServer::new().map_err(|e| {
                log::error!("Cannot start a pricing session: {e}");
                io::Error::other(e.to_string())
            })
        },
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            cancellation_token: shutdown.child_token(),
            ..Default::default()
        },
    );

    let address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.into());
    let app = axum::Router::new()
        .nest_service(MCP_PATH, service)
        .layer(CorsLayer::permissive());
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("cannot bind {address}"))?;

    log::info!("showgrid MCP server ready at http://{address}{MCP_PATH}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => log::info!("Shutting down, closing MCP sessions"),
                Err(e) => log::warn!("Ctrl-C handler unavailable ({e}), shutting down"),
            }
            shutdown.cancel();
        })
        .await
        .context("HTTP server stopped with an error")?;

    Ok(())
}
