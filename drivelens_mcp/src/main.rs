use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drivelens_core::{
    mcp_server::{JsonRpcHandler, McpServer},
    transport::StdioTransport,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries JSON-RPC, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drivelens_mcp=info,drivelens_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting drivelens MCP server");

    let registry = match drivelens_core::build_registry().await {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to build connector registry: {}", e);
            return Err(e.into());
        }
    };
    let registry = Arc::new(Mutex::new(registry));

    let handler = JsonRpcHandler::new(McpServer::new(registry));
    let transport = StdioTransport::new(handler);

    info!("MCP server ready, listening on stdio");

    tokio::select! {
        res = transport.run() => {
            if let Err(e) = res {
                error!("Transport error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}
