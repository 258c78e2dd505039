//! MCP server over stdio: one JSON-RPC request per input line, one response
//! per output line. Logs go to stderr.

use agentlink_gateway::bootstrap::{init_tracing, Services};
use agentlink_gateway::config::Config;
use agentlink_gateway::mcp::McpServer;
use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(true);

    let config = Config::from_env()?;
    let services = Services::from_config(&config)?;
    let io = McpServer::new(services.converter).into_handler();
    tracing::info!("MCP server ready on stdio");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = io.handle_request(&line).await {
            stdout
                .write_all(format!("{}\n", response).as_bytes())
                .await
                .context("Failed to write response")?;
            stdout.flush().await.context("Failed to flush stdout")?;
        }
    }

    tracing::info!("stdin closed, MCP server exiting");
    Ok(())
}
