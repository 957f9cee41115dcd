use clap::Parser;
use hk_environment_mcp_server::Result;
use hk_environment_mcp_server::commands::{ServeOptions, serve_mcp};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hk_environment_mcp_server")]
#[command(about = "HK Environment MCP Server")]
#[command(version)]
struct Cli {
    /// Run the streamable HTTP transport instead of stdio
    #[arg(short, long)]
    sse: bool,
    /// Host to bind the HTTP transport to (default from config: 127.0.0.1)
    #[arg(long)]
    host: Option<String>,
    /// Port to bind the HTTP transport to (default from config: 8000)
    #[arg(long)]
    port: Option<u16>,
    /// Directory containing config.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

impl From<Cli> for ServeOptions {
    fn from(cli: Cli) -> Self {
        Self {
            sse: cli.sse,
            host: cli.host,
            port: cli.port,
            config_dir: cli.config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the stdio transport, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    serve_mcp(cli.into()).await?;

    Ok(())
}
