use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::EnvError;
use crate::config::{Config, get_config_dir};
use crate::mcp::create_mcp_server;
use crate::mcp::http::serve_http;

/// Transport the MCP server listens on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http { bind_addr: String },
}

/// Command-line options for starting the server
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    /// Serve over HTTP instead of stdio
    pub sse: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config_dir: Option<PathBuf>,
}

/// Load the configuration and apply command-line overrides
#[inline]
pub fn resolve_config(options: &ServeOptions) -> crate::Result<Config> {
    let config_dir = match &options.config_dir {
        Some(dir) => dir.clone(),
        None => get_config_dir()?,
    };

    let mut config = Config::load(&config_dir)
        .context("Failed to load configuration")
        .map_err(EnvError::Other)?;

    if let Some(host) = &options.host {
        config.server.set_host(host.clone())?;
    }
    if let Some(port) = options.port {
        config.server.set_port(port)?;
    }

    Ok(config)
}

/// Decide which transport to run from the options and configuration
#[inline]
pub fn select_transport(options: &ServeOptions, config: &Config) -> Transport {
    if options.sse {
        Transport::Http {
            bind_addr: config.server.bind_address(),
        }
    } else {
        Transport::Stdio
    }
}

/// Start the MCP server and block until the transport closes
#[inline]
pub async fn serve_mcp(options: ServeOptions) -> Result<()> {
    let config = resolve_config(&options)?;
    let server = Arc::new(create_mcp_server(&config).await);

    info!(
        "{} v{} using AQHI feed {}",
        server.server_info.name, server.server_info.version, config.feed.aqhi_url
    );

    match select_transport(&options, &config) {
        Transport::Stdio => server.serve_stdio().await,
        Transport::Http { bind_addr } => serve_http(server, &bind_addr).await,
    }
}
