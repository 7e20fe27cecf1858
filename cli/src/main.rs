//! pagerduty-mcp: PagerDuty REST API as MCP tools.
//!
//! Serves over stdio by default (for desktop MCP clients), or over HTTP with
//! `--http`. Write tools stay hidden unless `--enable-write-tools` is given.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use pagerduty_mcp::{
    compose, router, serve_http, serve_stdio, AllowAll, Authorizer, ClientConfig, Dispatcher,
    FileConfig, PagerDutyClient, Policy, RemoteAuthorizer,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// PagerDuty MCP server.
#[derive(Parser)]
#[command(
    name = "pagerduty-mcp",
    version,
    about = "PagerDuty MCP server: incidents, services, schedules and more as MCP tools"
)]
struct Cli {
    /// Expose tools that create, change or delete PagerDuty resources
    #[arg(long, env = "PAGERDUTY_MCP_ENABLE_WRITE_TOOLS")]
    enable_write_tools: bool,

    /// Serve JSON-RPC over HTTP instead of stdio
    #[arg(long)]
    http: bool,

    /// HTTP bind address [default: 127.0.0.1]
    #[arg(long, env = "PAGERDUTY_MCP_HOST")]
    host: Option<String>,

    /// HTTP port [default: 3000]
    #[arg(short, long, env = "PAGERDUTY_MCP_PORT")]
    port: Option<u16>,

    /// Delegate HTTP authorization to this URL instead of accepting any header
    #[arg(long, env = "PAGERDUTY_MCP_AUTH_URL")]
    auth_url: Option<String>,

    /// Path to a config file [default: ./pagerduty-mcp.toml or ~/.config/pagerduty-mcp/config.toml]
    #[arg(short, long, env = "PAGERDUTY_MCP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the stdio protocol stream, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "Failed to load .env file");
        }
    }

    let cli = Cli::parse();
    let cancel = CancellationToken::new();

    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutting down pagerduty-mcp...");
        cancel_for_signal.cancel();
    });

    let file = match resolve_config(cli.config.clone()) {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading config file");
            FileConfig::load(&path).await?
        }
        None => FileConfig::default(),
    };

    let client_config = ClientConfig::resolve(|key| std::env::var(key).ok(), &file)?;
    let client = PagerDutyClient::new(client_config)?;

    let enable_write_tools = cli.enable_write_tools || file.enable_write_tools.unwrap_or(false);
    let policy = Policy::with_write_tools(enable_write_tools);
    let catalog = compose(policy)?;
    if policy.enable_write_tools {
        eprintln!(
            "pagerduty-mcp: write tools ENABLED ({} tools); agents can modify PagerDuty resources",
            catalog.len()
        );
    } else {
        eprintln!(
            "pagerduty-mcp: read-only mode ({} tools); pass --enable-write-tools to allow changes",
            catalog.len()
        );
    }

    let dispatcher = Dispatcher::new(catalog, client);

    if cli.http {
        run_http(&cli, &file, dispatcher, cancel).await
    } else {
        serve_stdio(dispatcher, cancel).await?;
        Ok(())
    }
}

async fn run_http(
    cli: &Cli,
    file: &FileConfig,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
) -> Result<()> {
    let host = cli
        .host
        .clone()
        .or_else(|| file.http.host.clone())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = cli.port.or(file.http.port).unwrap_or(DEFAULT_PORT);

    let authorizer: Arc<dyn Authorizer> =
        match cli.auth_url.clone().or_else(|| file.http.auth_url.clone()) {
            Some(url) => {
                tracing::info!(auth_url = %url, "Delegating authorization");
                Arc::new(RemoteAuthorizer::new(url, AUTH_TIMEOUT)?)
            }
            None => {
                tracing::warn!(
                    "No auth URL configured; any non-empty Authorization header is accepted"
                );
                Arc::new(AllowAll)
            }
        };

    let app = router(dispatcher, authorizer, cancel.clone());
    let addr = format!("{host}:{port}");
    eprintln!("pagerduty-mcp: listening on http://{addr} (health: http://{addr}/health)");
    serve_http(&addr, app, cancel).await?;
    Ok(())
}

/// Resolve the config file path: explicit flag → ./pagerduty-mcp.toml →
/// <config_dir>/pagerduty-mcp/config.toml. No file is fine.
fn resolve_config(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }

    let local = Path::new("pagerduty-mcp.toml");
    if local.exists() {
        return Some(local.to_path_buf());
    }

    dirs::config_dir()
        .map(|dir| dir.join("pagerduty-mcp").join("config.toml"))
        .filter(|path| path.exists())
}
