//! secure-headers
//!
//! Validate a security header configuration, preview the headers it
//! produces, or serve a demo app behind the security headers layer.
//!
//! ```text
//!                 ┌────────────────────────────────────────────────┐
//!   config.toml ─▶│ loader → validation → HeaderPlan::from_config  │
//!                 └───────────────────────┬────────────────────────┘
//!                                         │
//!        check ◀── errors ────────────────┤
//!        render ◀── HeaderPlan::preview ──┤
//!                                         ▼
//!   Client ──▶ TraceLayer ──▶ SecureHeadersLayer ──▶ demo handlers
//!                                 ▲
//!                 ConfigWatcher ──┘ (PlanHandle::store on change)
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use secure_headers::config::{load_config, validate_config, AppConfig, ConfigError, ConfigWatcher};
use secure_headers::lifecycle::{signals, Shutdown};
use secure_headers::observability::{logging, metrics};
use secure_headers::plan::{HeaderPlan, RequestContext};
use secure_headers::policy::Nonce;
use secure_headers::HttpServer;

#[derive(Parser)]
#[command(name = "secure-headers", version)]
#[command(about = "Security headers for HTTP responses", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and report every error
    Check,
    /// Print the headers a request would receive
    Render {
        /// Request path
        #[arg(long, default_value = "/")]
        path: String,

        /// Request host
        #[arg(long)]
        host: Option<String>,

        /// Treat the request as a WebSocket upgrade
        #[arg(long)]
        websocket: bool,

        /// Print JSON instead of header lines
        #[arg(long)]
        json: bool,
    },
    /// Run the demo server with hot reload
    Serve,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match read_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(ConfigError::Validation(errors)) => {
            eprintln!("Configuration is invalid:");
            for error in &errors {
                eprintln!("  - {error}");
            }
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    match cli.command {
        Commands::Check => {
            let plan = HeaderPlan::from_config(&config.headers)?;
            println!("OK: {} security headers planned", plan.len());
            for name in plan.header_names() {
                println!("  {name}");
            }
        }
        Commands::Render {
            path,
            host,
            websocket,
            json,
        } => render(&config, &path, host.as_deref(), websocket, json)?,
        Commands::Serve => serve(config, cli.config).await?,
    }

    Ok(ExitCode::SUCCESS)
}

fn read_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = AppConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

fn render(
    config: &AppConfig,
    path: &str,
    host: Option<&str>,
    websocket: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let plan = HeaderPlan::from_config(&config.headers)?;
    let nonce = plan.nonce_bytes().map(Nonce::generate);
    let ctx = RequestContext {
        path,
        host,
        websocket,
        nonce: nonce.as_ref(),
    };

    let headers = plan.preview(&ctx);
    if as_json {
        let entries: Vec<_> = headers
            .iter()
            .map(|(name, value)| {
                json!({
                    "name": name.as_str(),
                    "value": value.to_str().unwrap_or_default(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for (name, value) in &headers {
            println!("{}: {}", name, value.to_str().unwrap_or_default());
        }
    }
    Ok(())
}

async fn serve(config: AppConfig, path: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    logging::init(&config.observability);
    tracing::info!("secure-headers v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    // Keep the watcher (or the sender) alive for the lifetime of the server.
    let (_watcher, _updates_tx, updates_rx) = match &path {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), None, rx)
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (None, Some(tx), rx)
        }
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::shutdown_on_ctrl_c(shutdown.clone()));

    let server = HttpServer::new(config)?;
    server.run(listener, updates_rx, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
