//! stratusd — the Stratus daemon.
//!
//! Single binary that assembles the local function host:
//! - Blob store + tag catalog
//! - Blob event dispatcher (outbox + worker pool)
//! - Function discovery and trigger registration
//! - HTTP API for function routes
//! - Timer loop
//!
//! # Usage
//!
//! ```text
//! stratusd serve --functions demos/services --port 7071
//! stratusd config --config stratus.toml
//! ```

mod services;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use stratus_core::{Environment, StratusConfig};
use stratus_dispatch::StorageEngine;
use stratus_functions::FunctionApp;

const DEFAULT_LOG_FILTER: &str = "info,stratusd=debug,stratus=debug";

#[derive(Parser)]
#[command(name = "stratusd", about = "Stratus local function host")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Serve functions over HTTP, blob events, and timers.
    Serve {
        /// Config file (defaults to ./stratus.toml when present).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory tree holding function directories.
        #[arg(long, default_value = "demos/services")]
        functions: PathBuf,

        /// HTTP port, overriding the config file.
        #[arg(long)]
        port: Option<u16>,

        /// Storage root, overriding the config file and environment.
        #[arg(long)]
        storage_root: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML.
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Serve {
            config,
            functions,
            port,
            storage_root,
        } => {
            let env = Environment::from_process();
            let mut config = load_config(config.as_deref(), &env)?;
            if let Some(port) = port {
                config.http.port = port;
            }
            if let Some(root) = storage_root {
                config.storage.root = root;
            }
            run_serve(config, env, &functions).await
        }
        Command::Config { config } => {
            let config = load_config(config.as_deref(), &Environment::from_process())?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(path: Option<&Path>, env: &Environment) -> anyhow::Result<StratusConfig> {
    let mut config = StratusConfig::load(path)?;
    config.apply_env(env);
    Ok(config)
}

async fn run_serve(config: StratusConfig, env: Environment, functions: &Path) -> anyhow::Result<()> {
    info!("stratus daemon starting");

    // ── Storage + dispatch ─────────────────────────────────────

    let engine = StorageEngine::open(&config.storage, &config.dispatch)?;
    info!(root = ?config.storage.root, "blob storage opened");

    // ── Functions ──────────────────────────────────────────────

    let mut app = FunctionApp::from_engine(&engine, env, &config.http);
    let registry = services::registry(engine.blobs().clone());
    let registered = app.discover(functions, &registry)?;
    if registered == 0 {
        warn!(path = ?functions, "no functions registered");
    } else {
        info!(registered, path = ?functions, "functions registered");
    }

    // ── Background loops ───────────────────────────────────────

    engine.start();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let timers = app.timer_scheduler();
    let timer_handle = tokio::spawn(timers.run(config.timer.tick(), shutdown_rx));

    // ── HTTP ───────────────────────────────────────────────────

    let router = app.router();
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http.port));
    info!(%addr, prefix = %config.http.api_prefix, "function API listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    // Stop timers first so no new blob writes race the final drain.
    if let Err(e) = timer_handle.await {
        error!(error = %e, "timer loop did not stop cleanly");
    }
    engine.shutdown().await;

    info!("stratus daemon stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_flags_parse() {
        let cli = Cli::try_parse_from([
            "stratusd",
            "--log-format",
            "json",
            "serve",
            "--port",
            "8080",
            "--functions",
            "fns",
        ])
        .unwrap();
        assert!(matches!(cli.log_format, LogFormat::Json));
        match cli.command {
            Command::Serve { port, functions, storage_root, .. } => {
                assert_eq!(port, Some(8080));
                assert_eq!(functions, PathBuf::from("fns"));
                assert!(storage_root.is_none());
            }
            Command::Config { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn sample_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/stratus.toml");
        let env = Environment::from_pairs([("AZURE_SA", "/tmp/stratus-blobs")]);
        let config = load_config(Some(&path), &env).unwrap();
        assert_eq!(config.http.port, 7071);
        assert_eq!(config.dispatch.workers, 4);
        assert_eq!(config.storage.root, PathBuf::from("/tmp/stratus-blobs"));
    }
}
