//! labpower daemon
//!
//! Remote power control for a lab fleet: authenticated operators shut down or
//! restart machines over HTTP, and every issued action is appended to an audit log.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use eyre::WrapErr;
use labpower_core::{Dispatcher, FileAuditLog, SessionGate};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod api;
mod config;
mod factory;
mod router;
mod state;

use crate::config::{Config, LogFormat};
use crate::state::AppState;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "labpower")]
#[command(about = "Lab fleet power control daemon", long_about = None)]
struct Cli {
    /// Config file (defaults to the standard search path)
    #[arg(short, long, env = "LABPOWER_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP daemon (default)
    Serve,
    /// Print an Argon2 hash for an `[[operator]]` entry
    #[command(name = "hash-password")]
    HashPassword {
        /// Password to hash; read from stdin when omitted
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = match &cli.config {
                Some(path) => Config::load(path)?,
                None => Config::load_default()?,
            };
            init_tracing(&config);
            serve(config).await
        }
        Commands::HashPassword { password } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            let hash = SessionGate::hash_password(&password)?;
            println!("{hash}");
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.daemon.log_level));
    let json = config.daemon.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();
}

fn read_password() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .wrap_err("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        eyre::bail!("empty password");
    }
    Ok(password)
}

async fn serve(config: Config) -> Result<()> {
    let fleet = Arc::new(config.fleet()?);
    let executor = factory::create_executor(&config.executor)?;
    let audit = Arc::new(
        FileAuditLog::open(&config.audit.path)
            .await
            .wrap_err_with(|| format!("cannot open audit log {}", config.audit.path.display()))?,
    );
    let gate = SessionGate::new(&config.operator, config.session.ttl())?;

    let dispatcher = Dispatcher::new(fleet.clone(), executor, audit.clone())
        .with_timeout(config.executor.timeout());
    let state = Arc::new(AppState::new(dispatcher, gate, audit.clone()));

    let purge = tokio::spawn(purge_sessions(state.clone()));

    let app = router::create_router(state);
    let listener = tokio::net::TcpListener::bind(&config.daemon.bind)
        .await
        .wrap_err_with(|| format!("cannot bind {}", config.daemon.bind))?;

    info!(
        bind = %config.daemon.bind,
        targets = fleet.len(),
        operators = config.operator.len(),
        audit = %config.audit.path.display(),
        "labpower daemon listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge.abort();
    audit.close().await;
    info!("labpower daemon stopped");

    Ok(())
}

async fn purge_sessions(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
    loop {
        interval.tick().await;
        let purged = state.gate.purge_expired().await;
        if purged > 0 {
            info!(purged, "expired sessions removed");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
