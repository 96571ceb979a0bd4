//! labpower CLI
//!
//! Command-line interface for the labpower daemon

use std::io::BufRead;

use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use labpower_api::responses::DispatchResponse;
use labpower_client::HttpClient;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "labpower-cli")]
#[command(about = "Shut down or restart lab machines", long_about = None)]
struct Cli {
    /// Daemon base URL
    #[arg(long, env = "LABPOWER_URL", default_value = "http://127.0.0.1:8080", global = true)]
    url: String,

    /// Session token from `login`
    #[arg(long, env = "LABPOWER_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a session and print its token
    Login {
        /// Operator name
        #[arg(short, long)]
        username: String,
        /// Password; read from stdin when omitted
        #[arg(long, env = "LABPOWER_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Revoke the current session
    Logout,
    /// List the controllable machines
    Fleet,
    /// Shut down one machine or the whole fleet
    Shutdown(TargetArgs),
    /// Restart one machine or the whole fleet
    Restart(TargetArgs),
    /// Show recent audit entries
    Audit {
        /// Number of entries
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Target address as listed by `fleet`
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    address: Option<String>,
    /// Every machine in the fleet
    #[arg(long)]
    all: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut client = HttpClient::new(&cli.url)?;
    if let Some(token) = &cli.token {
        client = client.with_token(token);
    }

    match cli.command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            let session = client.login(&username, &password).await?;
            if cli.json {
                print_json(&session)?;
            } else {
                println!("Logged in as {} until {}", session.operator, session.expires_at);
                println!("export LABPOWER_TOKEN={}", session.token);
            }
        }
        Commands::Logout => {
            client.logout().await?;
            println!("Logged out");
        }
        Commands::Fleet => {
            let targets = client.fleet().await?;
            if cli.json {
                print_json(&targets)?;
            } else {
                for target in targets {
                    println!("{:<24} {}", target.name, target.address);
                }
            }
        }
        Commands::Shutdown(args) => {
            let outcome = match args.address {
                Some(address) if !args.all => client.shutdown(&address).await?,
                _ => client.shutdown_all().await?,
            };
            report(&outcome, cli.json)?;
        }
        Commands::Restart(args) => {
            let outcome = match args.address {
                Some(address) if !args.all => client.restart(&address).await?,
                _ => client.restart_all().await?,
            };
            report(&outcome, cli.json)?;
        }
        Commands::Audit { limit } => {
            let entries = client.audit(Some(limit)).await?;
            if cli.json {
                print_json(&entries)?;
            } else {
                for entry in entries {
                    println!(
                        "{} {:<12} {:<14} {}",
                        entry.timestamp.to_rfc3339(),
                        entry.actor,
                        entry.action,
                        entry.target
                    );
                }
            }
        }
    }

    Ok(())
}

fn report(outcome: &DispatchResponse, json: bool) -> Result<()> {
    if json {
        print_json(outcome)?;
    } else {
        println!("{}", outcome.message);
        for failure in &outcome.failures {
            eprintln!("  {} ({}): {}", failure.name, failure.address, failure.error);
        }
    }

    if !outcome.accepted {
        eyre::bail!("request rejected");
    }
    if !outcome.failures.is_empty() {
        eyre::bail!("{} of {} commands failed", outcome.failures.len(), outcome.attempted);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        eyre::bail!("empty password");
    }
    Ok(password)
}
