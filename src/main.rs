// Dashboard Quota - Main Entry Point
//
// This binary manages:
// - CLI interface
// - The quota HTTP service
// - Offline quota simulation

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dashboard_quota::config::Config;
use dashboard_quota::quota::{QuotaEnforcer, QuotaLimits};
use dashboard_quota::{logging, server};
use std::path::PathBuf;
use tracing::info;

/// Dashboard Quota: per-user, per-action quota enforcement
#[derive(Parser, Debug)]
#[command(name = "dashboard-quota")]
#[command(author = "Dashboard Contributors")]
#[command(version)]
#[command(about = "Per-user quota enforcement for dashboard AI endpoints", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the quota HTTP service
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run back-to-back checks against a fresh enforcer
    Simulate {
        /// User id
        #[arg(long, default_value = "u1")]
        user: String,

        /// Action name
        #[arg(long, default_value = "email-ai-compose")]
        action: String,

        /// Number of checks to run
        #[arg(long, default_value_t = 3)]
        calls: u32,

        /// Per-minute ceiling (defaults to the configured action)
        #[arg(long)]
        per_minute: Option<u32>,

        /// Per-day ceiling (defaults to the configured action)
        #[arg(long)]
        per_day: Option<u32>,
    },
    /// Print the effective configuration
    ShowConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_ref())?;
    logging::init(&config.logging, args.verbose)?;

    match args.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;
            info!("Dashboard Quota v{} starting...", env!("CARGO_PKG_VERSION"));
            server::serve(config).await?;
        }
        Some(Commands::Simulate {
            user,
            action,
            calls,
            per_minute,
            per_day,
        }) => {
            simulate(&config, &user, &action, calls, per_minute, per_day)?;
        }
        Some(Commands::ShowConfig) => {
            print!("{}", config.to_toml()?);
        }
        None => {
            info!("No command specified. Use \"dashboard-quota --help\" for usage.");
        }
    }

    Ok(())
}

/// Run `calls` checks for one (user, action) and print each decision
fn simulate(
    config: &Config,
    user: &str,
    action: &str,
    calls: u32,
    per_minute: Option<u32>,
    per_day: Option<u32>,
) -> Result<()> {
    let configured = config.quota.actions.get(action).copied();
    let per_minute = per_minute
        .or(configured.map(|l| l.per_minute()))
        .with_context(|| format!("No per-minute ceiling for action '{}'", action))?;
    let per_day = per_day
        .or(configured.map(|l| l.per_day()))
        .with_context(|| format!("No per-day ceiling for action '{}'", action))?;
    let limits = QuotaLimits::new(per_minute, per_day)?;

    let enforcer = QuotaEnforcer::new();
    println!(
        "Simulating {} calls for user={} action={} ({}/min, {}/day)",
        calls, user, action, per_minute, per_day
    );

    for call in 1..=calls {
        let decision = enforcer.check_and_consume(user, action, &limits);
        let outcome = if decision.allowed { "allowed" } else { "rejected" };
        println!(
            "call {}: {} remaining={} retry_after={}s",
            call, outcome, decision.remaining, decision.retry_after_secs
        );
    }

    Ok(())
}
