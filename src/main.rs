// src/main.rs

//! Entry point for `wardenctl`.

use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;
use tracing::{error, info, warn};
use warden_reconcile::config::{DEFAULT_DOCUMENT_PATH, DesiredState};
use warden_reconcile::core::errors::EXIT_OK;
use warden_reconcile::core::executor::RespExecutor;
use warden_reconcile::core::store::setter::ConfigSetter;
use warden_reconcile::core::{Endpoint, WardenError};
use warden_reconcile::sentinel::{self, Mode, Report};

#[derive(Parser)]
#[command(name = "wardenctl", version)]
#[command(about = "Sentinel pool reconciliation helper", long_about = None)]
struct Cli {
    /// Log every command sent and every action taken.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check or adjust one pool on a sentinel
    Pool {
        #[command(flatten)]
        target: SentinelArgs,

        /// Name of the pool
        #[arg(long)]
        pool: String,

        #[command(subcommand)]
        method: Method,
    },

    /// Check for or remove pools the desired state no longer declares
    Cleanup {
        #[command(flatten)]
        target: SentinelArgs,

        #[command(subcommand)]
        method: Method,
    },

    /// Check or set a single store configuration option
    Config {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 6379)]
        port: u16,

        #[arg(long, default_value = "")]
        auth: String,

        #[command(subcommand)]
        method: ConfigMethod,
    },
}

#[derive(Args)]
struct SentinelArgs {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 26379)]
    port: u16,

    /// Desired-state document
    #[arg(long, default_value = DEFAULT_DOCUMENT_PATH)]
    cfg: String,
}

impl SentinelArgs {
    fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }
}

#[derive(Subcommand, Clone, Copy)]
enum Method {
    /// Report drift without changing anything
    Check,
    /// Converge live state to the desired state
    #[command(alias = "fix")]
    Adjust,
}

impl Method {
    fn mode(self) -> Mode {
        match self {
            Method::Check => Mode::Check,
            Method::Adjust => Mode::Fix,
        }
    }
}

#[derive(Subcommand)]
enum ConfigMethod {
    /// Check that the option holds the given value
    Check {
        #[arg(long)]
        option: String,
        #[arg(long)]
        value: String,
    },
    /// Set the option and rewrite the store's config file
    Set {
        #[arg(long)]
        option: String,
        #[arg(long)]
        value: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "info,warden_reconcile=debug".to_string()
        } else {
            "warn".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .compact()
        .with_ansi(true)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::from(EXIT_OK),
        Err(e) => {
            error!("{}", e);
            println!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), WardenError> {
    let executor = RespExecutor::new();
    match cli.cmd {
        Commands::Pool {
            target,
            pool,
            method,
        } => {
            let state = DesiredState::from_file(&target.cfg).await?;
            let report = sentinel::reconcile_pool(
                &executor,
                &state,
                &target.endpoint(),
                &pool,
                method.mode(),
            )
            .await?;
            summarize(&report);
        }
        Commands::Cleanup { target, method } => {
            let state = DesiredState::from_file(&target.cfg).await?;
            let report =
                sentinel::clean_fleet(&executor, &state, &target.endpoint(), method.mode()).await?;
            summarize(&report);
        }
        Commands::Config {
            host,
            port,
            auth,
            method,
        } => {
            let setter = ConfigSetter::new(&executor, Endpoint::new(host, port), Some(auth));
            match method {
                ConfigMethod::Check { option, value } => setter.check(&option, &value).await?,
                ConfigMethod::Set { option, value } => setter.set(&option, &value).await?,
            }
        }
    }
    Ok(())
}

fn summarize(report: &Report) {
    if report.is_noop() {
        info!("No changes needed.");
        return;
    }
    for action in &report.applied {
        info!("Applied: {}", action);
    }
    for (action, e) in &report.tolerated {
        warn!("Deferred: {} ({})", action, e);
    }
}
