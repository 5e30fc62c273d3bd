use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use majorityvote::command::{Flow, Shell};
use majorityvote::constants::{DEFAULT_BIND_HOST, DEFAULT_REGISTRY_PATH};
use majorityvote::nodes::coordinator::QueryCoordinator;
use majorityvote::nodes::session::SessionController;
use majorityvote::persistence::FileRegistry;
use majorityvote::transport::tcp::TcpTransport;
use majorityvote::types::{Config, TimeoutConfig};

/// Reads `start`, `play` and `stop` commands from stdin, one per line.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// File the agent endpoints are written to
    #[arg(long, default_value = DEFAULT_REGISTRY_PATH)]
    registry: PathBuf,

    /// Host agents bind their listeners on
    #[arg(long, default_value = DEFAULT_BIND_HOST)]
    bind: String,

    #[arg(long, default_value_t = 1000)]
    dial_timeout_ms: u64,

    #[arg(long, default_value_t = 1000)]
    read_timeout_ms: u64,

    /// How long `stop` waits for agents to drain
    #[arg(long, default_value_t = 1000)]
    shutdown_timeout_ms: u64,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            registry_path: args.registry,
            bind_host: args.bind,
            timeouts: TimeoutConfig {
                dial_timeout: Duration::from_millis(args.dial_timeout_ms),
                read_timeout: Duration::from_millis(args.read_timeout_ms),
                shutdown_timeout: Duration::from_millis(args.shutdown_timeout_ms),
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config: Config = Args::parse().into();
    info!("registry at {}", config.registry_path.display());
    let registry = FileRegistry::new(config.registry_path.clone());
    let sessions = SessionController::new(config.clone(), registry);
    let coordinator = QueryCoordinator::new(TcpTransport::new(config.timeouts.clone()));
    let mut shell = Shell::new(sessions, coordinator);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                None
            }
        };
        let Some(line) = line else {
            // agents never outlive the command loop
            shell.shutdown().await?;
            break;
        };
        match shell.execute(&line, &mut stdout).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(e) => {
                error!("{:#}", e);
                shell.shutdown().await?;
                return Err(e);
            }
        }
    }
    Ok(())
}
