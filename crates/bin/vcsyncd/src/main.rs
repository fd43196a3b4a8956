//! vcsync worker daemon
//!
//! Connects to the shared sync database, runs migrations, and drives the
//! poll-lease-execute loop until a termination signal drains it.

use std::time::Duration;

use clap::Parser as _;
use vcsync_db::SyncDb;
use vcsync_worker::{Config, Worker, config::resolve_worker_id, install_shutdown_handler};

#[derive(Debug, clap::Parser)]
#[command(name = "vcsyncd", about = "vcsync worker daemon")]
struct Args {
    /// Connection string for the shared sync database
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Worker identity; defaults to the host name
    #[arg(long, env = "WORKER_ID")]
    worker_id: Option<String>,

    /// Seconds between poll iterations (and heartbeats)
    #[arg(long, env = "HEARTBEAT_INTERVAL_SECONDS", default_value_t = 10)]
    heartbeat_interval_seconds: u64,

    /// Connection pool size
    #[arg(long, env = "DB_POOL_SIZE", default_value_t = vcsync_db::DEFAULT_POOL_SIZE)]
    pool_size: u32,
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() {
    match main_inner().await {
        Ok(()) => {}
        Err(e) => {
            // Manually print the error so we can control the format.
            eprintln!("Exiting with error: {e}");
            std::process::exit(1);
        }
    }
}

async fn main_inner() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let worker_id = resolve_worker_id(args.worker_id)?;
    let config = Config {
        heartbeat_interval: Duration::from_secs(args.heartbeat_interval_seconds),
        ..Config::new(worker_id)
    };

    let db = SyncDb::connect(&args.database_url, args.pool_size).await?;
    tracing::info!("connected to sync db, migrations applied");

    let shutdown = install_shutdown_handler()?;

    Worker::new(db, config).run(shutdown).await?;

    Ok(())
}
