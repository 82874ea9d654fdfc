use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use roster::config::RosterConfig;
use roster::http::{router, AdmissionState, AppState, HttpServer};
use roster::ratelimit::RateLimiter;
use roster::roster::{InMemoryRosterStore, RosterSeed};

/// Command line arguments. Flags override file and environment settings.
#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(about = "Employee roster search service", version)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Address to serve HTTP on
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Requests admitted per client within one window
    #[arg(long)]
    rate_limit: Option<u32>,

    /// Rate limit window in seconds
    #[arg(long)]
    rate_window: Option<u64>,

    /// YAML file seeding the roster store
    #[arg(long)]
    roster: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    }

    info!("Starting Roster Search Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = RosterConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.http_addr {
        config.server.http_addr = addr;
    }
    if let Some(limit) = args.rate_limit {
        config.rate_limiting.limit = limit;
    }
    if let Some(window) = args.rate_window {
        config.rate_limiting.window_secs = window;
    }
    if let Some(path) = args.roster {
        config.data.roster_path = Some(path);
    }
    config.validate()?;
    info!(
        http_addr = %config.server.http_addr,
        limit = config.rate_limiting.limit,
        window_secs = config.rate_limiting.window_secs,
        "Configuration loaded"
    );

    // Initialize the rate limiter
    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limiting.limit,
        config.rate_limiting.window(),
    )?);
    info!("Rate limiter initialized");

    let store = match &config.data.roster_path {
        Some(path) => InMemoryRosterStore::from_seed(RosterSeed::from_file(path)?),
        None => InMemoryRosterStore::new(),
    };
    info!(employees = store.employee_count(), "Roster store initialized");

    let admission = AdmissionState {
        limiter: rate_limiter,
        penalize_failures: config.rate_limiting.penalize_failures,
    };
    let app = router(AppState::new(Arc::new(store)), admission);

    let server = HttpServer::bind(config.server.http_addr, app).await?;

    // Serve until SIGINT or SIGTERM
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Roster Search Service stopped");
    Ok(())
}

/// Resolve once the process is asked to stop.
///
/// If a signal handler cannot be installed, that source is logged and never
/// fires; the other one still can.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        "SIGINT"
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
        "SIGTERM"
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    let received = tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    };
    info!(signal = received, "Shutting down roster API");
}
