use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tinyhttp_web::{Dispatcher, ServerConfig, WebService, demo, logging};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let started = Instant::now();
    let config = ServerConfig::parse();

    if let Err(e) = logging::init(config.log_format) {
        eprintln!("failed to install log subscriber: {e}");
        return ExitCode::FAILURE;
    }

    let config = Arc::new(config);
    let service = WebService::new(demo::router(started), Arc::clone(&config));
    let dispatcher = match Dispatcher::bind(Arc::clone(&config), service) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!(cause = %e, "start server error");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    dispatcher.run(shutdown).await;
    info!(uptime_secs = started.elapsed().as_secs(), "bye");
    ExitCode::SUCCESS
}

/// Cancels `shutdown` on Ctrl-C or, on unix, `SIGTERM`.
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(cause = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(cause = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received ctrl-c"),
        () = terminate => info!("received SIGTERM"),
    }
    shutdown.cancel();
}
