//! Startup, wiring and shutdown of the dev queue.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ralley_api::{ApiConfig, ApiServer, AppState};
use ralley_config::{Config, ConfigValidator};
use ralley_queue::{
    DispatchConfig, HttpDispatcher, QueueConfig, Scheduler, SharedJobStore, SystemClock,
};

/// Initialize tracing with console and, if enabled, daily-rotated file output.
///
/// `RUST_LOG` overrides the configured level.
pub(crate) fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let file_layer = if config.logging.file {
        let log_dir = config.log_dir();
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("ralley")
            .filename_suffix("log")
            .max_log_files(14)
            .build(&log_dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Flushes buffered lines on exit.
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);

        Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    Ok(())
}

fn queue_config(config: &Config) -> QueueConfig {
    QueueConfig {
        retain: config.queue.retain,
        tick_interval_ms: config.queue.tick_interval_ms,
        snapshot_path: Some(config.snapshot_path()),
        workspace: config.queue.workspace.clone(),
    }
}

fn dispatch_config(config: &Config) -> DispatchConfig {
    DispatchConfig {
        timeout_secs: config.dispatch.timeout_seconds,
        max_response_bytes: config.dispatch.max_response_bytes,
    }
}

/// Run the dev queue until Ctrl-C or SIGTERM.
pub(crate) async fn run_dev(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    if !validation.is_valid() {
        for e in &validation.errors {
            error!(path = %e.path, "{}", e.message);
        }
        return Err(format!("Invalid configuration ({} errors)", validation.errors.len()).into());
    }

    info!("Starting ralley v{}", env!("CARGO_PKG_VERSION"));

    let queue_config = queue_config(&config);
    let snapshot = config.snapshot_path();
    let store = SharedJobStore::load(&snapshot).await?;
    info!(
        jobs = store.lock().len(),
        path = %snapshot.display(),
        "Loaded saved jobs"
    );

    let dispatcher = Arc::new(HttpDispatcher::new(dispatch_config(&config))?);
    let scheduler = Scheduler::new(queue_config, store, dispatcher, Arc::new(SystemClock));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.clone().run(shutdown_rx.clone()));

    let server = ApiServer::new(
        ApiConfig::new(config.server.host.clone(), config.server.port),
        AppState::new(scheduler),
    );
    let mut server_task = tokio::spawn(async move { server.run(shutdown_rx).await });

    let early_exit = tokio::select! {
        signal = shutdown_signal() => {
            if let Err(e) = signal {
                error!(error = %e, "Failed to listen for shutdown signals");
            }
            None
        }
        result = &mut server_task => Some(result),
    };

    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler_task.await {
        error!(error = %e, "Scheduler task failed");
    }

    let server_result = match early_exit {
        Some(result) => result,
        None => server_task.await,
    };
    server_result??;

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on the first SIGINT or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C");
    Ok(())
}
