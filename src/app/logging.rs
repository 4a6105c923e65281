//! Usage: Process-wide tracing setup (stderr + optional daily-rolling file).

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

const LOG_FILE_NAME: &str = "template-migrator.log";
const DEFAULT_FILTER: &str = "info";

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Installs the global subscriber. Only the first call does anything; later calls return `None`.
///
/// Keep the returned guard alive for as long as file logging should keep flushing.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return None;
    }

    // `log` records from dependencies land in the same pipeline.
    let _ = tracing_log::LogTracer::init();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).compact();

    let (file_layer, guard) = match log_dir {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer()
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_writer(non_blocking);
                (Some(layer), Some(guard))
            }
            Err(err) => {
                eprintln!("file logging disabled: cannot create {}: {err}", dir.display());
                (None, None)
            }
        },
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer);

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("tracing subscriber already installed: {err}");
        return None;
    }

    tracing::info!(
        log_dir = ?log_dir.map(|d| d.join(LOG_FILE_NAME)),
        "logging initialized"
    );
    guard
}
