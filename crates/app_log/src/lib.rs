//! RefBoard Logging & Observability Module
//!
//! Provides structured logging, panic handling, crash reports, and deadlock detection.

mod logging;
mod panic_hook;

pub use logging::{cleanup_old_logs, init_logging, LOG_FILE_PREFIX};
pub use panic_hook::init_panic_hook;

use directories::ProjectDirs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;

/// Get the application log directory
pub fn log_dir() -> PathBuf {
    ProjectDirs::from("com", "RefBoard", "RefBoard")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Keeps the file writer flushing; drop it last
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: WorkerGuard,
}

/// Initialize all observability features
///
/// Log files older than `retention_days` are removed first.
pub fn init(retention_days: u32) -> anyhow::Result<LogGuard> {
    let dir = log_dir();
    let file = init_logging(&dir)?;
    init_panic_hook();

    if let Err(e) = cleanup_old_logs(&dir, retention_days) {
        tracing::warn!("Log cleanup failed: {}", e);
    }

    #[cfg(debug_assertions)]
    init_deadlock_detector();

    Ok(LogGuard { _file: file })
}

#[cfg(debug_assertions)]
fn init_deadlock_detector() {
    use std::thread;
    use std::time::Duration;

    let spawned = thread::Builder::new()
        .name("deadlock-detector".into())
        .spawn(|| loop {
            thread::sleep(Duration::from_secs(10));
            let deadlocks = parking_lot::deadlock::check_deadlock();
            if deadlocks.is_empty() {
                continue;
            }

            tracing::error!("{} deadlocks detected", deadlocks.len());
            for (i, threads) in deadlocks.iter().enumerate() {
                for t in threads {
                    tracing::error!("Deadlock #{} thread {:?}\n{:?}", i, t.thread_id(), t.backtrace());
                }
            }
        });

    if let Err(e) = spawned {
        tracing::warn!("Deadlock detector not started: {}", e);
    }
}
