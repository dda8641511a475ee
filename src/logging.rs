use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Structured logging backed by `tracing`.
///
/// A global subscriber is installed once: stdout always, plus a daily-rotated
/// file under the log directory when it can be created. `RUST_LOG` wins over
/// `BLINDSPOT_LOG_LEVEL`; both fall back to `info`.

static INIT_LOGGING: Once = Once::new();
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub const LOG_LEVEL_ENV: &str = "BLINDSPOT_LOG_LEVEL";

pub fn default_log_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("blindspot-guard")
        .join("logs")
}

fn build_file_appender(log_dir: &Path) -> Option<RollingFileAppender> {
    if let Err(err) = std::fs::create_dir_all(log_dir) {
        eprintln!(
            "[blindspot][WARN] Failed to create log directory {}: {}",
            log_dir.display(),
            err
        );
        return None;
    }
    Some(RollingFileAppender::new(Rotation::DAILY, log_dir, "guard.log"))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".into())))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. `None` logs to stdout only.
/// Later calls are no-ops.
pub fn init_logging(log_dir: Option<PathBuf>) {
    INIT_LOGGING.call_once(|| {
        let file_layer = log_dir.as_deref().and_then(build_file_appender).map(|appender| {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            LOG_GUARD.set(guard).ok();
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(non_blocking)
        });
        let file_enabled = file_layer.is_some();

        let stdout_layer = fmt::layer()
            .with_target(true)
            .with_ansi(true)
            .with_timer(UtcTime::rfc_3339());

        let registry = tracing_subscriber::registry().with(env_filter()).with(stdout_layer);
        if let Some(file_layer) = file_layer {
            registry.with(file_layer).init();
        } else {
            registry.init();
        }

        match (&log_dir, file_enabled) {
            (Some(dir), true) => info!(
                "Structured logging initialized. Logs rotate daily under {}",
                dir.display()
            ),
            (Some(dir), false) => warn!(
                "Logging to stdout only, could not use {}",
                dir.display()
            ),
            (None, _) => info!("Structured logging initialized (stdout only)"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_dir_is_namespaced() {
        let dir = default_log_dir();
        assert!(dir.ends_with("blindspot-guard/logs"));
    }

    #[test]
    fn test_file_appender_creates_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let nested = tmp.path().join("a").join("b");
        assert!(build_file_appender(&nested).is_some());
        assert!(nested.is_dir());
    }
}
