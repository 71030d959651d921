//! Logging Infrastructure
//!
//! Console output always; daily rolling files are layered on top when a log
//! directory is given. `RUST_LOG` wins over the level passed in.

use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Log file prefix inside the log directory
pub const LOG_FILE_PREFIX: &str = "spotless-client";

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger with optional file output.
///
/// A second call is ignored.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&Path>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("spotless_client={level},spotless_printer={level}")));

    let console = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    // 目录不存在时只输出到控制台
    let file = log_dir.filter(|dir| dir.is_dir()).map(|dir| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_output_is_added() {
        let dir = tempfile::tempdir().unwrap();
        init_logger_with_file(Some("debug"), Some(dir.path()));
        tracing::info!("logger ready");

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n.starts_with(LOG_FILE_PREFIX)));

        // 第二次调用被忽略
        init_logger();
    }
}
