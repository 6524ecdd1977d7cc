use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "recall-backend.log";

/// Keeps the non-blocking file writer alive; drop it last.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileLogSettings {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl FileLogSettings {
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var("ENABLE_FILE_LOGS").ok().as_deref(),
            std::env::var("LOG_DIR").ok(),
        )
    }

    fn from_values(enabled: Option<&str>, dir: Option<String>) -> Self {
        Self {
            enabled: matches!(enabled, Some("true") | Some("1")),
            dir: PathBuf::from(dir.unwrap_or_else(|| "./logs".to_string())),
        }
    }
}

pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    init_tracing_with(log_level, &FileLogSettings::from_env())
}

pub fn init_tracing_with(log_level: &str, settings: &FileLogSettings) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    if settings.enabled {
        if let Err(err) = std::fs::create_dir_all(&settings.dir) {
            eprintln!(
                "failed to create log directory {}: {err}",
                settings.dir.display()
            );
        } else {
            let file_appender =
                RollingFileAppender::new(Rotation::DAILY, &settings.dir, LOG_FILE_PREFIX);
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(file_layer)
                .init();

            return Some(FileLogGuard { _guard: guard });
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logging_flag() {
        assert!(FileLogSettings::from_values(Some("true"), None).enabled);
        assert!(FileLogSettings::from_values(Some("1"), None).enabled);
        assert!(!FileLogSettings::from_values(Some("yes"), None).enabled);
        assert!(!FileLogSettings::from_values(None, None).enabled);
    }

    #[test]
    fn log_dir_default() {
        let settings = FileLogSettings::from_values(None, None);
        assert_eq!(settings.dir, PathBuf::from("./logs"));
        let custom = FileLogSettings::from_values(None, Some("/var/log/recall".into()));
        assert_eq!(custom.dir, PathBuf::from("/var/log/recall"));
    }
}
