// src/logging.rs
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default append-only run log, next to wherever the tool is started.
pub const DEFAULT_LOG_FILE: &str = "data_processing.log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogConfig {
    /// append-only log file; `None` disables file logging
    pub file: Option<PathBuf>,
    /// mirror events to stderr
    pub console: bool,
    /// filter directives; falls back to `RUST_LOG`, then `info`
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            console: true,
            filter: None,
        }
    }
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

/// Install the global subscriber.
///
/// A log file that cannot be opened costs one warning on stderr; the run
/// continues with console logging only. The returned guard must be held until
/// exit so buffered file events get flushed.
pub fn init(cfg: &LogConfig) -> Option<WorkerGuard> {
    let filter = match &cfg.filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let console = cfg
        .console
        .then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));

    let (file_layer, guard) = match cfg.file.as_deref().map(open_append) {
        Some(Ok(file)) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        Some(Err(e)) => {
            eprintln!("warning: file logging disabled: {:#}", e);
            (None, None)
        }
        None => (None, None),
    };

    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();
    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn log_file_is_appended_not_truncated() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("logs/run.log");
        std::fs::create_dir_all(path.parent().unwrap())?;
        std::fs::write(&path, "earlier run\n")?;
        {
            use std::io::Write;
            let mut f = open_append(&path)?;
            writeln!(f, "this run")?;
        }
        let text = std::fs::read_to_string(&path)?;
        assert_eq!(text, "earlier run\nthis run\n");
        Ok(())
    }

    #[test]
    fn unopenable_log_file_does_not_abort() -> Result<()> {
        let dir = tempdir()?;
        let cfg = LogConfig {
            // a directory cannot be opened for appending
            file: Some(dir.path().to_path_buf()),
            console: false,
            filter: Some("off".into()),
        };
        assert!(init(&cfg).is_none());
        Ok(())
    }
}
