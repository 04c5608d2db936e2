//! Tracing setup shared by the three binaries.
//!
//! Output goes to stdout (compact) and to a log file written through a non-blocking appender.
//! `DOCSEARCH_LOG_FILE` pins the file path; otherwise logs land in `logs/docsearch.log`, rotated
//! according to `DOCSEARCH_LOG_ROTATION` (`never`, `hourly`, `daily`; default `never`).
use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "docsearch.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where file logs are written.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    /// Append to one fixed file.
    File(PathBuf),
    /// Rolling files named `prefix[.date]` under `dir`.
    Rolling {
        dir: PathBuf,
        prefix: String,
        rotation: RotationKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RotationKind {
    Never,
    Hourly,
    Daily,
}

impl RotationKind {
    fn parse(value: Option<&str>) -> Self {
        match value.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("hourly") => Self::Hourly,
            Some("daily") => Self::Daily,
            _ => Self::Never,
        }
    }

    fn rotation(self) -> Rotation {
        match self {
            Self::Never => Rotation::NEVER,
            Self::Hourly => Rotation::HOURLY,
            Self::Daily => Rotation::DAILY,
        }
    }
}

impl LogTarget {
    fn resolve(file: Option<&str>, rotation: Option<&str>) -> Self {
        match file.map(str::trim).filter(|path| !path.is_empty()) {
            Some(path) => Self::File(PathBuf::from(path)),
            None => Self::Rolling {
                dir: PathBuf::from(DEFAULT_LOG_DIR),
                prefix: DEFAULT_LOG_FILE.to_string(),
                rotation: RotationKind::parse(rotation),
            },
        }
    }

    fn from_env() -> Self {
        let file = std::env::var("DOCSEARCH_LOG_FILE").ok();
        let rotation = std::env::var("DOCSEARCH_LOG_ROTATION").ok();
        Self::resolve(file.as_deref(), rotation.as_deref())
    }

    fn open(&self) -> std::io::Result<NonBlocking> {
        let (writer, guard) = match self {
            Self::File(path) => {
                if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                tracing_appender::non_blocking(file)
            }
            Self::Rolling {
                dir,
                prefix,
                rotation,
            } => {
                std::fs::create_dir_all(dir)?;
                let appender = RollingFileAppender::new(rotation.rotation(), dir, prefix);
                tracing_appender::non_blocking(appender)
            }
        };
        let _ = LOG_GUARD.set(guard);
        Ok(writer)
    }

    fn location(&self) -> &Path {
        match self {
            Self::File(path) => path,
            Self::Rolling { dir, .. } => dir,
        }
    }
}

/// Install the stdout and file subscribers.
///
/// Filtering follows `RUST_LOG` (default `info`). A log file that cannot be opened is reported on
/// stderr and stdout logging continues alone. Later calls are ignored.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let writer = if LOG_GUARD.get().is_some() {
        None
    } else {
        let target = LogTarget::from_env();
        match target.open() {
            Ok(writer) => Some(writer),
            Err(err) => {
                eprintln!(
                    "Failed to open log file under {}: {err}",
                    target.location().display()
                );
                None
            }
        }
    };

    match writer {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            let _ = registry.with(file_layer).try_init();
        }
        None => {
            let _ = registry.try_init();
        }
    }
}
