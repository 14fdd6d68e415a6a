use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use super::settings::RunMode;

/// Production log files; each one receives its level and everything more
/// severe.
const LEVEL_FILES: [(&str, LevelFilter); 5] = [
    ("trace", LevelFilter::TRACE),
    ("debug", LevelFilter::DEBUG),
    ("info", LevelFilter::INFO),
    ("warn", LevelFilter::WARN),
    ("error", LevelFilter::ERROR),
];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the background file writers running. Dropping it flushes them.
#[must_use = "dropping the guard stops the log file writers"]
pub struct LogGuard {
    _writers: Vec<WorkerGuard>,
}

pub fn init_logging(default_level: &str, mode: RunMode, log_dir: &Path) -> Result<LogGuard> {
    // Test runs stay silent unless RUST_LOG asks otherwise.
    let fallback = match mode {
        RunMode::Test => "off",
        _ => default_level,
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match mode {
        RunMode::Production => {
            let (files, writers) = level_file_layers(log_dir)?;
            tracing_subscriber::registry()
                .with(files)
                .with(filter)
                .with(fmt::layer().json().flatten_event(true).with_target(true))
                .try_init()
                .map_err(|e| anyhow!("failed to init logging: {e}"))?;

            Ok(LogGuard { _writers: writers })
        }
        RunMode::Development | RunMode::Test => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .compact()
                .try_init()
                .map_err(|e| anyhow!("failed to init logging: {e}"))?;

            Ok(LogGuard {
                _writers: Vec::new(),
            })
        }
    }
}

fn level_file_layers(log_dir: &Path) -> Result<(Vec<BoxedLayer>, Vec<WorkerGuard>)> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("cannot create log directory {}", log_dir.display()))?;

    let mut layers = Vec::with_capacity(LEVEL_FILES.len());
    let mut writers = Vec::with_capacity(LEVEL_FILES.len());
    for (name, level) in LEVEL_FILES {
        let appender = Builder::new()
            .rotation(Rotation::NEVER)
            .filename_prefix(name)
            .filename_suffix("log")
            .build(log_dir)
            .with_context(|| format!("log directory {} is not writable", log_dir.display()))?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        layers.push(
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(level)
                .boxed(),
        );
        writers.push(guard);
    }

    Ok((layers, writers))
}
