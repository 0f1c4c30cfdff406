//! Subscriber setup for the `eyegrid` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! whoever embeds it. Logs go to stderr so command output on stdout stays clean.
//!
//! - `error`: an export that produced no file
//! - `warn`: failed upload reads, print jobs that did not complete
//! - `info`: finished exports
//! - `debug`: state edits, rejected input, ignored uploads

use std::io;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level_filter: LevelFilter,
    /// When set, `RUST_LOG` takes precedence over `level_filter`.
    pub use_env_filter: bool,
    pub with_ansi: bool,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::WARN,
            use_env_filter: true,
            with_ansi: true,
            format: LogFormat::default(),
        }
    }
}

pub fn init_logging(config: &LogConfig) {
    init_logging_with_writer(config, io::stderr);
}

pub fn init_logging_with_writer<W>(config: &LogConfig, writer: W)
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = build_env_filter(config);
    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer().json().with_writer(writer).with_target(false);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(writer)
                .with_ansi(config.with_ansi)
                .with_target(false)
                .without_time();
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(config.with_ansi)
                .with_target(false)
                .without_time();
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }
}

fn build_env_filter(config: &LogConfig) -> EnvFilter {
    let fallback = || EnvFilter::new(default_directives(config.level_filter));
    if config.use_env_filter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback())
    } else {
        fallback()
    }
}

// Dependencies stay at warn regardless of our own level.
fn default_directives(level: LevelFilter) -> String {
    let level = level.to_string().to_lowercase();
    format!("warn,eyegrid={level}")
}
