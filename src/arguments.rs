use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Generate an Up/Down SQL migration by diffing two schema files.
#[derive(Parser, Clone, Debug)]
#[command(name = "sqldelta", version)]
pub struct SqldeltaArguments {
    /// Level at which to output logs to stderr
    #[arg(long, default_value = "info", env = "SQLDELTA_LOG_LEVEL")]
    pub log_level: LogLevel,

    /// SQL dialect: postgresql or sqlite. Falls back to `sqldelta.toml`, then
    /// sqlite.
    #[arg(long, env = "SQLDELTA_DIALECT")]
    pub dialect: Option<String>,

    /// Show the changes and the migration without writing any file.
    #[arg(long)]
    pub dry_run: bool,

    /// Write the migration to a file instead of printing it to stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// The schema to migrate from.
    pub old: PathBuf,

    /// The schema to migrate to.
    pub new: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    Off,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}
impl From<LogLevel> for log::LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}
