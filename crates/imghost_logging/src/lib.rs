#![deny(missing_docs)]
//! Shared logging utilities for the imghost workspace.
//!
//! This crate provides the `imghost_*` logging macros used across the codebase,
//! the logger setup used by the uploader binary, and a minimal test initializer.

use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! imghost_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! imghost_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! imghost_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! imghost_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! imghost_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination<'a> {
    /// Write to the given file, truncating it first.
    File(&'a Path),
    /// Write to the terminal (stderr for warnings and errors).
    Terminal,
    /// Write to both the terminal and the given file.
    Both(&'a Path),
}

/// Installs the global logger for the given destination and level.
///
/// A log file that cannot be created is reported on stderr and skipped; the
/// remaining destinations still receive records. Calling this twice is a no-op.
pub fn initialize(destination: LogDestination<'_>, level: LevelFilter) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File(path) => create_file_logger(path, level, config)
            .into_iter()
            .map(|logger| logger as Box<dyn SharedLogger>)
            .collect(),
        LogDestination::Terminal => vec![TermLogger::new(
            level,
            config,
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )],
        LogDestination::Both(path) => {
            let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
                level,
                config.clone(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )];
            if let Some(file_logger) = create_file_logger(path, level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    if loggers.is_empty() {
        return;
    }
    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    path: &Path,
    level: LevelFilter,
    config: Config,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", path, err);
            None
        }
    }
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
