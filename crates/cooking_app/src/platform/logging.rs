//! Logger setup for the `cooktrack` binary.
//!
//! Terminal output goes to stderr so it never interleaves with the task table
//! on stdout. A log file, when configured, is truncated at startup.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Destination for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    File(PathBuf),
    Terminal,
    /// Terminal plus the given file.
    Both(PathBuf),
}

impl LogDestination {
    pub fn for_log_file(log_file: Option<&Path>) -> Self {
        match log_file {
            Some(path) => LogDestination::Both(path.to_path_buf()),
            None => LogDestination::Terminal,
        }
    }
}

/// Installs the global logger. Later calls are ignored.
pub fn initialize(destination: LogDestination, verbose: bool) {
    let terminal_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let file_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File(path) => match create_file_logger(&path, file_level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => vec![terminal_logger(terminal_level, config)],
        LogDestination::Both(path) => {
            let mut loggers = vec![terminal_logger(terminal_level, config.clone())];
            if let Some(file_logger) = create_file_logger(&path, file_level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("rustls")
        .build()
}

fn terminal_logger(level: LevelFilter, config: Config) -> Box<dyn SharedLogger> {
    TermLogger::new(level, config, TerminalMode::Stderr, ColorChoice::Auto)
}

fn create_file_logger(path: &Path, level: LevelFilter, config: Config) -> Option<Box<dyn SharedLogger>> {
    match File::create(path) {
        Ok(file) => {
            let logger: Box<dyn SharedLogger> = WriteLogger::new(level, config, file);
            Some(logger)
        }
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", path, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_adds_a_file_destination() {
        assert_eq!(LogDestination::for_log_file(None), LogDestination::Terminal);
        assert_eq!(
            LogDestination::for_log_file(Some(Path::new("cooktrack.log"))),
            LogDestination::Both(PathBuf::from("cooktrack.log"))
        );
    }
}
