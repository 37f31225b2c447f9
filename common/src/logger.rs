//! Terminal and file logging shared by the node binaries.

use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, str::FromStr};
use strum::{Display, EnumString};
use thiserror::Error;

pub fn default_logs_datetime_format() -> String {
    String::from("[%Y-%m-%d] (%H:%M:%S%.3f)")
}

pub fn default_log_filename() -> String {
    String::from("ezira-node.log")
}

pub fn default_logs_path() -> String {
    String::from("logs/")
}

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Logger already set: {0}")]
    AlreadySet(#[from] log::SetLoggerError),

    #[error("Invalid logs directory: {0}")]
    Directory(#[from] std::io::Error),
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Per module level override, e.g. `ezira_daemon::core::store=trace`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub module: String,
    pub level: LogLevel,
}

impl FromStr for ModuleConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, level) = s
            .split_once('=')
            .ok_or_else(|| format!("expected <module>=<level>, got '{s}'"))?;
        let level = LogLevel::from_str(level).map_err(|e| e.to_string())?;
        Ok(Self {
            module: module.to_string(),
            level,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct LogConfig {
    /// Set log level
    #[cfg_attr(feature = "clap", clap(long, value_enum, default_value_t))]
    #[serde(default)]
    pub log_level: LogLevel,
    /// Set file log level
    /// By default, it will be the same as log level
    #[cfg_attr(feature = "clap", clap(long, value_enum))]
    #[serde(default)]
    pub file_log_level: Option<LogLevel>,
    /// Disable the log file
    #[cfg_attr(feature = "clap", clap(long))]
    #[serde(default)]
    pub disable_file_logging: bool,
    /// Disable the log filename date based
    /// If disabled, the log file will be named ezira-node.log instead of YYYY-MM-DD.ezira-node.log
    #[cfg_attr(feature = "clap", clap(long))]
    #[serde(default)]
    pub disable_file_log_date_based: bool,
    /// Disable the usage of colors in log
    #[cfg_attr(feature = "clap", clap(long))]
    #[serde(default)]
    pub disable_log_color: bool,
    /// Log filename
    #[cfg_attr(feature = "clap", clap(long, default_value_t = default_log_filename()))]
    #[serde(default = "default_log_filename")]
    pub filename_log: String,
    /// Logs directory, it must end with a /
    #[cfg_attr(feature = "clap", clap(long, default_value_t = default_logs_path()))]
    #[serde(default = "default_logs_path")]
    pub logs_path: String,
    /// Module configuration for logs
    #[cfg_attr(feature = "clap", clap(long))]
    #[serde(default)]
    pub logs_modules: Vec<ModuleConfig>,
    /// Change the datetime format used by the logger
    #[cfg_attr(feature = "clap", clap(long, default_value_t = default_logs_datetime_format()))]
    #[serde(default = "default_logs_datetime_format")]
    pub datetime_format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            file_log_level: None,
            disable_file_logging: false,
            disable_file_log_date_based: false,
            disable_log_color: false,
            filename_log: default_log_filename(),
            logs_path: default_logs_path(),
            logs_modules: Vec::new(),
            datetime_format: default_logs_datetime_format(),
        }
    }
}

/// Install the global logger: colored terminal output and an optional log file.
pub fn setup_logger(config: &LogConfig) -> Result<(), LoggerError> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Magenta)
        .trace(Color::Cyan);

    let terminal_level: LevelFilter = config.log_level.into();
    let file_level: LevelFilter = config.file_log_level.unwrap_or(config.log_level).into();

    let mut base = fern::Dispatch::new().level(terminal_level.max(file_level));
    for module in &config.logs_modules {
        base = base.level_for(module.module.clone(), module.level.into());
    }

    let datetime_format = config.datetime_format.clone();
    let use_colors = !config.disable_log_color;
    let terminal = fern::Dispatch::new()
        .level(terminal_level)
        .format(move |out, message, record| {
            let level = if use_colors {
                colors.color(record.level()).to_string()
            } else {
                record.level().to_string()
            };
            out.finish(format_args!(
                "{} {} [{}] {}",
                chrono::Local::now().format(&datetime_format),
                level,
                record.target(),
                message
            ))
        })
        .chain(std::io::stdout());
    base = base.chain(terminal);

    if !config.disable_file_logging {
        let path = Path::new(&config.logs_path);
        fs::create_dir_all(path)?;

        let datetime_format = config.datetime_format.clone();
        let file = fern::Dispatch::new()
            .level(file_level)
            .format(move |out, message, record| {
                out.finish(format_args!(
                    "{} {} [{}] {}",
                    chrono::Local::now().format(&datetime_format),
                    record.level(),
                    record.target(),
                    message
                ))
            });

        let file = if config.disable_file_log_date_based {
            file.chain(fern::log_file(path.join(&config.filename_log))?)
        } else {
            file.chain(fern::DateBased::new(
                path,
                format!("%Y-%m-%d.{}", config.filename_log),
            ))
        };
        base = base.chain(file);
    }

    base.apply()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_config_parse() {
        let module: ModuleConfig = "ezira_daemon::core=trace".parse().unwrap();
        assert_eq!(module.module, "ezira_daemon::core");
        assert_eq!(module.level, LogLevel::Trace);
        assert!("no-level".parse::<ModuleConfig>().is_err());
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(LevelFilter::from(LogLevel::Warn), LevelFilter::Warn);
        assert_eq!(LogLevel::default().to_string(), "info");
    }
}
