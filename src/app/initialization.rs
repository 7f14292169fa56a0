//! Application initialization and configuration

use anyhow::Result;
use log::{debug, LevelFilter};

use crate::{cli, config, logging};

pub fn load_configuration(args: &cli::Args) -> Result<config::ConfigManager> {
    let mut manager = match &args.config_file {
        Some(config_file) => config::ConfigManager::load_from_file(config_file.clone())?,
        None => config::ConfigManager::load()?,
    };

    if let Some(section_name) = &args.config_name {
        manager.select_section(section_name.clone());
    }

    Ok(manager)
}

/// Combine CLI flags with `[base]` settings; flags win
pub fn configure_logging(
    args: &cli::Args,
    config: &config::ConfigManager,
) -> Result<logging::LogConfig> {
    let console_level = if args.debug {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        config.get_log_level("base", "console-level")?.unwrap_or(LevelFilter::Info)
    };

    let format = if args.log_format != "text" {
        args.log_format.parse::<logging::LogFormat>().map_err(|e| anyhow::anyhow!(e))?
    } else {
        match config.get_value("base", "log-format") {
            Some(value) => value.parse::<logging::LogFormat>().map_err(|e| anyhow::anyhow!(e))?,
            None => logging::LogFormat::Text,
        }
    };

    let log_file = args.log_file.clone().or_else(|| config.get_path("base", "log-file"));

    let file_level = match &args.log_file_level {
        Some(level) => Some(logging::parse_log_level(level)?),
        None => config.get_log_level("base", "file-log-level")?,
    };

    let (destination, file_level) = match (log_file, file_level) {
        (Some(path), level) => {
            let level = level.unwrap_or(console_level);
            debug!("File logging enabled: {} (level: {:?})", path.display(), level);
            let destination = if console_level == LevelFilter::Off {
                logging::LogDestination::File(path)
            } else {
                logging::LogDestination::Both(path)
            };
            (destination, Some(level))
        }
        (None, Some(_)) => {
            return Err(anyhow::anyhow!("A file log level was configured without a log file"));
        }
        (None, None) => (logging::LogDestination::Console, None),
    };

    Ok(logging::LogConfig {
        console_level,
        file_level,
        format,
        destination,
    })
}
