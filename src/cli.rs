use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::debug;

/// Broadcast notifications to simulated user sessions
#[derive(Parser, Debug)]
#[command(name = "notify-users")]
#[command(about = "Broadcast notifications to every subscribed session without blocking")]
#[command(version)]
pub struct Args {
    /// Number of simulated sessions to attach
    #[arg(short, long, default_value_t = 3)]
    pub sessions: usize,

    /// Message to broadcast (repeatable); reads lines from stdin when omitted
    #[arg(short, long = "message", value_name = "TEXT")]
    pub messages: Vec<String>,

    /// Session numbers (1-based) that stay opted out of notifications
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub opt_out: Vec<usize>,

    /// Disable coloured session output
    #[arg(long)]
    pub no_color: bool,

    /// Verbose output (debug level logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long)]
    pub debug: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log file path for file output
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL")]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Configuration section name
    #[arg(long, value_name = "SECTION")]
    pub config_name: Option<String>,
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    Args::parse()
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    let log_flags_count = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();

    if log_flags_count > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be set"
        ));
    }

    if args.log_format.parse::<crate::logging::LogFormat>().is_err() {
        return Err(anyhow::anyhow!(
            "Invalid log format '{}'. Valid options: text, json",
            args.log_format
        ));
    }

    if let Some(level) = &args.log_file_level {
        crate::logging::parse_log_level(level)?;
        if args.log_file.is_none() {
            return Err(anyhow::anyhow!("--log-file-level requires --log-file to be specified"));
        }
    }

    if args.sessions == 0 {
        return Err(anyhow::anyhow!("--sessions must be at least 1"));
    }

    if let Some(invalid) = args.opt_out.iter().find(|&&n| n == 0 || n > args.sessions) {
        return Err(anyhow::anyhow!(
            "--opt-out session {} is out of range 1..={}",
            invalid,
            args.sessions
        ));
    }

    debug!("CLI arguments validated successfully");
    Ok(())
}
