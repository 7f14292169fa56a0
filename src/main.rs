use std::io::{self, BufRead};
use std::process;

use anyhow::Result;
use log::{debug, error};

use notify_users::app::{self, BroadcastPlan};
use notify_users::{cli, logging};

fn main() {
    if let Err(e) = run() {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = cli::parse_args();
    cli::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;
    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;

    if let Some(path) = config_manager.config_file_path() {
        debug!("Using configuration from {}", path.display());
    }

    let plan = BroadcastPlan {
        sessions: args.sessions,
        opt_out: args.opt_out.clone(),
        colored: !args.no_color,
        dispatcher: config_manager.get_dispatcher_config()?,
    };

    let stats = if args.messages.is_empty() {
        debug!("Reading messages from stdin");
        let stdin = io::stdin();
        app::run_broadcast(&plan, stdin.lock().lines(), app::stdout_sink())?
    } else {
        app::run_broadcast(&plan, args.messages.into_iter().map(Ok), app::stdout_sink())?
    };

    debug!("Final delivery statistics: {:?}", stats);
    Ok(())
}
