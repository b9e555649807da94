use std::process::ExitCode;

use clap::Parser;
use log::{LevelFilter, info};

use cmon::cli::Args;
use cmon::config::Defaults;
use cmon::monitor::listen_for_ctrl_c;
use cmon::{Monitor, MonitorError};

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

async fn run(args: Args) -> Result<(), MonitorError> {
    let stop = listen_for_ctrl_c().await;

    let defaults = match args.defaults_path() {
        Some(path) => Defaults::load(&path)?,
        None => Defaults::default(),
    };
    let config = args.into_run_config(&defaults)?;
    let host = config.host.clone();

    let mut monitor = Monitor::connect(config).await?;
    info!("monitoring {host} ({})", monitor.prober().target_ip());
    monitor.run(stop).await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("cmon: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
