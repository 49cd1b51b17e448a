use std::process::ExitCode;

use clap::Parser;
use env_logger::{Builder, Env};
use log::{debug, LevelFilter};

use heart_risk::cli::{self, HeartArgs};

#[tokio::main]
async fn main() -> ExitCode {
    let args = HeartArgs::parse();

    let log_level = match args.verbose {
        1 => LevelFilter::Debug,
        2.. => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    let env = Env::new().filter("HEART_LOG");
    Builder::new()
        .filter(Some("heart_risk"), log_level)
        .parse_env(env)
        .init();

    debug!("Arguments {:#?}", args);

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
