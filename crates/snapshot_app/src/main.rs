mod cli;
mod settings;

use std::process::ExitCode;

use clap::Parser;
use engine_logging::engine_error;

const FATAL_EXIT_CODE: u8 = 6;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Args::parse();
    engine_logging::initialize(args.log_destination(), args.log_level());

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            engine_error!("{:#}", err);
            ExitCode::from(FATAL_EXIT_CODE)
        }
    }
}
