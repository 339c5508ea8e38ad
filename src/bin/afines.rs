use std::process::ExitCode;

use clap::Parser;

use afines::config::{Cli, Config};
use afines::error::AfinesError;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match Config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::from(2);
        }
    };

    match afines::driver::run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AfinesError::Config(msg)) => {
            log::error!("configuration error: {msg}");
            ExitCode::from(2)
        }
        Err(e) => {
            log::error!("fatal: {e}");
            ExitCode::from(1)
        }
    }
}
