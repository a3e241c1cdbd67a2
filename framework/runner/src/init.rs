use crate::cli::LapseCli;
use clap::Parser;

/// Initialise the CLI and logging for the runner.
pub fn init() -> LapseCli {
    env_logger::init();

    LapseCli::parse()
}
