mod utils;
mod vectorize;

use crate::cli::{Cli, Commands, GlobalOptions};
use tonetrace::VectorizeResult;

/// The main function to run the command based on CLI input.
///
/// `Ok(false)` means the batch ran but at least one file failed.
pub fn run(cli: Cli) -> VectorizeResult<bool> {
    let Cli { global, command } = cli;
    utils::configure_threads(global.threads);
    dispatch(&global, command)
}

/// Dispatch the command to the appropriate handler.
fn dispatch(global: &GlobalOptions, command: Commands) -> VectorizeResult<bool> {
    match command {
        Commands::Color(cmd) => vectorize::run_color(global, cmd),
        Commands::BlackAndWhite(cmd) => vectorize::run_black_and_white(global, cmd),
    }
}
