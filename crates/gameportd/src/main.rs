mod api;
mod cli;
mod daemon;
mod logging;
mod sink;

use std::process::ExitCode;

use clap::Parser;

use crate::api::Command as ApiCommand;
use crate::cli::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::setup(cli.verbose, cli.no_color);

    let runtime_dir = cli.runtime_dir();
    match cli.command {
        Command::Run(args) => daemon::run(&args, &runtime_dir),
        Command::Ports => daemon::print_ports(),
        Command::Policy { swap, axis1, axis2 } => daemon::send(
            &runtime_dir,
            &ApiCommand::Policy {
                swap: swap.map(bool::from),
                axis1: axis1.map(bool::from),
                axis2: axis2.map(bool::from),
            },
        ),
        Command::Connect => daemon::send(&runtime_dir, &ApiCommand::Connect),
        Command::Disconnect => daemon::send(&runtime_dir, &ApiCommand::Disconnect),
    }
}
