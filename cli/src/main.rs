use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::sync::Arc;

use tilde_cli::cli::{Cli, Command, ContainerCommand};
use tilde_cli::{commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    let command = match &args.command {
        Command::Install(_) => "install",
        Command::Uninstall(_) => "uninstall",
        Command::Container(_) => "container",
        Command::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "tilde", &mut std::io::stdout());
            return Ok(());
        }
        Command::Version => {
            commands::version::run();
            return Ok(());
        }
    };

    logging::init_subscriber(args.verbose, command);
    let log = Arc::new(logging::Logger::new(command));

    match &args.command {
        Command::Install(opts) => commands::install::run(&args.global, opts, &log),
        Command::Uninstall(opts) => commands::uninstall::run(&args.global, opts, &log),
        Command::Container(ContainerCommand::Build(opts)) => {
            commands::container::build(&args.global, opts, &log)
        }
        Command::Container(ContainerCommand::Run(opts)) => {
            commands::container::run(&args.global, opts, &log)
        }
        Command::Completions { .. } | Command::Version => Ok(()),
    }
}
