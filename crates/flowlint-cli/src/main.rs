mod cli;
mod cmd;
mod error;
mod format;
mod io;
mod logging;

use clap::Parser;

use crate::cli::{Cli, Command};
use crate::cmd::validate::ValidateArgs;
use crate::error::CliError;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let code = match dispatch(cli) {
        Ok(()) => 0,
        Err(e) => {
            if !e.is_reported() {
                eprintln!("{}", e.message());
            }
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Validate {
            paths,
            fix,
            style,
            rules,
            profile,
            no_backup,
        } => cmd::validate::run(&ValidateArgs {
            paths,
            fix,
            style: style.into(),
            rules,
            profile,
            backup: !no_backup,
            max_file_size: cli.max_file_size,
            colors: format::colors_enabled(cli.no_color),
        }),
        Command::Rules { profile } => cmd::rules::run(&profile),
    }
}
