//! `tds` entry point: parse arguments, run the command, and print failures
//! with their details and suggestions.

use clap::Parser;
use tera_datasources::cli::Cli;
use tera_datasources::core::user_friendly_error;

fn main() {
    let cli = Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    if let Err(e) = cli.execute() {
        user_friendly_error(e).display();
        std::process::exit(1);
    }
}
