#![forbid(unsafe_code)]

//! asb: ABM surrogate bench CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("asb: {e}");
        std::process::exit(e.exit_code());
    }
}
