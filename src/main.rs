use clap::Parser;
use intradar::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
