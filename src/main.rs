use clap::Parser;
use crosstrader::cli::{run, Cli};
use env_logger::Env;

fn main() -> std::process::ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    run(Cli::parse())
}
