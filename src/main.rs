use clap::Parser;
use sweeptrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    sweeptrader::logging::init_logging();
    run(Cli::parse())
}
