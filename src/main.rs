use clap::Parser;
use sigtrader::cli::{Cli, run};
use sigtrader::logging::setup_logging;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_str());
    run(cli)
}
