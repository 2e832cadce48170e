mod platform;

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let cli = platform::Cli::parse();
    match platform::run_app(cli) {
        Ok(summary) if summary.failed == 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}
