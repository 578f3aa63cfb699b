//! `kilt` command line entry point

use std::process::ExitCode;

fn main() -> ExitCode {
    let matches = kilt_cli::build_cli().get_matches();
    kilt_cli::logging::init(matches.get_flag("log-json"));

    match kilt_cli::run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "kilt failed");
            ExitCode::FAILURE
        }
    }
}
