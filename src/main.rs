use std::io;
use std::process::ExitCode;

use gbm_probe::options::ProbeOptionsBuilder;
use gbm_probe::platform::gbm::GbmPlatform;
use gbm_probe::{driver, Error};
use log::LevelFilter;
use simple_logger::SimpleLogger;

fn main() -> ExitCode {
    // RUST_LOG takes precedence over the default level.
    if let Err(err) = SimpleLogger::new().with_level(LevelFilter::Warn).env().init() {
        eprintln!("failed to set up logging: {err}");
    }

    match probe() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} error: {err}", err.module());
            ExitCode::FAILURE
        },
    }
}

fn probe() -> Result<(), Error> {
    let options = ProbeOptionsBuilder::new().with_env().build();
    let platform = GbmPlatform::new(options.device())?;

    let stdout = io::stdout();
    driver::run(platform, &options, &mut stdout.lock())
}
