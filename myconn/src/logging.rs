use std::error::Error;

use log::LevelFilter;
use simple_logger::SimpleLogger;

pub fn init(verbosity: usize) -> Result<(), Box<dyn Error>> {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    SimpleLogger::new()
        .with_level(LevelFilter::Off)
        .with_module_level("myconn", level)
        .with_module_level("mysql_async", verbosity_of_client(verbosity))
        .with_utc_timestamps()
        .init()?;

    Ok(())
}

/// The client library is chatty, so it gets one level less than we do.
fn verbosity_of_client(verbosity: usize) -> LevelFilter {
    match verbosity {
        0 | 1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}
