use core::error::Error;

use clap::Parser;
use myconn::{
    cfg::{BenchConfig, Config, ConnConfig, ModeConfig},
    cmd::Cmd,
    conn::mysql::MySqlConnector,
    limit::OsLimiter,
    runtime::Runtime,
    status,
};
use tokio::runtime::Builder;

#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

pub fn main() {
    let cmd = Cmd::parse();
    if let Err(err) = myconn::logging::init(cmd.verbose as usize) {
        eprintln!("ERROR: failed to initialize logging: {err}");
        std::process::exit(1);
    }

    if let Err(err) = run(cmd) {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}

fn run(cmd: Cmd) -> Result<(), Box<dyn Error>> {
    let cfg: Config = cmd.try_into()?;
    log::debug!("started with {cfg:?}");

    // Init I/O runtime.
    let runtime = Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .thread_name("myconn")
        .build()?;

    match cfg.mode {
        ModeConfig::Bench(cfg) => runtime.block_on(bench(cfg)),
        ModeConfig::Status(cfg) => runtime.block_on(show_status(cfg)),
    }
}

async fn bench(cfg: BenchConfig) -> Result<(), Box<dyn Error>> {
    let connector = MySqlConnector::new(&cfg.conn);
    let runtime = Runtime::new(cfg, connector, OsLimiter);

    // Alternate formatting includes the whole context chain.
    let report = runtime.run().await.map_err(|err| format!("{err:#}"))?;
    println!("{report}");

    Ok(())
}

async fn show_status(cfg: ConnConfig) -> Result<(), Box<dyn Error>> {
    let rows = status::fetch(&cfg).await?;
    print!("{}", status::format(&rows));

    Ok(())
}
