use core::num::NonZero;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Measures how fast a MySQL server accepts new connections.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
#[command(flatten_help = true)]
pub struct Cmd {
    #[clap(subcommand)]
    pub mode: ModeCmd,
    /// Be verbose in terms of logging.
    #[clap(short, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Parser)]
pub enum ModeCmd {
    /// Connection establishment benchmark.
    ///
    /// Optionally precreates a set of idle connections, then measures how
    /// long it takes to establish the given number of connections with
    /// bounded concurrency.
    Bench(BenchCmd),
    /// Connect once and print server status variables.
    Status(StatusCmd),
}

#[derive(Debug, Clone, Parser)]
pub struct BenchCmd {
    /// Target server settings.
    #[clap(flatten)]
    pub conn: ConnCmd,
    /// Maximum number of connection attempts in flight.
    #[clap(short, long, default_value_t = NonZero::<usize>::new(10).unwrap_or(NonZero::<usize>::MIN))]
    pub concurrency: NonZero<usize>,
    /// Create this many connections before the measurement starts.
    ///
    /// These connections are created one by one and held open until the end
    /// of the run, simulating idle background load.
    #[clap(short = 'l', long, default_value_t = 0)]
    pub preload: usize,
    /// Measure creation of this many connections.
    #[clap(short = 't', long = "test-count", default_value_t = 300)]
    pub count: usize,
    /// Extra file descriptors reserved on top of the connections when
    /// adjusting the NOFILE limit.
    #[clap(long, default_value_t = 1024)]
    pub fd_margin: u64,
    /// Keep going when a connection fails and report the failures at the end.
    ///
    /// By default the first failure aborts the run.
    #[clap(long)]
    pub isolate_failures: bool,
}

#[derive(Debug, Clone, Parser)]
pub struct StatusCmd {
    /// Target server settings.
    #[clap(flatten)]
    pub conn: ConnCmd,
}

/// Target server settings.
#[derive(Debug, Clone, Parser)]
pub struct ConnCmd {
    /// Hostname or IP of the MySQL server.
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    pub hostname: String,
    /// MySQL server port.
    #[clap(short = 'P', long, default_value_t = 3306)]
    pub port: u16,
    /// Database to connect to.
    #[clap(short, long, default_value = "mysql")]
    pub database: String,
    /// MySQL username.
    #[clap(short, long, default_value = "mysql")]
    pub username: String,
    /// MySQL password.
    #[clap(short, long, env = "MYSQL_PWD", default_value = "", hide_env_values = true)]
    pub password: String,
    /// Path to the CA certificate in PEM format.
    ///
    /// TLS is enabled only when the CA, the certificate and the key are all
    /// given.
    #[clap(long, value_name = "PATH")]
    pub ssl_ca: Option<PathBuf>,
    /// Path to the client certificate in PEM format.
    #[clap(long, value_name = "PATH")]
    pub ssl_cert: Option<PathBuf>,
    /// Path to the client certificate key in PEM format.
    #[clap(long, value_name = "PATH")]
    pub ssl_key: Option<PathBuf>,
    /// Skip server certificate verification.
    #[clap(short, long)]
    pub insecure: bool,
}
