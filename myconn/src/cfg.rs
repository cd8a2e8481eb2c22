use core::{
    fmt::{self, Debug, Formatter},
    num::NonZero,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    bounded::FailurePolicy,
    cmd::{BenchCmd, Cmd, ConnCmd, ModeCmd, StatusCmd},
    error::Error,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: ModeConfig,
}

impl TryFrom<Cmd> for Config {
    type Error = Error;

    fn try_from(v: Cmd) -> Result<Self, Self::Error> {
        let mode = v.mode.try_into()?;

        Ok(Self { mode })
    }
}

#[derive(Debug, Clone)]
pub enum ModeConfig {
    Bench(BenchConfig),
    Status(ConnConfig),
}

impl TryFrom<ModeCmd> for ModeConfig {
    type Error = Error;

    fn try_from(v: ModeCmd) -> Result<Self, Self::Error> {
        let m = match v {
            ModeCmd::Bench(v) => Self::Bench(v.try_into()?),
            ModeCmd::Status(StatusCmd { conn }) => Self::Status(conn.try_into()?),
        };

        Ok(m)
    }
}

/// Benchmark settings.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Target server settings.
    pub conn: ConnConfig,
    /// Maximum number of connection attempts in flight.
    pub concurrency: NonZero<usize>,
    /// Number of connections created before the measurement.
    pub preload: usize,
    /// Number of connections whose creation is measured.
    pub count: usize,
    /// Extra file descriptors reserved when adjusting the NOFILE limit.
    pub fd_margin: u64,
    /// What to do when a connection attempt fails during measurement.
    pub policy: FailurePolicy,
}

impl BenchConfig {
    /// Returns the number of file descriptors this run requires.
    #[inline]
    pub fn fd_needed(&self) -> u64 {
        (self.preload as u64)
            .saturating_add(self.count as u64)
            .saturating_add(self.fd_margin)
    }
}

impl TryFrom<BenchCmd> for BenchConfig {
    type Error = Error;

    fn try_from(cmd: BenchCmd) -> Result<Self, Self::Error> {
        let BenchCmd {
            conn,
            concurrency,
            preload,
            count,
            fd_margin,
            isolate_failures,
        } = cmd;

        let policy = if isolate_failures {
            FailurePolicy::Isolate
        } else {
            FailurePolicy::Abort
        };

        let m = Self {
            conn: conn.try_into()?,
            concurrency,
            preload,
            count,
            fd_margin,
            policy,
        };

        Ok(m)
    }
}

/// Target server settings.
#[derive(Clone)]
pub struct ConnConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub tls: Option<TlsConfig>,
}

impl Debug for ConnConfig {
    fn fmt(&self, fmt: &mut Formatter) -> Result<(), fmt::Error> {
        fmt.debug_struct("ConnConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("tls", &self.tls)
            .finish()
    }
}

impl TryFrom<ConnCmd> for ConnConfig {
    type Error = Error;

    fn try_from(cmd: ConnCmd) -> Result<Self, Self::Error> {
        let ConnCmd {
            hostname,
            port,
            database,
            username,
            password,
            ssl_ca,
            ssl_cert,
            ssl_key,
            insecure,
        } = cmd;

        let tls = match (ssl_ca, ssl_cert, ssl_key) {
            (Some(ca), Some(cert), Some(key)) => Some(TlsConfig::from_fs(&ca, &cert, &key, insecure)?),
            (None, None, None) => None,
            _ => {
                return Err(Error::Config(
                    "--ssl-ca, --ssl-cert and --ssl-key must be given together".into(),
                ));
            }
        };

        let m = Self {
            host: hostname,
            port,
            database,
            username,
            password,
            tls,
        };

        Ok(m)
    }
}

/// TLS material in PEM format.
#[derive(Clone)]
pub struct TlsConfig {
    pub ca: Vec<u8>,
    pub cert: Vec<u8>,
    pub key: Vec<u8>,
    /// Skip server certificate verification.
    pub insecure: bool,
}

impl TlsConfig {
    pub fn from_fs(ca: &Path, cert: &Path, key: &Path, insecure: bool) -> Result<Self, Error> {
        let m = Self {
            ca: read(ca)?,
            cert: read(cert)?,
            key: read(key)?,
            insecure,
        };

        Ok(m)
    }
}

impl Debug for TlsConfig {
    fn fmt(&self, fmt: &mut Formatter) -> Result<(), fmt::Error> {
        fmt.debug_struct("TlsConfig")
            .field("ca", &format_args!("{} bytes", self.ca.len()))
            .field("cert", &format_args!("{} bytes", self.cert.len()))
            .field("key", &"***")
            .field("insecure", &self.insecure)
            .finish()
    }
}

fn read(path: &Path) -> Result<Vec<u8>, Error> {
    fs::read(path).map_err(|source| Error::FileIo { path: PathBuf::from(path), source })
}

#[cfg(test)]
mod test {
    use std::{env, process};

    use clap::Parser;

    use super::*;

    fn bench(args: &[&str]) -> Result<BenchConfig, Error> {
        let cmd = Cmd::try_parse_from(["myconn", "bench"].iter().chain(args).copied()).unwrap();
        match Config::try_from(cmd)?.mode {
            ModeConfig::Bench(cfg) => Ok(cfg),
            ModeConfig::Status(..) => panic!("expected bench mode"),
        }
    }

    #[test]
    fn test_fd_needed() {
        let cfg = bench(&["-l", "50", "-t", "200"]).unwrap();

        assert_eq!(cfg.fd_needed(), 50 + 200 + 1024);
        assert!(cfg.conn.tls.is_none());
        assert_eq!(cfg.policy, FailurePolicy::Abort);
    }

    #[test]
    fn test_isolate_failures_policy() {
        let cfg = bench(&["--isolate-failures"]).unwrap();

        assert_eq!(cfg.policy, FailurePolicy::Isolate);
    }

    #[test]
    fn test_partial_tls_rejected() {
        let err = bench(&["--ssl-ca", "/nonexistent/ca.pem"]).unwrap_err();

        assert!(matches!(err, Error::Config(..)), "{err:?}");
    }

    #[test]
    fn test_unreadable_tls_material() {
        let err = bench(&[
            "--ssl-ca",
            "/nonexistent/ca.pem",
            "--ssl-cert",
            "/nonexistent/cert.pem",
            "--ssl-key",
            "/nonexistent/key.pem",
        ])
        .unwrap_err();

        match err {
            Error::FileIo { path, .. } => assert_eq!(path, PathBuf::from("/nonexistent/ca.pem")),
            err => panic!("unexpected error: {err:?}"),
        }
    }

    #[test]
    fn test_tls_material_loaded() {
        let dir = env::temp_dir().join(format!("myconn-cfg-{}", process::id()));
        fs::create_dir_all(&dir).unwrap();
        let ca = dir.join("ca.pem");
        let cert = dir.join("cert.pem");
        let key = dir.join("key.pem");
        fs::write(&ca, b"ca").unwrap();
        fs::write(&cert, b"cert").unwrap();
        fs::write(&key, b"key").unwrap();

        let cfg = bench(&[
            "--ssl-ca",
            ca.to_str().unwrap(),
            "--ssl-cert",
            cert.to_str().unwrap(),
            "--ssl-key",
            key.to_str().unwrap(),
            "--insecure",
        ])
        .unwrap();
        fs::remove_dir_all(&dir).unwrap();

        let tls = cfg.conn.tls.unwrap();
        assert_eq!(tls.ca, b"ca");
        assert_eq!(tls.cert, b"cert");
        assert_eq!(tls.key, b"key");
        assert!(tls.insecure);
    }
}
