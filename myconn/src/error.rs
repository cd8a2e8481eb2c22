use std::{io, path::PathBuf};

use thiserror::Error;

pub type BoxError = Box<dyn core::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to read {}: {source}", path.display())]
    FileIo { path: PathBuf, source: io::Error },
    #[error("failed to {op} NOFILE limit: {source}")]
    ResourceLimit { op: &'static str, source: io::Error },
    #[error("connection failed: {0}")]
    Connection(#[source] BoxError),
    #[error("{failed} of {total} connections failed")]
    Failed { failed: usize, total: usize },
}

impl Error {
    /// Wraps any connection-level failure, be it network, handshake or
    /// liveness check.
    #[inline]
    pub fn connection<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Connection(err.into())
    }
}

impl From<mysql_async::Error> for Error {
    #[inline]
    fn from(err: mysql_async::Error) -> Self {
        Self::connection(err)
    }
}
