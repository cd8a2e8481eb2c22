use core::future::Future;

use crate::error::Error;

pub mod mysql;

/// Produces live, validated connections to the target service.
///
/// Implementations are shared between concurrently running tasks, hence the
/// returned futures must be [`Send`].
pub trait Connector: Send + Sync + 'static {
    /// The type of connections produced.
    type Conn: Connection;

    /// Establishes a new connection and performs a liveness check on it.
    fn connect(&self) -> impl Future<Output = Result<Self::Conn, Error>> + Send;
}

/// A single established session with the target service.
pub trait Connection: Send + 'static {
    /// Closes this connection.
    ///
    /// The handle is consumed, so closing the same connection twice is
    /// impossible.
    fn close(self) -> impl Future<Output = Result<(), Error>> + Send;
}
