use core::future::Future;

use mysql_async::{prelude::Queryable, ClientIdentity, Conn, Opts, OptsBuilder, SslOpts};

use super::{Connection, Connector};
use crate::{
    cfg::{ConnConfig, TlsConfig},
    error::Error,
};

/// Query used to check that a freshly established connection is alive.
const LIVENESS_QUERY: &str = "SELECT 1";

/// MySQL connector.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    opts: Opts,
}

impl MySqlConnector {
    pub fn new(cfg: &ConnConfig) -> Self {
        let mut opts = OptsBuilder::default()
            .ip_or_hostname(cfg.host.clone())
            .tcp_port(cfg.port)
            .user(Some(cfg.username.clone()))
            .pass(Some(cfg.password.clone()))
            .db_name(Some(cfg.database.clone()))
            // Otherwise the client silently switches to the unix socket for
            // local servers and we end up measuring something else.
            .prefer_socket(false);

        if let Some(tls) = &cfg.tls {
            opts = opts.ssl_opts(ssl_opts(tls));
        }

        Self { opts: opts.into() }
    }

    /// Establishes a new connection without the liveness check.
    async fn establish(&self) -> Result<Conn, Error> {
        let conn = Conn::new(self.opts.clone()).await?;

        Ok(conn)
    }
}

impl Connector for MySqlConnector {
    type Conn = MySqlConnection;

    fn connect(&self) -> impl Future<Output = Result<Self::Conn, Error>> + Send {
        async move {
            let mut conn = self.establish().await?;
            // Results are dropped right away, so nothing stays buffered on the
            // connection.
            conn.query_drop(LIVENESS_QUERY).await?;

            log::trace!("connection {} established", conn.id());

            Ok(MySqlConnection { conn })
        }
    }
}

fn ssl_opts(tls: &TlsConfig) -> SslOpts {
    let identity = ClientIdentity::new(tls.cert.clone().into(), tls.key.clone().into());

    SslOpts::default()
        .with_root_certs(vec![tls.ca.clone().into()])
        .with_client_identity(Some(identity))
        .with_danger_accept_invalid_certs(tls.insecure)
        .with_danger_skip_domain_validation(tls.insecure)
}

/// Established MySQL connection.
#[derive(Debug)]
pub struct MySqlConnection {
    conn: Conn,
}

impl MySqlConnection {
    /// Returns server status variables as name-value pairs.
    pub async fn status(&mut self) -> Result<Vec<(String, Option<String>)>, Error> {
        let rows = self.conn.query("SHOW STATUS").await?;

        Ok(rows)
    }
}

impl Connection for MySqlConnection {
    fn close(self) -> impl Future<Output = Result<(), Error>> + Send {
        async move {
            self.conn.disconnect().await?;

            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cfg() -> ConnConfig {
        ConnConfig {
            host: "db.local".into(),
            port: 3307,
            database: "app".into(),
            username: "bench".into(),
            password: "secret".into(),
            tls: None,
        }
    }

    #[test]
    fn test_opts_from_config() {
        let connector = MySqlConnector::new(&cfg());
        let opts = &connector.opts;

        assert_eq!(opts.ip_or_hostname(), "db.local");
        assert_eq!(opts.tcp_port(), 3307);
        assert_eq!(opts.user(), Some("bench"));
        assert_eq!(opts.pass(), Some("secret"));
        assert_eq!(opts.db_name(), Some("app"));
        assert!(!opts.prefer_socket());
        assert!(opts.ssl_opts().is_none());
    }

    #[test]
    fn test_opts_with_tls() {
        let mut cfg = cfg();
        cfg.tls = Some(TlsConfig {
            ca: b"ca".to_vec(),
            cert: b"cert".to_vec(),
            key: b"key".to_vec(),
            insecure: true,
        });

        let connector = MySqlConnector::new(&cfg);
        let ssl = connector.opts.ssl_opts().unwrap();

        assert!(ssl.accept_invalid_certs());
        assert!(ssl.skip_domain_validation());
        assert!(ssl.client_identity().is_some());
        assert_eq!(ssl.root_certs().len(), 1);
    }
}
