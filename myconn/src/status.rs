use crate::{
    cfg::ConnConfig,
    conn::{
        mysql::{MySqlConnection, MySqlConnector},
        Connection, Connector,
    },
    error::Error,
};

/// Connects to the server and fetches its status variables.
pub async fn fetch(cfg: &ConnConfig) -> Result<Vec<(String, Option<String>)>, Error> {
    let mut conn: MySqlConnection = MySqlConnector::new(cfg).connect().await?;
    let rc = conn.status().await;

    if let Err(err) = conn.close().await {
        log::warn!("failed to close connection: {err}");
    }

    rc
}

/// Formats status variables as `name:value` lines.
pub fn format(rows: &[(String, Option<String>)]) -> String {
    rows.iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.as_deref().unwrap_or_default()))
        .collect()
}
