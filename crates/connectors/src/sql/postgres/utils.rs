use crate::sql::base::error::ConnectorError;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::{
    Client, Config, NoTls, Socket,
    config::SslMode,
    tls::MakeTlsConnect,
};
use tracing::{debug, error, warn};

/// TLS negotiation for one connection, derived from the URL's `sslmode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TlsPolicy {
    Off,
    /// Try TLS, fall back to plaintext if the handshake fails.
    Preferred,
    Required,
}

impl TlsPolicy {
    fn of(config: &Config) -> Self {
        match config.get_ssl_mode() {
            SslMode::Disable => TlsPolicy::Off,
            SslMode::Prefer => TlsPolicy::Preferred,
            _ => TlsPolicy::Required,
        }
    }
}

/// Opens a client for `url`. The connection task runs detached and logs
/// its own failure.
pub async fn connect_client(url: &str) -> Result<Client, ConnectorError> {
    let config = parse_url(url)?;
    let policy = TlsPolicy::of(&config);
    debug!(?policy, dbname = ?config.get_dbname(), "Opening Postgres client");

    match policy {
        TlsPolicy::Off => open(&config, NoTls).await,
        TlsPolicy::Required => open(&config, native_tls()?).await,
        TlsPolicy::Preferred => {
            let secured = match native_tls() {
                Ok(tls) => open(&config, tls).await,
                Err(err) => Err(err),
            };
            match secured {
                Ok(client) => Ok(client),
                Err(err) => {
                    warn!(error = %err, "Postgres TLS negotiation failed, using plaintext");
                    open(&config, NoTls).await
                }
            }
        }
    }
}

fn parse_url(url: &str) -> Result<Config, ConnectorError> {
    url.parse::<Config>()
        .map_err(|e| ConnectorError::InvalidUrl(e.to_string()))
}

fn native_tls() -> Result<MakeTlsConnector, ConnectorError> {
    Ok(MakeTlsConnector::new(TlsConnector::builder().build()?))
}

async fn open<T>(config: &Config, tls: T) -> Result<Client, ConnectorError>
where
    T: MakeTlsConnect<Socket>,
    T::Stream: Send + 'static,
{
    let (client, connection) = config.connect(tls).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(error = %err, "Postgres connection closed with error");
        }
    });
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(url: &str) -> TlsPolicy {
        TlsPolicy::of(&parse_url(url).unwrap())
    }

    #[test]
    fn sslmode_selects_policy() {
        assert_eq!(
            policy("postgres://u:p@localhost/db?sslmode=disable"),
            TlsPolicy::Off
        );
        assert_eq!(
            policy("postgres://u:p@localhost/db?sslmode=require"),
            TlsPolicy::Required
        );
        assert_eq!(
            policy("postgres://u:p@localhost/db?sslmode=prefer"),
            TlsPolicy::Preferred
        );
        // libpq default
        assert_eq!(policy("postgres://u:p@localhost/db"), TlsPolicy::Preferred);
    }

    #[tokio::test]
    async fn malformed_url_fails_before_connecting() {
        let err = connect_client("postgres://u:p@localhost:notaport/db")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidUrl(_)));
    }
}
