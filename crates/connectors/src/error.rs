use crate::sql::base::error::ConnectorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// The connection URL names a driver this crate does not speak.
    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    /// Failed to open the underlying connection.
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),
}
