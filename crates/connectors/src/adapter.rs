use crate::{
    error::AdapterError,
    sql::{
        base::adapter::{DatabaseKind, SqlAdapter},
        mysql::adapter::MySqlAdapter,
        postgres::adapter::PgAdapter,
    },
};
use async_trait::async_trait;
use std::{fmt, sync::Arc};

/// A reusable, re-establishable reference to a database. Carries no live
/// handle, so it can be cloned into worker tasks freely.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub name: String,
    pub url: String,
}

impl ConnectionDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        ConnectionDescriptor {
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn kind(&self) -> DatabaseKind {
        DatabaseKind::from_url(&self.url)
    }
}

// Connection strings carry credentials; only the logical name is printed.
impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Opens adapters from descriptors.
#[async_trait]
pub trait Connect: Send + Sync {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Arc<dyn SqlAdapter>, AdapterError>;
}

/// Picks the driver from the URL scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverConnector;

#[async_trait]
impl Connect for DriverConnector {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Arc<dyn SqlAdapter>, AdapterError> {
        match descriptor.kind() {
            DatabaseKind::Postgres => {
                let adapter = PgAdapter::connect(&descriptor.url).await?;
                Ok(Arc::new(adapter))
            }
            DatabaseKind::MySql => {
                let adapter = MySqlAdapter::connect(&descriptor.url).await?;
                Ok(Arc::new(adapter))
            }
            DatabaseKind::Other(scheme) => Err(AdapterError::UnsupportedDriver(scheme)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_the_url() {
        let descriptor = ConnectionDescriptor::new("con_home", "postgres://etl:secret@db/dwh");
        let printed = format!("{descriptor:?}");
        assert!(printed.contains("con_home"));
        assert!(!printed.contains("secret"));
    }

    #[tokio::test]
    async fn unknown_scheme_is_rejected_without_dialing() {
        let descriptor = ConnectionDescriptor::new("legacy", "mssql://sa@host/db");
        let err = DriverConnector.connect(&descriptor).await.err();
        assert!(matches!(err, Some(AdapterError::UnsupportedDriver(s)) if s == "mssql"));
    }
}
