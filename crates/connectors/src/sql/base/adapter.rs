use crate::sql::base::{dialect::Dialect, error::DbError};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use model::{
    core::{storage_type::TypeMapping, table::TableRef, value::Value},
    records::batch::Batch,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseKind {
    MySql,
    Postgres,
    Other(String),
}

impl DatabaseKind {
    /// Infers the driver from a connection URL scheme.
    pub fn from_url(url: &str) -> Self {
        let scheme = url
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .unwrap_or_default()
            .to_ascii_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => DatabaseKind::Postgres,
            "mysql" | "mariadb" => DatabaseKind::MySql,
            other => DatabaseKind::Other(other.to_string()),
        }
    }
}

/// Sequential chunks of one query result, produced from a single cursor.
pub type BatchStream = BoxStream<'static, Result<Batch, DbError>>;

#[async_trait]
pub trait SqlAdapter: Send + Sync {
    // Exec / Params
    async fn exec(&self, sql: &str) -> Result<(), DbError>;
    async fn exec_params(&self, sql: &str, params: Vec<Value>) -> Result<u64, DbError>;

    /// Runs a query and collects the whole result into one batch.
    async fn query_batch(&self, sql: &str, params: Vec<Value>) -> Result<Batch, DbError>;

    /// Runs a query and yields its rows in batches of at most `chunk_size`.
    async fn stream_batches(&self, sql: &str, chunk_size: usize) -> Result<BatchStream, DbError>;

    // Destination
    /// Creates the schema of `table` and then `table` itself from `types`,
    /// each only when missing. Safe to call from concurrent connections.
    async fn create_table(&self, table: &TableRef, types: &TypeMapping) -> Result<(), DbError>;

    /// Appends every row of `batch` to an existing `table` in one
    /// transaction. Returns the number of rows written.
    async fn append_batch(
        &self,
        table: &TableRef,
        batch: &Batch,
        types: &TypeMapping,
    ) -> Result<u64, DbError>;

    // Dialect
    fn kind(&self) -> DatabaseKind;
    fn dialect(&self) -> Box<dyn Dialect>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_url_scheme() {
        assert_eq!(
            DatabaseKind::from_url("postgres://u:p@localhost/db"),
            DatabaseKind::Postgres
        );
        assert_eq!(
            DatabaseKind::from_url("PostgreSQL://localhost/db"),
            DatabaseKind::Postgres
        );
        assert_eq!(
            DatabaseKind::from_url("mariadb://localhost/db"),
            DatabaseKind::MySql
        );
        assert_eq!(
            DatabaseKind::from_url("mssql://localhost/db"),
            DatabaseKind::Other("mssql".to_string())
        );
        assert_eq!(
            DatabaseKind::from_url("no-scheme"),
            DatabaseKind::Other(String::new())
        );
    }
}
