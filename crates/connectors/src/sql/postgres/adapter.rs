use crate::sql::{
    base::{
        adapter::{BatchStream, DatabaseKind, SqlAdapter},
        dialect::{self, Dialect},
        error::{ConnectorError, DbError},
        query::generator::QueryGenerator,
    },
    postgres::{
        params::{PgParam, PgParamStore},
        row::{decode_row, fields_from_columns},
        utils::connect_client,
    },
};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use model::{
    core::{
        storage_type::{StorageType, TypeMapping},
        table::TableRef,
        value::Value,
    },
    records::batch::Batch,
};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockWriteGuard};
use tokio_postgres::Client;
use tracing::debug;

#[derive(Clone)]
pub struct PgAdapter {
    client: Arc<RwLock<Client>>,
    dialect: dialect::Postgres,
}

impl PgAdapter {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let client = Arc::new(RwLock::new(connect_client(url).await?));
        Ok(PgAdapter {
            client,
            dialect: dialect::Postgres,
        })
    }

    pub async fn lock_client(&self) -> RwLockWriteGuard<'_, Client> {
        self.client.write().await
    }
}

#[async_trait]
impl SqlAdapter for PgAdapter {
    async fn exec(&self, sql: &str) -> Result<(), DbError> {
        debug!(sql, "Executing statement");
        let client = self.client.read().await;
        client.batch_execute(sql).await?;
        Ok(())
    }

    async fn exec_params(&self, sql: &str, params: Vec<Value>) -> Result<u64, DbError> {
        let bindings = PgParamStore::from_values(params);
        let client = self.client.read().await;
        let affected = client.execute(sql, &bindings.as_refs()).await?;
        Ok(affected)
    }

    async fn query_batch(&self, sql: &str, params: Vec<Value>) -> Result<Batch, DbError> {
        let bindings = PgParamStore::from_values(params);
        let client = self.client.read().await;
        let statement = client.prepare(sql).await?;
        let fields = fields_from_columns(statement.columns());
        let rows = client.query(&statement, &bindings.as_refs()).await?;

        let mut batch = Batch::new("query", fields);
        for row in &rows {
            let values = decode_row(row, &batch.fields)?;
            batch
                .push_row(values)
                .map_err(|e| DbError::Query(e.to_string()))?;
        }
        Ok(batch)
    }

    async fn stream_batches(&self, sql: &str, chunk_size: usize) -> Result<BatchStream, DbError> {
        let chunk_size = chunk_size.max(1);
        let client = self.client.read().await;
        let statement = client.prepare(sql).await?;
        let fields = fields_from_columns(statement.columns());
        let no_params: Vec<String> = Vec::new();
        let rows = client.query_raw(&statement, no_params).await?;

        let stream = rows
            .map_err(DbError::from)
            .chunks(chunk_size)
            .enumerate()
            .map(move |(index, chunk)| {
                let mut batch = Batch::new(format!("chunk-{index}"), fields.clone());
                batch.rows.reserve(chunk.len());
                for row in chunk {
                    let values = decode_row(&row?, &batch.fields)?;
                    batch
                        .push_row(values)
                        .map_err(|e| DbError::Query(e.to_string()))?;
                }
                Ok(batch)
            });

        Ok(stream.boxed())
    }

    async fn create_table(&self, table: &TableRef, types: &TypeMapping) -> Result<(), DbError> {
        let generator = QueryGenerator::new(&self.dialect);
        let mut client = self.lock_client().await;
        let tx = client.transaction().await?;

        // Concurrent IF NOT EXISTS DDL collides in the catalog; serialize per schema.
        tx.execute(
            "SELECT pg_advisory_xact_lock(hashtext($1))",
            &[&table.schema],
        )
        .await?;

        let ddl = [
            generator.create_schema(&table.schema),
            generator.create_table(table, types),
        ];
        for sql in &ddl {
            debug!(sql = %sql, "Ensuring destination table");
            tx.batch_execute(sql).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn append_batch(
        &self,
        table: &TableRef,
        batch: &Batch,
        types: &TypeMapping,
    ) -> Result<u64, DbError> {
        let generator = QueryGenerator::new(&self.dialect);
        let columns = batch.column_names();
        let storage = columns
            .iter()
            .map(|name| {
                types.get(name).ok_or_else(|| {
                    DbError::Write(format!("No storage type pinned for column '{name}'"))
                })
            })
            .collect::<Result<Vec<StorageType>, DbError>>()?;

        let mut client = self.lock_client().await;
        let tx = client.transaction().await?;

        let mut written = 0u64;
        for rows in batch.rows.chunks(generator.rows_per_statement(columns.len())) {
            let sql = generator.insert_rows(table, &columns, rows.len());
            let params = rows
                .iter()
                .flat_map(|row| row.iter().cloned().zip(storage.iter().copied()))
                .map(|(value, storage)| PgParam::for_storage(value, storage))
                .collect();
            let bindings = PgParamStore::from_params(params);
            written += tx.execute(sql.as_str(), &bindings.as_refs()).await?;
        }

        tx.commit().await?;
        Ok(written)
    }

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    fn dialect(&self) -> Box<dyn Dialect> {
        Box::new(self.dialect.clone())
    }
}
