use crate::{
    error::LoadError,
    schema::{audit::normalize, coercion::coerce_batch, mapping::infer_types},
};
use connectors::{
    adapter::{Connect, ConnectionDescriptor},
    sql::base::adapter::SqlAdapter,
};
use model::{core::table::TableRef, records::batch::Batch};
use std::sync::Arc;
use tracing::{debug, info};

/// Loads one batch into a destination table: audit columns, pinned storage
/// types, then an append. Table creation is a separate step so a parallel
/// load can run it once before fanning out.
#[derive(Clone)]
pub struct ChunkLoader {
    connector: Arc<dyn Connect>,
    schema: String,
}

impl ChunkLoader {
    pub fn new(connector: Arc<dyn Connect>, schema: impl Into<String>) -> Self {
        Self {
            connector,
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Opens a fresh connection from `descriptor` and loads through it.
    pub async fn load(
        &self,
        batch: Batch,
        table_name: &str,
        descriptor: &ConnectionDescriptor,
    ) -> Result<u64, LoadError> {
        let adapter = self.open(descriptor).await?;
        self.load_with(adapter.as_ref(), batch, table_name).await
    }

    pub async fn open(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Arc<dyn SqlAdapter>, LoadError> {
        debug!(connection = %descriptor.name, "Opening destination connection");
        Ok(self.connector.connect(descriptor).await?)
    }

    /// Creates the destination table for batches shaped like `sample`,
    /// audit columns included. Only the sample's fields are used.
    pub async fn create_table(
        &self,
        adapter: &dyn SqlAdapter,
        sample: &Batch,
        table_name: &str,
    ) -> Result<(), LoadError> {
        let shape = normalize(Batch::new(sample.id.clone(), sample.fields.clone()));
        let types = infer_types(&shape);
        let table = self.table(table_name);
        adapter.create_table(&table, &types).await?;
        debug!(table = %table, columns = types.len(), "Destination table ready");
        Ok(())
    }

    /// Creates the table if needed, then appends through `adapter`.
    pub async fn load_with(
        &self,
        adapter: &dyn SqlAdapter,
        batch: Batch,
        table_name: &str,
    ) -> Result<u64, LoadError> {
        self.create_table(adapter, &batch, table_name).await?;
        self.append_with(adapter, batch, table_name).await
    }

    /// Appends to a table that already exists.
    pub async fn append_with(
        &self,
        adapter: &dyn SqlAdapter,
        batch: Batch,
        table_name: &str,
    ) -> Result<u64, LoadError> {
        let batch = normalize(batch);
        let types = infer_types(&batch);
        let batch = coerce_batch(batch, &types)?;
        let table = self.table(table_name);

        let written = adapter.append_batch(&table, &batch, &types).await?;
        info!(
            batch_id = %batch.id,
            table = %table,
            rows = written,
            "Chunk loaded"
        );
        Ok(written)
    }

    fn table(&self, table_name: &str) -> TableRef {
        TableRef::new(self.schema.as_str(), table_name)
    }
}
