use crate::sql::{
    base::{
        adapter::{BatchStream, DatabaseKind, SqlAdapter},
        dialect::{self, Dialect},
        error::{ConnectorError, DbError},
        query::generator::QueryGenerator,
    },
    mysql::{
        params::MySqlParamStore,
        row::{decode_row, fields_from_columns},
    },
};
use async_trait::async_trait;
use futures_util::StreamExt;
use model::{
    core::{storage_type::TypeMapping, table::TableRef, value::Value},
    records::batch::Batch,
};
use mysql_async::{Opts, Pool, Row, TxOpts, prelude::*};
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct MySqlAdapter {
    pool: Pool,
    dialect: dialect::MySql,
}

impl MySqlAdapter {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let opts = Opts::from_url(url).map_err(|e| ConnectorError::InvalidUrl(e.to_string()))?;
        let pool = Pool::new(opts);

        // Fail fast on unreachable servers instead of at first use.
        let conn = pool.get_conn().await?;
        drop(conn);

        Ok(MySqlAdapter {
            pool,
            dialect: dialect::MySql,
        })
    }
}

#[async_trait]
impl SqlAdapter for MySqlAdapter {
    async fn exec(&self, sql: &str) -> Result<(), DbError> {
        debug!(sql, "Executing statement");
        let mut conn = self.pool.get_conn().await?;
        conn.query_drop(sql).await?;
        Ok(())
    }

    async fn exec_params(&self, sql: &str, params: Vec<Value>) -> Result<u64, DbError> {
        let bindings = MySqlParamStore::from_values(&params);
        let mut conn = self.pool.get_conn().await?;
        conn.exec_drop(sql, bindings.params()).await?;
        Ok(conn.affected_rows())
    }

    async fn query_batch(&self, sql: &str, params: Vec<Value>) -> Result<Batch, DbError> {
        let bindings = MySqlParamStore::from_values(&params);
        let mut conn = self.pool.get_conn().await?;
        let mut result = conn.exec_iter(sql, bindings.params()).await?;
        let fields = result
            .columns()
            .map(|columns| fields_from_columns(&columns))
            .unwrap_or_default();

        let mut batch = Batch::new("query", fields);
        while let Some(row) = result.next().await? {
            let values = decode_row(&row, &batch.fields)?;
            batch
                .push_row(values)
                .map_err(|e| DbError::Query(e.to_string()))?;
        }
        Ok(batch)
    }

    async fn stream_batches(&self, sql: &str, chunk_size: usize) -> Result<BatchStream, DbError> {
        let chunk_size = chunk_size.max(1);
        let conn = self.pool.get_conn().await?;
        let sql = sql.to_string();
        let (tx, rx) = mpsc::channel::<Result<Batch, DbError>>(1);

        // The cursor borrows its connection, so a reader task owns both and
        // hands chunks over one at a time.
        tokio::spawn(async move {
            let mut conn = conn;
            if let Err(err) = read_chunks(&mut conn, &sql, chunk_size, &tx).await {
                if tx.send(Err(err)).await.is_err() {
                    warn!("MySQL reader stopped after the consumer went away");
                }
            }
        });

        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(stream.boxed())
    }

    async fn create_table(&self, table: &TableRef, types: &TypeMapping) -> Result<(), DbError> {
        let generator = QueryGenerator::new(&self.dialect);
        let mut conn = self.pool.get_conn().await?;
        for sql in [
            generator.create_schema(&table.schema),
            generator.create_table(table, types),
        ] {
            debug!(sql = %sql, "Ensuring destination table");
            conn.query_drop(sql).await?;
        }
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
        if let Some(missing) = columns.iter().find(|name| types.get(name).is_none()) {
            return Err(DbError::Write(format!(
                "No storage type pinned for column '{missing}'"
            )));
        }

        let mut conn = self.pool.get_conn().await?;
        let mut tx = conn.start_transaction(TxOpts::default()).await?;
        let mut written = 0u64;
        for rows in batch.rows.chunks(generator.rows_per_statement(columns.len())) {
            let sql = generator.insert_rows(table, &columns, rows.len());
            let values = rows.iter().flatten().cloned().collect::<Vec<_>>();
            let bindings = MySqlParamStore::from_values(&values);
            tx.exec_drop(sql, bindings.params()).await?;
            written += tx.affected_rows();
        }
        tx.commit().await?;

        Ok(written)
    }

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::MySql
    }

    fn dialect(&self) -> Box<dyn Dialect> {
        Box::new(self.dialect.clone())
    }
}

async fn read_chunks(
    conn: &mut mysql_async::Conn,
    sql: &str,
    chunk_size: usize,
    tx: &mpsc::Sender<Result<Batch, DbError>>,
) -> Result<(), DbError> {
    let mut result = conn.query_iter(sql).await?;
    let fields = result
        .columns()
        .map(|columns| fields_from_columns(&columns))
        .unwrap_or_default();

    let mut index = 0usize;
    let mut batch = Batch::new(format!("chunk-{index}"), fields.clone());
    while let Some(row) = result.next().await? {
        let row: Row = row;
        let values = decode_row(&row, &batch.fields)?;
        batch
            .push_row(values)
            .map_err(|e| DbError::Query(e.to_string()))?;

        if batch.row_count() >= chunk_size {
            index += 1;
            let full = std::mem::replace(
                &mut batch,
                Batch::new(format!("chunk-{index}"), fields.clone()),
            );
            if tx.send(Ok(full)).await.is_err() {
                debug!("Chunk consumer dropped, stopping MySQL reader");
                return Ok(());
            }
        }
    }

    if !batch.is_empty() {
        let _ = tx.send(Ok(batch)).await;
    }
    Ok(())
}
