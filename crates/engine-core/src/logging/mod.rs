//! Lifecycle events appended to the destination-side audit table.

use crate::{connectors::resolver::ConnectionResolver, error::LogError};
use connectors::sql::base::{adapter::SqlAdapter, dialect::Dialect};
use model::{
    core::{storage_type::StorageType, value::Value},
    events::{LogCategory, LogEvent, LogStep},
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub mod status;

/// Audit table layout, in insert order. `date_loading` is filled by the
/// server clock.
const AUDIT_COLUMNS: [(&str, AuditColumn); 8] = [
    ("date_loading", AuditColumn::Storage(StorageType::Timestamp)),
    ("type_mes", AuditColumn::Storage(StorageType::VarChar { length: 32 })),
    ("step_log", AuditColumn::Storage(StorageType::Integer)),
    ("name_object", AuditColumn::Storage(StorageType::VarChar { length: 255 })),
    ("mes", AuditColumn::Storage(StorageType::VarChar { length: 512 })),
    ("date_relevance", AuditColumn::Storage(StorageType::VarChar { length: 32 })),
    ("qty", AuditColumn::Storage(StorageType::Integer)),
    ("step_time", AuditColumn::Double),
];

#[derive(Clone, Copy)]
enum AuditColumn {
    Storage(StorageType),
    Double,
}

/// Appends lifecycle events through a dedicated connection resolved by a
/// fixed logical name. The connection is opened lazily and reused; a failed
/// write drops it so the next event reconnects.
pub struct RunLogger {
    resolver: ConnectionResolver,
    connection: String,
    table: String,
    adapter: Mutex<Option<Arc<dyn SqlAdapter>>>,
}

impl RunLogger {
    pub fn new(
        resolver: ConnectionResolver,
        connection: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            connection: connection.into(),
            table: table.into(),
            adapter: Mutex::new(None),
        }
    }

    pub fn connection_name(&self) -> &str {
        &self.connection
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn log(
        &self,
        category: LogCategory,
        step: LogStep,
        object_name: &str,
        row_count: i64,
        elapsed_secs: f64,
    ) -> Result<(), LogError> {
        let event = LogEvent::new(category, step, object_name, row_count, elapsed_secs);
        self.write_event(&event).await
    }

    /// Same as [`log`](Self::log), but a failure is traced instead of
    /// returned.
    pub async fn log_guarded(
        &self,
        category: LogCategory,
        step: LogStep,
        object_name: &str,
        row_count: i64,
        elapsed_secs: f64,
    ) {
        if let Err(err) = self
            .log(category, step, object_name, row_count, elapsed_secs)
            .await
        {
            warn!(
                category = %category,
                step = step.code(),
                object = object_name,
                error = %err,
                "Audit event dropped"
            );
        }
    }

    pub async fn write_event(&self, event: &LogEvent) -> Result<(), LogError> {
        let adapter = self.audit_adapter().await?;
        let dialect = adapter.dialect();
        let sql = insert_sql(dialect.as_ref(), &self.table);
        let params = vec![
            Value::String(event.category.as_str().to_string()),
            Value::Int(i64::from(event.step.code())),
            Value::String(event.object_name.clone()),
            Value::String(event.message.clone()),
            Value::String(event.relevance_date.clone()),
            Value::Int(event.row_count),
            Value::Float(event.elapsed_secs),
        ];

        if let Err(err) = adapter.exec_params(&sql, params).await {
            self.adapter.lock().await.take();
            return Err(err.into());
        }

        info!(
            event = event.event_type(),
            category = %event.category,
            step = event.step.code(),
            object = %event.object_name,
            rows = event.row_count,
            elapsed_secs = event.elapsed_secs,
            "{}",
            event.message
        );
        Ok(())
    }

    /// Cached audit connection; the first open also creates the table.
    pub(crate) async fn audit_adapter(&self) -> Result<Arc<dyn SqlAdapter>, LogError> {
        let mut cached = self.adapter.lock().await;
        if let Some(adapter) = cached.as_ref() {
            return Ok(Arc::clone(adapter));
        }

        let adapter = self.resolver.connect(&self.connection).await?;
        let ddl = create_table_sql(adapter.dialect().as_ref(), &self.table);
        debug!(sql = %ddl, "Ensuring audit table");
        adapter.exec(&ddl).await?;

        *cached = Some(Arc::clone(&adapter));
        Ok(adapter)
    }
}

pub fn create_table_sql(dialect: &dyn Dialect, table: &str) -> String {
    let columns = AUDIT_COLUMNS
        .iter()
        .map(|(name, column)| {
            let rendered = match column {
                AuditColumn::Storage(storage) => dialect.render_storage_type(storage),
                AuditColumn::Double => "DOUBLE PRECISION".to_string(),
            };
            format!("{} {rendered}", dialect.quote_identifier(name))
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({columns})",
        dialect.quote_identifier(table)
    )
}

pub fn insert_sql(dialect: &dyn Dialect, table: &str) -> String {
    let columns = AUDIT_COLUMNS
        .iter()
        .map(|(name, _)| dialect.quote_identifier(name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (0..AUDIT_COLUMNS.len() - 1)
        .map(|i| dialect.get_placeholder(i))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({columns}) VALUES (CURRENT_TIMESTAMP, {placeholders})",
        dialect.quote_identifier(table)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::sql::base::dialect::{MySql, Postgres};

    #[test]
    fn audit_table_ddl() {
        assert_eq!(
            create_table_sql(&Postgres, "dq_etl"),
            r#"CREATE TABLE IF NOT EXISTS "dq_etl" ("date_loading" TIMESTAMP, "type_mes" VARCHAR(32), "step_log" BIGINT, "name_object" VARCHAR(255), "mes" VARCHAR(512), "date_relevance" VARCHAR(32), "qty" BIGINT, "step_time" DOUBLE PRECISION)"#
        );
    }

    #[test]
    fn insert_uses_server_clock_and_seven_params() {
        assert_eq!(
            insert_sql(&Postgres, "dq_etl"),
            r#"INSERT INTO "dq_etl" ("date_loading", "type_mes", "step_log", "name_object", "mes", "date_relevance", "qty", "step_time") VALUES (CURRENT_TIMESTAMP, $1, $2, $3, $4, $5, $6, $7)"#
        );
        assert!(insert_sql(&MySql, "dq_etl").ends_with("VALUES (CURRENT_TIMESTAMP, ?, ?, ?, ?, ?, ?, ?)"));
    }
}
