use crate::{error::LogError, logging::RunLogger};
use connectors::sql::base::dialect::Dialect;
use model::core::value::Value;
use tracing::debug;

/// Step code reported when nothing was logged for a table today.
pub const NO_STATUS: i64 = 0;

impl RunLogger {
    /// Today's most recent step code logged for objects whose name contains
    /// `table_name`, or [`NO_STATUS`].
    pub async fn status(&self, table_name: &str) -> Result<i64, LogError> {
        let adapter = self.audit_adapter().await?;
        let sql = status_sql(adapter.dialect().as_ref(), self.table());
        let pattern = Value::String(format!("%{table_name}%"));

        let batch = adapter.query_batch(&sql, vec![pattern]).await?;
        let step = batch
            .rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_i64)
            .unwrap_or(NO_STATUS);

        debug!(table = table_name, step, "Resolved load status");
        Ok(step)
    }
}

pub fn status_sql(dialect: &dyn Dialect, log_table: &str) -> String {
    format!(
        "SELECT {step} FROM {table} WHERE {name} LIKE {p} AND {loaded} >= CURRENT_DATE ORDER BY {loaded} DESC LIMIT 1",
        step = dialect.quote_identifier("step_log"),
        table = dialect.quote_identifier(log_table),
        name = dialect.quote_identifier("name_object"),
        loaded = dialect.quote_identifier("date_loading"),
        p = dialect.get_placeholder(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::sql::base::dialect::{MySql, Postgres};

    #[test]
    fn status_sql_picks_latest_entry_of_today() {
        assert_eq!(
            status_sql(&Postgres, "dq_etl"),
            r#"SELECT "step_log" FROM "dq_etl" WHERE "name_object" LIKE $1 AND "date_loading" >= CURRENT_DATE ORDER BY "date_loading" DESC LIMIT 1"#
        );
        assert!(status_sql(&MySql, "dq_etl").contains("LIKE ?"));
    }
}
