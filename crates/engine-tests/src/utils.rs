#![allow(dead_code)]

use async_trait::async_trait;
use connectors::{
    adapter::{Connect, ConnectionDescriptor},
    error::AdapterError,
    sql::base::{
        adapter::{BatchStream, DatabaseKind, SqlAdapter},
        dialect::{self, Dialect},
        error::{ConnectorError, DbError},
    },
};
use futures::StreamExt;
use model::{
    core::{data_type::DataType, storage_type::TypeMapping, table::TableRef, value::Value},
    records::batch::{Batch, Field},
};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

/// One row written through the run logger.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRow {
    pub category: String,
    pub step: i64,
    pub object: String,
    pub message: String,
    pub relevance: String,
    pub qty: i64,
    pub elapsed: f64,
}

/// One append received by a destination table.
#[derive(Debug, Clone)]
pub struct Append {
    pub connection: String,
    pub table: String,
    pub batch: Batch,
    pub types: TypeMapping,
}

#[derive(Debug, Default)]
struct Failures {
    connect: HashSet<String>,
    exec_containing: Vec<String>,
    failing_chunks: HashSet<String>,
    hanging_chunks: HashSet<String>,
    audit_writes_allowed: Option<usize>,
}

#[derive(Debug, Default)]
struct State {
    sources: HashMap<String, Batch>,
    /// Created destination tables and their column types
    tables: HashMap<String, TypeMapping>,
    appends: Vec<Append>,
    audit: Vec<AuditRow>,
    /// Every statement and append, in arrival order
    ops: Vec<String>,
    connects: HashMap<String, usize>,
    failures: Failures,
}

/// Shared backing store for every in-memory connection of a test.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    state: Mutex<State>,
}

impl MemoryDatabase {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Result returned for any query run on `connection`.
    pub fn set_source(&self, connection: &str, batch: Batch) {
        self.state().sources.insert(connection.to_string(), batch);
    }

    pub fn refuse_connections(&self, connection: &str) {
        self.state().failures.connect.insert(connection.to_string());
    }

    pub fn fail_statements_containing(&self, fragment: &str) {
        self.state()
            .failures
            .exec_containing
            .push(fragment.to_string());
    }

    pub fn fail_chunk(&self, batch_id: &str) {
        self.state()
            .failures
            .failing_chunks
            .insert(batch_id.to_string());
    }

    pub fn hang_chunk(&self, batch_id: &str) {
        self.state()
            .failures
            .hanging_chunks
            .insert(batch_id.to_string());
    }

    /// Audit inserts succeed `count` more times, then fail.
    pub fn allow_audit_writes(&self, count: usize) {
        self.state().failures.audit_writes_allowed = Some(count);
    }

    pub fn appends(&self) -> Vec<Append> {
        self.state().appends.clone()
    }

    pub fn appended_rows(&self) -> usize {
        self.state()
            .appends
            .iter()
            .map(|a| a.batch.row_count())
            .sum()
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.state().tables.contains_key(table)
    }

    pub fn audit(&self) -> Vec<AuditRow> {
        self.state().audit.clone()
    }

    pub fn ops(&self) -> Vec<String> {
        self.state().ops.clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| op.strip_prefix("exec:").map(str::to_string))
            .collect()
    }

    pub fn connects(&self, connection: &str) -> usize {
        self.state().connects.get(connection).copied().unwrap_or(0)
    }
}

/// Hands out [`MemoryAdapter`]s bound to one [`MemoryDatabase`].
#[derive(Clone)]
pub struct MemoryConnector {
    db: Arc<MemoryDatabase>,
}

impl MemoryConnector {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Connect for MemoryConnector {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Arc<dyn SqlAdapter>, AdapterError> {
        let mut state = self.db.state();
        if state.failures.connect.contains(&descriptor.name) {
            return Err(AdapterError::Connector(ConnectorError::InvalidUrl(format!(
                "connection refused: {}",
                descriptor.name
            ))));
        }
        *state.connects.entry(descriptor.name.clone()).or_default() += 1;

        Ok(Arc::new(MemoryAdapter {
            connection: descriptor.name.clone(),
            db: Arc::clone(&self.db),
        }))
    }
}

pub struct MemoryAdapter {
    connection: String,
    db: Arc<MemoryDatabase>,
}

impl MemoryAdapter {
    fn check_statement(&self, sql: &str) -> Result<(), DbError> {
        let state = self.db.state();
        match state
            .failures
            .exec_containing
            .iter()
            .find(|fragment| sql.contains(fragment.as_str()))
        {
            Some(fragment) => Err(DbError::Query(format!("injected failure on '{fragment}'"))),
            None => Ok(()),
        }
    }

    fn source(&self) -> Result<Batch, DbError> {
        self.db
            .state()
            .sources
            .get(&self.connection)
            .cloned()
            .ok_or_else(|| DbError::Query(format!("no source data on '{}'", self.connection)))
    }

    fn record_audit(&self, params: Vec<Value>) -> Result<u64, DbError> {
        let mut state = self.db.state();
        if let Some(allowed) = state.failures.audit_writes_allowed.as_mut() {
            if *allowed == 0 {
                return Err(DbError::Write("audit table unavailable".into()));
            }
            *allowed -= 1;
        }

        let text = |idx: usize| params.get(idx).and_then(Value::as_string).unwrap_or_default();
        let int = |idx: usize| params.get(idx).and_then(Value::as_i64).unwrap_or_default();
        state.audit.push(AuditRow {
            category: text(0),
            step: int(1),
            object: text(2),
            message: text(3),
            relevance: text(4),
            qty: int(5),
            elapsed: params.get(6).and_then(Value::as_f64).unwrap_or_default(),
        });
        state.ops.push(format!("audit:{}", text(3)));
        Ok(1)
    }

    fn status(&self, params: Vec<Value>) -> Batch {
        let pattern = params
            .first()
            .and_then(Value::as_string)
            .unwrap_or_default()
            .trim_matches('%')
            .to_string();
        let latest = self
            .db
            .state()
            .audit
            .iter()
            .rev()
            .find(|row| row.object.contains(&pattern))
            .map(|row| row.step);

        let mut batch = Batch::new("query", vec![Field::new("step_log", DataType::Long)]);
        if let Some(step) = latest {
            batch.rows.push(vec![Value::Int(step)]);
        }
        batch
    }
}

#[async_trait]
impl SqlAdapter for MemoryAdapter {
    async fn exec(&self, sql: &str) -> Result<(), DbError> {
        self.check_statement(sql)?;
        self.db.state().ops.push(format!("exec:{sql}"));
        Ok(())
    }

    async fn exec_params(&self, sql: &str, params: Vec<Value>) -> Result<u64, DbError> {
        self.check_statement(sql)?;
        if sql.contains("type_mes") {
            return self.record_audit(params);
        }
        self.db.state().ops.push(format!("exec:{sql}"));
        Ok(0)
    }

    async fn query_batch(&self, sql: &str, params: Vec<Value>) -> Result<Batch, DbError> {
        self.check_statement(sql)?;
        if sql.contains("step_log") {
            return Ok(self.status(params));
        }
        self.source()
    }

    async fn stream_batches(&self, sql: &str, chunk_size: usize) -> Result<BatchStream, DbError> {
        self.check_statement(sql)?;
        let source = self.source()?;
        let fields = source.fields.clone();
        let chunks = source
            .rows
            .chunks(chunk_size.max(1))
            .enumerate()
            .map(|(idx, rows)| {
                Batch::with_rows(format!("chunk-{idx}"), fields.clone(), rows.to_vec())
                    .map_err(|e| DbError::Query(e.to_string()))
            })
            .collect::<Vec<_>>();

        Ok(futures::stream::iter(chunks).boxed())
    }

    async fn create_table(&self, table: &TableRef, types: &TypeMapping) -> Result<(), DbError> {
        let name = table.to_string();
        self.check_statement(&format!("create:{name}"))?;
        let mut state = self.db.state();
        state.ops.push(format!("create:{name}"));
        state.tables.entry(name).or_insert_with(|| types.clone());
        Ok(())
    }

    async fn append_batch(
        &self,
        table: &TableRef,
        batch: &Batch,
        types: &TypeMapping,
    ) -> Result<u64, DbError> {
        let (fail, hang) = {
            let state = self.db.state();
            (
                state.failures.failing_chunks.contains(&batch.id),
                state.failures.hanging_chunks.contains(&batch.id),
            )
        };

        if hang {
            std::future::pending::<()>().await;
        }
        if fail {
            return Err(DbError::Write(format!("injected failure on {}", batch.id)));
        }

        let mut state = self.db.state();
        if !state.tables.contains_key(&table.to_string()) {
            return Err(DbError::Write(format!("relation {table} does not exist")));
        }
        state.ops.push(format!("append:{}", batch.id));
        state.appends.push(Append {
            connection: self.connection.clone(),
            table: table.to_string(),
            batch: batch.clone(),
            types: types.clone(),
        });
        Ok(batch.row_count() as u64)
    }

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Other("memory".into())
    }

    fn dialect(&self) -> Box<dyn Dialect> {
        Box::new(dialect::Postgres)
    }
}

/// `rows` rows of `(id, name, amount)`.
pub fn sales_batch(rows: usize) -> Batch {
    let fields = vec![
        Field::new("id", DataType::Long),
        Field::new("name", DataType::VarChar),
        Field::new("amount", DataType::Double),
    ];
    let rows = (0..rows)
        .map(|i| {
            vec![
                Value::Int(i as i64),
                Value::String(format!("customer-{}", i % 97)),
                Value::Float(i as f64 * 0.5),
            ]
        })
        .collect();

    Batch::with_rows("source", fields, rows).unwrap_or_else(|e| panic!("bad sample batch: {e}"))
}
