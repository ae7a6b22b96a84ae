use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Stream the source in fixed-size chunks and load them on the worker pool.
    #[default]
    Parallel,
    /// Read the whole result into one batch and load it on the caller's task.
    SingleShot,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Parallel => write!(f, "parallel"),
            ExecutionMode::SingleShot => write!(f, "single-shot"),
        }
    }
}

/// One ETL invocation: where rows come from, where they land, and the hooks
/// around the load.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Logical connection name of the source
    pub source: String,
    pub source_query: String,
    /// Logical connection name of the destination
    pub destination: String,
    /// Unqualified destination table; the schema comes from settings
    pub destination_table: String,
    pub pre_delete_sql: Option<String>,
    pub post_load_sql: Option<String>,
    pub logging: bool,
    pub mode: ExecutionMode,
}

impl Pipeline {
    pub fn new(
        source: impl Into<String>,
        source_query: impl Into<String>,
        destination: impl Into<String>,
        destination_table: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            source_query: source_query.into(),
            destination: destination.into(),
            destination_table: destination_table.into(),
            pre_delete_sql: None,
            post_load_sql: None,
            logging: true,
            mode: ExecutionMode::Parallel,
        }
    }

    pub fn pre_delete(mut self, sql: impl Into<String>) -> Self {
        self.pre_delete_sql = Some(sql.into());
        self
    }

    pub fn post_load(mut self, sql: impl Into<String>) -> Self {
        self.post_load_sql = Some(sql.into());
        self
    }

    pub fn logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn has_hooks(&self) -> bool {
        self.pre_delete_sql.is_some() || self.post_load_sql.is_some()
    }
}
