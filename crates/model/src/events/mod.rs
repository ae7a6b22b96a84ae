use serde::{Deserialize, Serialize};
use std::fmt;

/// Category written to the `type_mes` column of the audit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogCategory {
    Info,
    Error,
    ConnectError,
    Check,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Info => "INFO",
            LogCategory::Error => "ERROR",
            LogCategory::ConnectError => "CONNECT_ERROR",
            LogCategory::Check => "CHECK",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle step code written to the `step_log` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogStep {
    Start = 1,
    End = 2,
    Error = 3,
    ConnectError = 4,
}

impl LogStep {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(LogStep::Start),
            2 => Some(LogStep::End),
            3 => Some(LogStep::Error),
            4 => Some(LogStep::ConnectError),
            _ => None,
        }
    }
}

/// One row of the append-only audit table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub category: LogCategory,
    pub step: LogStep,
    pub object_name: String,
    pub message: String,
    /// Always empty; kept for the audit table's column layout.
    pub relevance_date: String,
    pub row_count: i64,
    pub elapsed_secs: f64,
}

impl LogEvent {
    pub fn new(
        category: LogCategory,
        step: LogStep,
        object_name: &str,
        row_count: i64,
        elapsed_secs: f64,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            category,
            step,
            object_name: object_name.to_string(),
            message: canned_message(category, step, object_name),
            relevance_date: String::new(),
            row_count,
            elapsed_secs,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self.step {
            LogStep::Start => "etl.started",
            LogStep::End => "etl.completed",
            LogStep::Error => "etl.failed",
            LogStep::ConnectError => "etl.connect_failed",
        }
    }
}

/// Message text for a category/step pair. Pairs that do not belong together
/// produce an empty message.
pub fn canned_message(category: LogCategory, step: LogStep, object_name: &str) -> String {
    match (category, step) {
        (LogCategory::Info, LogStep::Start) => format!("Start ETL: {object_name}"),
        (LogCategory::Info, LogStep::End) => format!("End ETL: {object_name}"),
        (LogCategory::Error, LogStep::Error) => format!("ERROR ETL: {object_name}"),
        (LogCategory::ConnectError, LogStep::ConnectError) => {
            format!("ERROR CONNECT: {object_name}")
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_follow_category_and_step() {
        assert_eq!(
            canned_message(LogCategory::Info, LogStep::Start, "dbo.sales"),
            "Start ETL: dbo.sales"
        );
        assert_eq!(
            canned_message(LogCategory::Info, LogStep::End, "sales"),
            "End ETL: sales"
        );
        assert_eq!(
            canned_message(LogCategory::Error, LogStep::Error, "sales"),
            "ERROR ETL: sales"
        );
        assert_eq!(
            canned_message(LogCategory::ConnectError, LogStep::ConnectError, "crm"),
            "ERROR CONNECT: crm"
        );
    }

    #[test]
    fn mismatched_pair_has_empty_message() {
        assert!(canned_message(LogCategory::Error, LogStep::Start, "sales").is_empty());
        assert!(canned_message(LogCategory::Check, LogStep::End, "sales").is_empty());
    }

    #[test]
    fn step_codes_round_trip() {
        for step in [
            LogStep::Start,
            LogStep::End,
            LogStep::Error,
            LogStep::ConnectError,
        ] {
            assert_eq!(LogStep::from_code(step.code()), Some(step));
        }
        assert_eq!(LogStep::from_code(0), None);
    }

    #[test]
    fn new_event_leaves_relevance_empty() {
        let event = LogEvent::new(LogCategory::Info, LogStep::End, "sales", 10, 1.5);
        assert!(event.relevance_date.is_empty());
        assert_eq!(event.message, "End ETL: sales");
        assert_eq!(event.event_type(), "etl.completed");
    }
}
