//! Defines the `Dialect` trait for database-specific SQL syntax.

use model::core::{storage_type::StorageType, table::TableRef};

/// Largest number of bind parameters either driver accepts in one statement.
pub const MAX_BIND_PARAMS: usize = 65_535;

pub trait Dialect: Send + Sync {
    /// Wraps an identifier (like a table or column name) in the correct
    /// quotation marks for the dialect.
    ///
    /// - PostgreSQL uses double quotes: `"my_column"`
    /// - MySQL uses backticks: `` `my_column` ``
    fn quote_identifier(&self, ident: &str) -> String;

    /// Returns the placeholder for the zero-based parameter `index`.
    ///
    /// - PostgreSQL uses `$1`, `$2`, etc.
    /// - MySQL uses `?`
    fn get_placeholder(&self, index: usize) -> String;

    /// Renders a pinned storage type as a column type.
    fn render_storage_type(&self, storage: &StorageType) -> String;

    /// Returns the name of the dialect (e.g., "PostgreSQL", "MySQL").
    fn name(&self) -> String;

    fn qualified_table(&self, table: &TableRef) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(&table.schema),
            self.quote_identifier(&table.name)
        )
    }

    fn max_bind_params(&self) -> usize {
        MAX_BIND_PARAMS
    }
}

#[derive(Debug, Clone)]
pub struct Postgres;

impl Dialect for Postgres {
    fn quote_identifier(&self, ident: &str) -> String {
        format!(r#""{}""#, ident.replace('"', "\"\""))
    }

    fn get_placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn render_storage_type(&self, storage: &StorageType) -> String {
        match storage {
            StorageType::VarChar { length } => format!("VARCHAR({length})"),
            StorageType::Timestamp => "TIMESTAMP".into(),
            StorageType::Date => "DATE".into(),
            StorageType::Float { precision } => format!("FLOAT({precision})"),
            StorageType::Integer => "BIGINT".into(),
        }
    }

    fn name(&self) -> String {
        "PostgreSQL".into()
    }
}

#[derive(Debug, Clone)]
pub struct MySql;

impl Dialect for MySql {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn get_placeholder(&self, _index: usize) -> String {
        "?".into()
    }

    fn render_storage_type(&self, storage: &StorageType) -> String {
        match storage {
            StorageType::VarChar { length } => format!("VARCHAR({length})"),
            StorageType::Timestamp => "DATETIME(6)".into(),
            StorageType::Date => "DATE".into(),
            StorageType::Float { precision } => format!("FLOAT({precision})"),
            StorageType::Integer => "BIGINT".into(),
        }
    }

    fn name(&self) -> String {
        "MySQL".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_quotes_and_numbers_placeholders() {
        let dialect = Postgres;
        assert_eq!(dialect.quote_identifier("a\"b"), r#""a""b""#);
        assert_eq!(dialect.get_placeholder(0), "$1");
        assert_eq!(
            dialect.qualified_table(&TableRef::new("dbo", "sales")),
            r#""dbo"."sales""#
        );
    }

    #[test]
    fn mysql_uses_backticks_and_question_marks() {
        let dialect = MySql;
        assert_eq!(dialect.quote_identifier("col"), "`col`");
        assert_eq!(dialect.get_placeholder(7), "?");
        assert_eq!(
            dialect.render_storage_type(&StorageType::Timestamp),
            "DATETIME(6)"
        );
    }
}
