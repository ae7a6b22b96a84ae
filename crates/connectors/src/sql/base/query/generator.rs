use crate::sql::base::dialect::Dialect;
use model::core::{storage_type::TypeMapping, table::TableRef};

/// Upper bound on rows in a single INSERT, independent of the parameter limit.
pub const MAX_ROWS_PER_INSERT: usize = 1_000;

pub struct QueryGenerator<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> QueryGenerator<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    /// MySQL treats `SCHEMA` as a synonym for `DATABASE`, so one form serves
    /// both drivers.
    pub fn create_schema(&self, schema: &str) -> String {
        format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            self.dialect.quote_identifier(schema)
        )
    }

    /// `CREATE TABLE IF NOT EXISTS` with one column per mapping entry, in
    /// mapping order.
    pub fn create_table(&self, table: &TableRef, types: &TypeMapping) -> String {
        let columns = types
            .iter()
            .map(|(name, storage)| {
                format!(
                    "{} {}",
                    self.dialect.quote_identifier(name),
                    self.dialect.render_storage_type(&storage)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({columns})",
            self.dialect.qualified_table(table)
        )
    }

    /// Multi-row parameterized INSERT for `row_count` rows of `columns`.
    pub fn insert_rows(&self, table: &TableRef, columns: &[&str], row_count: usize) -> String {
        if columns.is_empty() || row_count == 0 {
            return String::new();
        }

        let column_list = columns
            .iter()
            .map(|c| self.dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");

        let width = columns.len();
        let values = (0..row_count)
            .map(|row| {
                let placeholders = (0..width)
                    .map(|col| self.dialect.get_placeholder(row * width + col))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({placeholders})")
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "INSERT INTO {} ({column_list}) VALUES {values}",
            self.dialect.qualified_table(table)
        )
    }

    /// How many rows fit into one INSERT without exceeding the bind limit.
    pub fn rows_per_statement(&self, column_count: usize) -> usize {
        if column_count == 0 {
            return MAX_ROWS_PER_INSERT;
        }
        (self.dialect.max_bind_params() / column_count).clamp(1, MAX_ROWS_PER_INSERT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::base::dialect::{MySql, Postgres};
    use model::core::storage_type::StorageType;

    fn mapping() -> TypeMapping {
        let mut types = TypeMapping::new();
        types.insert("date_loading", StorageType::Timestamp);
        types.insert("id", StorageType::Integer);
        types.insert("name", StorageType::varchar());
        types
    }

    #[test]
    fn create_table_keeps_mapping_order() {
        let dialect = Postgres;
        let generator = QueryGenerator::new(&dialect);
        let sql = generator.create_table(&TableRef::new("dbo", "sales"), &mapping());
        assert_eq!(
            sql,
            r#"CREATE TABLE IF NOT EXISTS "dbo"."sales" ("date_loading" TIMESTAMP, "id" BIGINT, "name" VARCHAR(255))"#
        );
    }

    #[test]
    fn create_schema_quotes_per_dialect() {
        assert_eq!(
            QueryGenerator::new(&Postgres).create_schema("dbo"),
            r#"CREATE SCHEMA IF NOT EXISTS "dbo""#
        );
        assert_eq!(
            QueryGenerator::new(&MySql).create_schema("dbo"),
            "CREATE SCHEMA IF NOT EXISTS `dbo`"
        );
    }

    #[test]
    fn postgres_insert_numbers_placeholders_across_rows() {
        let dialect = Postgres;
        let generator = QueryGenerator::new(&dialect);
        let sql = generator.insert_rows(&TableRef::new("dbo", "t"), &["a", "b"], 2);
        assert_eq!(
            sql,
            r#"INSERT INTO "dbo"."t" ("a", "b") VALUES ($1, $2), ($3, $4)"#
        );
    }

    #[test]
    fn mysql_insert_uses_question_marks() {
        let dialect = MySql;
        let generator = QueryGenerator::new(&dialect);
        let sql = generator.insert_rows(&TableRef::new("dbo", "t"), &["a"], 3);
        assert_eq!(sql, "INSERT INTO `dbo`.`t` (`a`) VALUES (?), (?), (?)");
    }

    #[test]
    fn empty_insert_renders_nothing() {
        let dialect = Postgres;
        let generator = QueryGenerator::new(&dialect);
        assert!(generator.insert_rows(&TableRef::new("dbo", "t"), &[], 3).is_empty());
        assert!(generator.insert_rows(&TableRef::new("dbo", "t"), &["a"], 0).is_empty());
    }

    #[test]
    fn statement_size_respects_bind_limit() {
        let dialect = Postgres;
        let generator = QueryGenerator::new(&dialect);
        assert_eq!(generator.rows_per_statement(4), MAX_ROWS_PER_INSERT);
        assert_eq!(generator.rows_per_statement(200), 65_535 / 200);
        assert_eq!(generator.rows_per_statement(100_000), 1);
    }
}
