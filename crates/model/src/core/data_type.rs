use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime type of a batch column, as reported by the source driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DataType {
    Short,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    Boolean,
    Char,
    VarChar,
    String,
    Json,
    Uuid,
    Bytea,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Null,
    Custom(String),
}

/// Coarse grouping of runtime types used for storage-type inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    /// Strings and values the destination can only keep as text.
    Text,
    DateTime,
    Date,
    Float,
    Integer,
    Other,
}

impl DataType {
    pub fn from_postgres_type(type_name: &str) -> Self {
        match type_name.trim().to_ascii_lowercase().as_str() {
            "int2" | "smallint" => DataType::Short,
            "int4" | "integer" | "int" | "serial" => DataType::Int,
            "int8" | "bigint" | "bigserial" | "oid" => DataType::Long,
            "float4" | "real" => DataType::Float,
            "float8" | "double precision" => DataType::Double,
            "numeric" | "decimal" | "money" => DataType::Decimal,
            "bool" | "boolean" => DataType::Boolean,
            "bpchar" | "char" | "character" => DataType::Char,
            "varchar" | "character varying" => DataType::VarChar,
            "text" | "name" | "citext" => DataType::String,
            "json" | "jsonb" => DataType::Json,
            "uuid" => DataType::Uuid,
            "bytea" => DataType::Bytea,
            "date" => DataType::Date,
            "time" | "timetz" => DataType::Time,
            "timestamp" => DataType::Timestamp,
            "timestamptz" => DataType::TimestampTz,
            other => DataType::Custom(other.to_string()),
        }
    }

    /// Maps a MySQL protocol column type name (`MYSQL_TYPE_*`, prefix optional).
    pub fn from_mysql_type(type_name: &str) -> Self {
        let upper = type_name.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("MYSQL_TYPE_").unwrap_or(&upper);
        match name {
            "TINY" | "SHORT" | "YEAR" => DataType::Short,
            "LONG" | "INT24" => DataType::Int,
            "LONGLONG" => DataType::Long,
            "FLOAT" => DataType::Float,
            "DOUBLE" => DataType::Double,
            "DECIMAL" | "NEWDECIMAL" => DataType::Decimal,
            "BIT" => DataType::Boolean,
            "STRING" => DataType::Char,
            "VARCHAR" | "VAR_STRING" | "ENUM" | "SET" => DataType::VarChar,
            "TINY_BLOB" | "MEDIUM_BLOB" | "LONG_BLOB" | "BLOB" => DataType::String,
            "JSON" => DataType::Json,
            "GEOMETRY" => DataType::Bytea,
            "DATE" | "NEWDATE" => DataType::Date,
            "TIME" | "TIME2" => DataType::Time,
            "DATETIME" | "DATETIME2" | "TIMESTAMP" | "TIMESTAMP2" => DataType::Timestamp,
            "NULL" => DataType::Null,
            other => DataType::Custom(other.to_string()),
        }
    }

    pub fn family(&self) -> TypeFamily {
        match self {
            DataType::Char
            | DataType::VarChar
            | DataType::String
            | DataType::Json
            | DataType::Uuid
            | DataType::Bytea
            | DataType::Time => TypeFamily::Text,
            DataType::Timestamp | DataType::TimestampTz => TypeFamily::DateTime,
            DataType::Date => TypeFamily::Date,
            // Decimals are extracted as floating point.
            DataType::Float | DataType::Double | DataType::Decimal => TypeFamily::Float,
            DataType::Short | DataType::Int | DataType::Long => TypeFamily::Integer,
            DataType::Boolean | DataType::Null | DataType::Custom(_) => TypeFamily::Other,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Custom(name) => write!(f, "{name}"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_names_are_case_insensitive() {
        assert_eq!(DataType::from_postgres_type("INT8"), DataType::Long);
        assert_eq!(
            DataType::from_postgres_type("timestamptz"),
            DataType::TimestampTz
        );
        assert_eq!(
            DataType::from_postgres_type("tsvector"),
            DataType::Custom("tsvector".to_string())
        );
    }

    #[test]
    fn mysql_prefix_is_optional() {
        assert_eq!(
            DataType::from_mysql_type("MYSQL_TYPE_LONGLONG"),
            DataType::Long
        );
        assert_eq!(DataType::from_mysql_type("datetime"), DataType::Timestamp);
        assert_eq!(DataType::from_mysql_type("NEWDECIMAL"), DataType::Decimal);
    }

    #[test]
    fn families_group_runtime_types() {
        assert_eq!(DataType::Decimal.family(), TypeFamily::Float);
        assert_eq!(DataType::Json.family(), TypeFamily::Text);
        assert_eq!(DataType::TimestampTz.family(), TypeFamily::DateTime);
        assert_eq!(DataType::Boolean.family(), TypeFamily::Other);
    }
}
