use crate::sql::base::error::DbError;
use bigdecimal::BigDecimal;
use model::{
    core::{data_type::DataType, value::Value},
    records::batch::Field,
};
use std::str::FromStr;
use tokio_postgres::{Column, Row, types::Json as PgJson};
use tracing::warn;

/// Batch schema for a prepared statement's result columns.
pub fn fields_from_columns(columns: &[Column]) -> Vec<Field> {
    columns
        .iter()
        .map(|col| Field::new(col.name(), DataType::from_postgres_type(col.type_().name())))
        .collect()
}

/// Decodes one row into values aligned with `fields`.
pub fn decode_row(row: &Row, fields: &[Field]) -> Result<Vec<Value>, DbError> {
    fields
        .iter()
        .enumerate()
        .map(|(idx, field)| decode_value(row, idx, field))
        .collect()
}

fn decode_value(row: &Row, idx: usize, field: &Field) -> Result<Value, DbError> {
    let value = match &field.data_type {
        DataType::Short => opt(row.try_get::<_, Option<i16>>(idx), field)?
            .map(|v| Value::Int(v as i64)),
        DataType::Int => opt(row.try_get::<_, Option<i32>>(idx), field)?
            .map(|v| Value::Int(v as i64)),
        DataType::Long => opt(row.try_get::<_, Option<i64>>(idx), field)?.map(Value::Int),
        DataType::Float => opt(row.try_get::<_, Option<f32>>(idx), field)?
            .map(|v| Value::Float(v as f64)),
        DataType::Double => opt(row.try_get::<_, Option<f64>>(idx), field)?.map(Value::Float),
        DataType::Decimal => opt(row.try_get::<_, Option<rust_decimal::Decimal>>(idx), field)?
            .map(|v| {
                BigDecimal::from_str(&v.to_string())
                    .map(Value::Decimal)
                    .map_err(|e| decode_error(field, e))
            })
            .transpose()?,
        DataType::Boolean => opt(row.try_get::<_, Option<bool>>(idx), field)?.map(Value::Boolean),
        DataType::Char | DataType::VarChar | DataType::String => {
            opt(row.try_get::<_, Option<String>>(idx), field)?.map(Value::String)
        }
        DataType::Json => opt(
            row.try_get::<_, Option<PgJson<serde_json::Value>>>(idx),
            field,
        )?
        .map(|json| Value::Json(json.0)),
        DataType::Uuid => opt(row.try_get::<_, Option<uuid::Uuid>>(idx), field)?.map(Value::Uuid),
        DataType::Bytea => opt(row.try_get::<_, Option<Vec<u8>>>(idx), field)?.map(Value::Bytes),
        DataType::Date => {
            opt(row.try_get::<_, Option<chrono::NaiveDate>>(idx), field)?.map(Value::Date)
        }
        DataType::Time => opt(row.try_get::<_, Option<chrono::NaiveTime>>(idx), field)?
            .map(|v| Value::String(v.to_string())),
        DataType::Timestamp => opt(row.try_get::<_, Option<chrono::NaiveDateTime>>(idx), field)?
            .map(Value::TimestampNaive),
        DataType::TimestampTz => opt(
            row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx),
            field,
        )?
        .map(Value::Timestamp),
        DataType::Null => None,
        DataType::Custom(type_name) => match row.try_get::<_, Option<String>>(idx) {
            Ok(v) => v.map(Value::String),
            Err(_) => {
                warn!(column = %field.name, %type_name, "Unsupported Postgres type, loading NULL");
                None
            }
        },
    };

    Ok(value.unwrap_or(Value::Null))
}

fn opt<T>(result: Result<Option<T>, tokio_postgres::Error>, field: &Field) -> Result<Option<T>, DbError> {
    result.map_err(|e| decode_error(field, e))
}

fn decode_error(field: &Field, err: impl std::fmt::Display) -> DbError {
    DbError::Decode {
        column: field.name.clone(),
        message: err.to_string(),
    }
}
