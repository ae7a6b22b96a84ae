use crate::error::CoercionError;
use chrono::{NaiveDate, NaiveDateTime};
use model::{
    core::{
        storage_type::{StorageType, TypeMapping},
        value::Value,
    },
    records::batch::Batch,
};

const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Rewrites every value of `batch` into the shape its pinned storage type
/// binds as. Columns without a pinned type are left untouched.
pub fn coerce_batch(mut batch: Batch, types: &TypeMapping) -> Result<Batch, CoercionError> {
    let storage = batch
        .fields
        .iter()
        .map(|field| types.get(&field.name))
        .collect::<Vec<_>>();

    for row in batch.rows.iter_mut() {
        for (idx, value) in row.iter_mut().enumerate() {
            let Some(target) = storage[idx] else {
                continue;
            };
            let current = std::mem::replace(value, Value::Null);
            *value = coerce_value(current, target).map_err(|reason| CoercionError {
                column: batch.fields[idx].name.clone(),
                storage: target,
                reason,
            })?;
        }
    }

    Ok(batch)
}

pub fn coerce_value(value: Value, storage: StorageType) -> Result<Value, String> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    match storage {
        StorageType::VarChar { length } => {
            let text = match value {
                Value::String(s) => s,
                other => other.as_string().unwrap_or_default(),
            };
            let chars = text.chars().count();
            if chars > length {
                return Err(format!("text of {chars} characters exceeds {length}"));
            }
            Ok(Value::String(text))
        }
        StorageType::Timestamp => match value {
            Value::TimestampNaive(ts) => Ok(Value::TimestampNaive(ts)),
            Value::Timestamp(ts) => Ok(Value::TimestampNaive(ts.naive_utc())),
            Value::Date(d) => Ok(Value::TimestampNaive(d.and_time(chrono::NaiveTime::MIN))),
            Value::String(s) => parse_timestamp(&s)
                .map(Value::TimestampNaive)
                .ok_or_else(|| format!("'{s}' is not a timestamp")),
            other => Err(format!("{} is not a timestamp", other.data_type())),
        },
        StorageType::Date => match value {
            Value::Date(d) => Ok(Value::Date(d)),
            Value::TimestampNaive(ts) => Ok(Value::Date(ts.date())),
            Value::Timestamp(ts) => Ok(Value::Date(ts.date_naive())),
            Value::String(s) => parse_date(&s)
                .map(Value::Date)
                .ok_or_else(|| format!("'{s}' is not a date")),
            other => Err(format!("{} is not a date", other.data_type())),
        },
        StorageType::Float { .. } => value
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| "value is not numeric".to_string()),
        StorageType::Integer => match value {
            Value::Float(f) if f.fract() != 0.0 => Err(format!("{f} has a fractional part")),
            other => other
                .as_i64()
                .map(Value::Int)
                .ok_or_else(|| "value is not an integer".to_string()),
        },
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| parse_date(text).map(|d| d.and_time(chrono::NaiveTime::MIN)))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}
