use crate::sql::base::error::DbError;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use model::{
    core::{data_type::DataType, value::Value},
    records::batch::Field,
};
use mysql_async::{Column, Row, Value as MySqlValue};
use std::str::FromStr;

/// Batch schema for a result set's columns.
pub fn fields_from_columns(columns: &[Column]) -> Vec<Field> {
    columns
        .iter()
        .map(|col| {
            let type_name = format!("{:?}", col.column_type());
            Field::new(col.name_str(), DataType::from_mysql_type(&type_name))
        })
        .collect()
}

/// Decodes one row into values aligned with `fields`. Handles both the text
/// protocol (everything arrives as bytes) and the binary protocol.
pub fn decode_row(row: &Row, fields: &[Field]) -> Result<Vec<Value>, DbError> {
    fields
        .iter()
        .enumerate()
        .map(|(idx, field)| match row.as_ref(idx) {
            Some(raw) => decode_value(raw, field),
            None => Ok(Value::Null),
        })
        .collect()
}

pub fn decode_value(raw: &MySqlValue, field: &Field) -> Result<Value, DbError> {
    if *raw == MySqlValue::NULL {
        return Ok(Value::Null);
    }

    let value = match field.data_type.clone() {
        DataType::Short | DataType::Int | DataType::Long => match raw {
            MySqlValue::Int(v) => Value::Int(*v),
            MySqlValue::UInt(v) => Value::Int(*v as i64),
            other => Value::Int(parse_text(other, field)?),
        },
        DataType::Float | DataType::Double => match raw {
            MySqlValue::Float(v) => Value::Float(*v as f64),
            MySqlValue::Double(v) => Value::Float(*v),
            MySqlValue::Int(v) => Value::Float(*v as f64),
            other => Value::Float(parse_text(other, field)?),
        },
        DataType::Decimal => Value::Decimal(parse_text::<BigDecimal>(raw, field)?),
        DataType::Boolean => match raw {
            MySqlValue::Int(v) => Value::Boolean(*v != 0),
            MySqlValue::UInt(v) => Value::Boolean(*v != 0),
            MySqlValue::Bytes(bytes) => Value::Boolean(bytes.iter().any(|b| *b != 0 && *b != b'0')),
            other => return Err(unexpected(other, field)),
        },
        DataType::Date => match raw {
            MySqlValue::Date(y, m, d, ..) => Value::Date(make_date(*y, *m, *d, field)?),
            other => Value::Date(parse_text(other, field)?),
        },
        DataType::Timestamp | DataType::TimestampTz => match raw {
            MySqlValue::Date(y, m, d, h, mi, s, us) => {
                let date = make_date(*y, *m, *d, field)?;
                let time = NaiveTime::from_hms_micro_opt(*h as u32, *mi as u32, *s as u32, *us)
                    .ok_or_else(|| decode_error(field, "invalid time of day"))?;
                Value::TimestampNaive(NaiveDateTime::new(date, time))
            }
            other => {
                let text = text_of(other, field)?;
                let parsed = NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f")
                    .map_err(|e| decode_error(field, e))?;
                Value::TimestampNaive(parsed)
            }
        },
        DataType::Time => match raw {
            MySqlValue::Time(neg, days, h, m, s, us) => {
                let hours = *days * 24 + *h as u32;
                let sign = if *neg { "-" } else { "" };
                Value::String(format!("{sign}{hours:02}:{m:02}:{s:02}.{us:06}"))
            }
            other => Value::String(text_of(other, field)?),
        },
        DataType::Json => {
            let text = text_of(raw, field)?;
            match serde_json::from_str(&text) {
                Ok(json) => Value::Json(json),
                Err(_) => Value::String(text),
            }
        }
        DataType::Bytea => match raw {
            MySqlValue::Bytes(bytes) => Value::Bytes(bytes.clone()),
            other => return Err(unexpected(other, field)),
        },
        DataType::Null => Value::Null,
        DataType::Char
        | DataType::VarChar
        | DataType::String
        | DataType::Uuid
        | DataType::Custom(_) => Value::String(text_of(raw, field)?),
    };

    Ok(value)
}

fn text_of(raw: &MySqlValue, field: &Field) -> Result<String, DbError> {
    match raw {
        MySqlValue::Bytes(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        MySqlValue::Int(v) => Ok(v.to_string()),
        MySqlValue::UInt(v) => Ok(v.to_string()),
        MySqlValue::Float(v) => Ok(v.to_string()),
        MySqlValue::Double(v) => Ok(v.to_string()),
        other => Err(unexpected(other, field)),
    }
}

fn parse_text<T>(raw: &MySqlValue, field: &Field) -> Result<T, DbError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let text = text_of(raw, field)?;
    text.trim().parse::<T>().map_err(|e| decode_error(field, e))
}

fn make_date(year: u16, month: u8, day: u8, field: &Field) -> Result<NaiveDate, DbError> {
    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .ok_or_else(|| decode_error(field, format!("invalid date {year}-{month}-{day}")))
}

fn unexpected(raw: &MySqlValue, field: &Field) -> DbError {
    decode_error(field, format!("unexpected wire value {raw:?}"))
}

fn decode_error(field: &Field, err: impl std::fmt::Display) -> DbError {
    DbError::Decode {
        column: field.name.clone(),
        message: err.to_string(),
    }
}
