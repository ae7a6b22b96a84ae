use bigdecimal::ToPrimitive;
use model::core::{storage_type::StorageType, value::Value};
use rust_decimal::{Decimal as RustDecimal, prelude::FromPrimitive as DecimalFromPrimitive};
use std::str::FromStr;
use tokio_postgres::types::{Json as PgJson, ToSql};

pub struct PgParam(Box<dyn ToSql + Sync + Send>);

impl PgParam {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Int(v) => PgParam(Box::new(v)),
            Value::Float(v) => PgParam(Box::new(v)),
            Value::Decimal(v) => {
                let decimal = RustDecimal::from_str(&v.to_string()).unwrap_or_else(|_| {
                    DecimalFromPrimitive::from_f64(v.to_f64().unwrap_or(0.0)).unwrap_or_default()
                });
                PgParam(Box::new(decimal))
            }
            Value::String(v) => PgParam(Box::new(v)),
            Value::Boolean(v) => PgParam(Box::new(v)),
            Value::Json(v) => PgParam(Box::new(PgJson(v))),
            Value::Uuid(v) => PgParam(Box::new(v)),
            Value::Bytes(v) => PgParam(Box::new(v)),
            Value::Date(v) => PgParam(Box::new(v)),
            Value::Timestamp(v) => PgParam(Box::new(v)),
            Value::TimestampNaive(v) => PgParam(Box::new(v)),
            Value::Null => PgParam(Box::new(Option::<String>::None)),
        }
    }

    /// Binds a value already coerced to `storage`. NULLs carry the column's
    /// Rust type so the driver's type check accepts them.
    pub fn for_storage(value: Value, storage: StorageType) -> Self {
        match (value, storage) {
            (Value::Null, StorageType::VarChar { .. }) => {
                PgParam(Box::new(Option::<String>::None))
            }
            (Value::Null, StorageType::Timestamp) => {
                PgParam(Box::new(Option::<chrono::NaiveDateTime>::None))
            }
            (Value::Null, StorageType::Date) => {
                PgParam(Box::new(Option::<chrono::NaiveDate>::None))
            }
            (Value::Null, StorageType::Float { .. }) => PgParam(Box::new(Option::<f64>::None)),
            (Value::Null, StorageType::Integer) => PgParam(Box::new(Option::<i64>::None)),
            (value, _) => Self::from_value(value),
        }
    }
}

impl AsRef<dyn ToSql + Sync> for PgParam {
    fn as_ref(&self) -> &(dyn ToSql + Sync + 'static) {
        &*self.0
    }
}

pub struct PgParamStore {
    pub params: Vec<PgParam>,
}

impl PgParamStore {
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            params: values.into_iter().map(PgParam::from_value).collect(),
        }
    }

    pub fn from_params(params: Vec<PgParam>) -> Self {
        Self { params }
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|param| param.as_ref())
            .collect::<Vec<_>>()
    }
}
