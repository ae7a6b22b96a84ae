use chrono::{Datelike, Timelike};
use model::core::value::Value;
use mysql_async::Value as MySqlValue;
use mysql_common::params::Params;

pub struct MySqlParam(MySqlValue);

impl MySqlParam {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Int(i) => MySqlParam(MySqlValue::Int(*i)),
            Value::Float(f) => MySqlParam(MySqlValue::Double(*f)),
            Value::Decimal(d) => MySqlParam(MySqlValue::Bytes(d.to_string().into_bytes())),
            Value::String(s) => MySqlParam(MySqlValue::Bytes(s.clone().into_bytes())),
            Value::Boolean(b) => MySqlParam(MySqlValue::Int(if *b { 1 } else { 0 })),
            Value::Json(j) => MySqlParam(MySqlValue::Bytes(j.to_string().into_bytes())),
            Value::Uuid(u) => MySqlParam(MySqlValue::Bytes(u.to_string().into_bytes())),
            Value::Bytes(b) => MySqlParam(MySqlValue::Bytes(b.clone())),
            Value::Date(d) => MySqlParam(MySqlValue::Date(
                d.year() as u16,
                d.month() as u8,
                d.day() as u8,
                0,
                0,
                0,
                0,
            )),
            Value::Timestamp(ts) => Self::from_naive(&ts.naive_utc()),
            Value::TimestampNaive(naive) => Self::from_naive(naive),
            Value::Null => MySqlParam(MySqlValue::NULL),
        }
    }

    fn from_naive(naive: &chrono::NaiveDateTime) -> Self {
        MySqlParam(MySqlValue::Date(
            naive.year() as u16,
            naive.month() as u8,
            naive.day() as u8,
            naive.hour() as u8,
            naive.minute() as u8,
            naive.second() as u8,
            naive.and_utc().timestamp_subsec_micros(),
        ))
    }
}

pub struct MySqlParamStore {
    pub params: Vec<MySqlParam>,
}

impl MySqlParamStore {
    pub fn from_values(values: &[Value]) -> Self {
        let params = values.iter().map(MySqlParam::from_value).collect();
        MySqlParamStore { params }
    }

    pub fn params(&self) -> Params {
        if self.params.is_empty() {
            return Params::Empty;
        }
        let mysql_values: Vec<MySqlValue> = self.params.iter().map(|p| p.0.clone()).collect();
        Params::Positional(mysql_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn dates_bind_as_mysql_dates() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let store = MySqlParamStore::from_values(&[Value::Date(date), Value::Null]);
        match store.params() {
            Params::Positional(values) => {
                assert_eq!(values[0], MySqlValue::Date(2024, 3, 9, 0, 0, 0, 0));
                assert_eq!(values[1], MySqlValue::NULL);
            }
            other => panic!("unexpected params: {other:?}"),
        }
    }

    #[test]
    fn no_values_bind_as_empty() {
        let store = MySqlParamStore::from_values(&[]);
        assert_eq!(store.params(), Params::Empty);
    }
}
