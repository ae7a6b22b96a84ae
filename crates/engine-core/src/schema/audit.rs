//! Mandatory audit columns carried by every loaded batch.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use model::{
    core::{data_type::DataType, value::Value},
    records::batch::{Batch, Field},
};

pub const DATE_LOADING: &str = "date_loading";
pub const DATE_START: &str = "date_start";
pub const DATE_END: &str = "date_end";
pub const DATE_RELEVANCE: &str = "date_relevance";

/// Audit columns whose storage type is always a plain date.
pub const DATE_WINDOW_COLUMNS: [&str; 3] = [DATE_START, DATE_END, DATE_RELEVANCE];

/// How far back the default validity window opens.
pub const VALIDITY_YEARS_BACK: i32 = 120;

/// Normalizes a batch against the local wall clock.
pub fn normalize(batch: Batch) -> Batch {
    normalize_at(batch, Local::now().naive_local())
}

/// Replaces `date_loading` with `now` as the first column and fills the
/// validity window columns that the batch does not already carry. Existing
/// window columns keep their values and positions.
pub fn normalize_at(mut batch: Batch, now: NaiveDateTime) -> Batch {
    let today = now.date();

    batch.drop_column(DATE_LOADING);
    batch.insert_column(
        0,
        Field::new(DATE_LOADING, DataType::Timestamp),
        Value::TimestampNaive(now),
    );

    if !batch.contains(DATE_START) {
        batch.insert_column(
            1,
            Field::new(DATE_START, DataType::Date),
            Value::Date(validity_start(today)),
        );
    }

    if !batch.contains(DATE_END) {
        batch.insert_column(2, Field::new(DATE_END, DataType::Date), Value::Date(today));
    }

    // Lands ahead of a freshly inserted date_end.
    if !batch.contains(DATE_RELEVANCE) {
        batch.insert_column(
            2,
            Field::new(DATE_RELEVANCE, DataType::Date),
            Value::Date(today),
        );
    }

    batch
}

/// First day of the year `VALIDITY_YEARS_BACK` years before `today`.
pub fn validity_start(today: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(today.year() - VALIDITY_YEARS_BACK, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn sales() -> Batch {
        Batch::with_rows(
            "chunk-0",
            vec![
                Field::new("id", DataType::Long),
                Field::new("amount", DataType::Double),
            ],
            vec![
                vec![Value::Int(1), Value::Float(9.5)],
                vec![Value::Int(2), Value::Float(3.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn bare_batch_gains_four_audit_columns() {
        let batch = normalize_at(sales(), now());
        assert_eq!(
            batch.column_names(),
            vec![
                "date_loading",
                "date_start",
                "date_relevance",
                "date_end",
                "id",
                "amount"
            ]
        );

        let today = now().date();
        let row = &batch.rows[0];
        assert_eq!(row[0], Value::TimestampNaive(now()));
        assert_eq!(
            row[1],
            Value::Date(NaiveDate::from_ymd_opt(1904, 1, 1).unwrap())
        );
        assert_eq!(row[2], Value::Date(today));
        assert_eq!(row[3], Value::Date(today));
        assert_eq!(row[4], Value::Int(1));
    }

    #[test]
    fn existing_window_columns_are_kept_in_place() {
        let custom_start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let batch = Batch::with_rows(
            "chunk-0",
            vec![
                Field::new("id", DataType::Long),
                Field::new("date_start", DataType::Date),
                Field::new("date_end", DataType::Date),
                Field::new("date_relevance", DataType::Date),
            ],
            vec![vec![
                Value::Int(7),
                Value::Date(custom_start),
                Value::Null,
                Value::Date(custom_start),
            ]],
        )
        .unwrap();

        let batch = normalize_at(batch, now());
        assert_eq!(
            batch.column_names(),
            vec!["date_loading", "id", "date_start", "date_end", "date_relevance"]
        );
        assert_eq!(batch.rows[0][2], Value::Date(custom_start));
        assert_eq!(batch.rows[0][3], Value::Null);
    }

    #[test]
    fn stale_load_timestamp_is_replaced() {
        let stale = NaiveDate::from_ymd_opt(1999, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let batch = Batch::with_rows(
            "chunk-0",
            vec![
                Field::new("id", DataType::Long),
                Field::new("date_loading", DataType::Timestamp),
            ],
            vec![vec![Value::Int(1), Value::TimestampNaive(stale)]],
        )
        .unwrap();

        let batch = normalize_at(batch, now());
        assert_eq!(batch.position(DATE_LOADING), Some(0));
        assert_eq!(
            batch.column_names().iter().filter(|c| **c == DATE_LOADING).count(),
            1
        );
        assert_eq!(batch.rows[0][0], Value::TimestampNaive(now()));
    }

    #[test]
    fn normalizing_twice_adds_nothing_new() {
        let once = normalize_at(sales(), now());
        let twice = normalize_at(once.clone(), now());
        assert_eq!(once.column_names(), twice.column_names());
        assert_eq!(once.rows, twice.rows);
    }

    #[test]
    fn empty_batch_still_gets_the_schema() {
        let batch = Batch::new("chunk-0", vec![Field::new("id", DataType::Long)]);
        let batch = normalize_at(batch, now());
        assert_eq!(batch.fields.len(), 5);
        assert!(batch.is_empty());
    }

    #[test]
    fn load_timestamp_tracks_wall_clock() {
        let before = Local::now().naive_local();
        let batch = normalize(sales());
        let after = Local::now().naive_local();

        match &batch.rows[0][0] {
            Value::TimestampNaive(ts) => assert!(*ts >= before && *ts <= after),
            other => panic!("unexpected date_loading value: {other:?}"),
        }
    }
}
