use crate::core::{data_type::DataType, value::Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BatchError {
    #[error("Row has {actual} values but the batch has {expected} columns")]
    RowWidth { expected: usize, actual: usize },
}

/// Named, typed column of a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Rectangular slice of a query result. Every row holds exactly one value
/// per field, in field order.
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: String,
    pub fields: Vec<Field>,
    pub rows: Vec<Vec<Value>>,
}

impl Batch {
    pub fn new(id: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            id: id.into(),
            fields,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(
        id: impl Into<String>,
        fields: Vec<Field>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, BatchError> {
        let mut batch = Self::new(id, fields);
        batch.rows.reserve(rows.len());
        for row in rows {
            batch.push_row(row)?;
        }
        Ok(batch)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), BatchError> {
        if row.len() != self.fields.len() {
            return Err(BatchError::RowWidth {
                expected: self.fields.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Inserts a column at `index` (clamped to the current width), filling
    /// every existing row with `fill`.
    pub fn insert_column(&mut self, index: usize, field: Field, fill: Value) {
        let index = index.min(self.fields.len());
        self.fields.insert(index, field);
        for row in self.rows.iter_mut() {
            row.insert(index, fill.clone());
        }
    }

    /// Removes a column by name, returning its field if it was present.
    pub fn drop_column(&mut self, name: &str) -> Option<Field> {
        let idx = self.position(name)?;
        for row in self.rows.iter_mut() {
            row.remove(idx);
        }
        Some(self.fields.remove(idx))
    }
}
