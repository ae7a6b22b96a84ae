use serde::{Deserialize, Serialize};
use std::fmt;

/// Capacity of the bounded string used for text and unrecognized columns.
pub const VARCHAR_LENGTH: usize = 255;

/// Binary precision pinned for floating-point columns.
pub const FLOAT_PRECISION: u8 = 53;

/// Destination column type pinned for a batch column before load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StorageType {
    VarChar { length: usize },
    Timestamp,
    Date,
    Float { precision: u8 },
    Integer,
}

impl StorageType {
    pub fn varchar() -> Self {
        StorageType::VarChar {
            length: VARCHAR_LENGTH,
        }
    }

    pub fn float() -> Self {
        StorageType::Float {
            precision: FLOAT_PRECISION,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::VarChar { length } => write!(f, "VARCHAR({length})"),
            StorageType::Timestamp => write!(f, "TIMESTAMP"),
            StorageType::Date => write!(f, "DATE"),
            StorageType::Float { precision } => write!(f, "FLOAT({precision})"),
            StorageType::Integer => write!(f, "BIGINT"),
        }
    }
}

/// Ordered column name → storage type pairs for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMapping {
    entries: Vec<(String, StorageType)>,
}

impl TypeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the type for `column`, replacing an earlier entry in place.
    pub fn insert(&mut self, column: impl Into<String>, storage: StorageType) {
        let column = column.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = storage,
            None => self.entries.push((column, storage)),
        }
    }

    pub fn get(&self, column: &str) -> Option<StorageType> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, storage)| *storage)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, StorageType)> {
        self.entries
            .iter()
            .map(|(name, storage)| (name.as_str(), *storage))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_existing_entry_in_place() {
        let mut mapping = TypeMapping::new();
        mapping.insert("a", StorageType::Integer);
        mapping.insert("b", StorageType::Date);
        mapping.insert("a", StorageType::varchar());

        let entries: Vec<_> = mapping.iter().collect();
        assert_eq!(
            entries,
            vec![("a", StorageType::varchar()), ("b", StorageType::Date)]
        );
    }

    #[test]
    fn display_renders_sql_types() {
        assert_eq!(StorageType::varchar().to_string(), "VARCHAR(255)");
        assert_eq!(StorageType::float().to_string(), "FLOAT(53)");
        assert_eq!(StorageType::Integer.to_string(), "BIGINT");
    }
}
