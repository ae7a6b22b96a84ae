use crate::schema::audit::DATE_WINDOW_COLUMNS;
use model::{
    core::{
        data_type::{DataType, TypeFamily},
        storage_type::{StorageType, TypeMapping},
    },
    records::batch::Batch,
};

/// Pins a destination storage type for every column of `batch`, in column
/// order. Depends only on column names and runtime types.
pub fn infer_types(batch: &Batch) -> TypeMapping {
    let mut mapping = TypeMapping::new();
    for field in &batch.fields {
        mapping.insert(field.name.clone(), storage_for(&field.name, &field.data_type));
    }
    mapping
}

pub fn storage_for(column: &str, data_type: &DataType) -> StorageType {
    if DATE_WINDOW_COLUMNS.contains(&column) {
        return StorageType::Date;
    }

    match data_type.family() {
        TypeFamily::Text => StorageType::varchar(),
        TypeFamily::DateTime => StorageType::Timestamp,
        TypeFamily::Date => StorageType::Date,
        TypeFamily::Float => StorageType::float(),
        TypeFamily::Integer => StorageType::Integer,
        TypeFamily::Other => StorageType::varchar(),
    }
}
