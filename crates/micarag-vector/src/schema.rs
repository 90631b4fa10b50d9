//! Arrow schema of the chunk table, the payload contract with the indexer.

use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

use micarag_core::error::{Error, Result};

pub const VECTOR_COLUMN: &str = "vector";
pub const DISTANCE_COLUMN: &str = "_distance";

/// Payload columns, their types and whether they may be null.
pub const PAYLOAD_COLUMNS: &[(&str, DataType, bool)] = &[
    ("doc_id", DataType::Utf8, false),
    ("title", DataType::Utf8, false),
    ("chunk_id", DataType::Int32, false),
    ("text", DataType::Utf8, false),
    ("source_url", DataType::Utf8, true),
];

pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
    let mut fields: Vec<Field> = PAYLOAD_COLUMNS
        .iter()
        .map(|(name, ty, nullable)| Field::new(*name, ty.clone(), *nullable))
        .collect();
    fields.push(Field::new(
        VECTOR_COLUMN,
        DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
        true,
    ));
    Arc::new(Schema::new(fields))
}

/// Dimension of the `vector` column, if it is a float list.
pub fn vector_dim(schema: &Schema) -> Option<i32> {
    match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
        DataType::FixedSizeList(item, dim) if item.data_type() == &DataType::Float32 => Some(*dim),
        _ => None,
    }
}

/// Check a stored table against the payload contract and the query dimension.
pub fn validate_schema(schema: &Schema, dim: usize) -> Result<()> {
    for (name, ty, _) in PAYLOAD_COLUMNS {
        let field = schema
            .field_with_name(name)
            .map_err(|_| Error::SchemaMismatch(format!("missing column '{name}'")))?;
        if field.data_type() != ty {
            return Err(Error::SchemaMismatch(format!(
                "column '{name}' is {}, expected {ty}",
                field.data_type()
            )));
        }
    }
    match vector_dim(schema) {
        Some(d) if usize::try_from(d).ok() == Some(dim) => Ok(()),
        Some(d) => Err(Error::SchemaMismatch(format!("index vectors have dimension {d}, query has {dim}"))),
        None => Err(Error::SchemaMismatch(format!("missing float vector column '{VECTOR_COLUMN}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_schema_round_trips_through_validation() {
        let schema = build_chunk_schema(8);
        assert_eq!(vector_dim(&schema), Some(8));
        validate_schema(&schema, 8).expect("valid");
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let err = validate_schema(&build_chunk_schema(8), 384).unwrap_err();
        assert!(err.to_string().contains("dimension 8"), "{err}");
    }

    #[test]
    fn wrong_column_type_is_reported() {
        let schema = Schema::new(vec![
            Field::new("doc_id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("chunk_id", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("source_url", DataType::Utf8, true),
        ]);
        let err = validate_schema(&schema, 8).unwrap_err();
        assert!(err.to_string().contains("'chunk_id'"), "{err}");
    }
}
