//! Tests for batch module

use super::*;
use arrow::array::{Array, Int64Array, StringArray};
use arrow::compute::concat_batches;
use arrow::datatypes::DataType;
use serde_json::json;

// ============================================================================
// Flattening Tests
// ============================================================================

#[test]
fn test_flatten_single_object() {
    let payload = json!({"id": "a", "value": 1});
    let rows = flatten_records(&payload).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "a");
}

#[test]
fn test_flatten_nested_object() {
    let payload = json!([{"id": "a", "user": {"name": "Alice", "address": {"city": "Oslo"}}}]);
    let rows = flatten_records(&payload).unwrap();
    assert_eq!(rows[0]["user.name"], "Alice");
    assert_eq!(rows[0]["user.address.city"], "Oslo");
    assert!(rows[0].get("user").is_none());
}

#[test]
fn test_flatten_keeps_arrays() {
    let payload = json!([{"tags": ["a", "b"], "meta": {"ids": [1, 2]}}]);
    let rows = flatten_records(&payload).unwrap();
    assert_eq!(rows[0]["tags"], json!(["a", "b"]));
    assert_eq!(rows[0]["meta.ids"], json!([1, 2]));
}

#[test]
fn test_flatten_rejects_non_objects() {
    assert!(flatten_records(&json!("scalar")).is_err());
    assert!(flatten_records(&json!([1, 2, 3])).is_err());
}

// ============================================================================
// Schema Inference Tests
// ============================================================================

#[test]
fn test_infer_schema_empty() {
    let records: Vec<serde_json::Value> = vec![];
    let schema = infer_schema(&records).unwrap();
    assert!(schema.fields().is_empty());
}

#[test]
fn test_infer_schema_simple() {
    let records = vec![
        json!({"name": "Alice", "age": 30}),
        json!({"name": "Bob", "age": 25}),
    ];

    let schema = infer_schema(&records).unwrap();
    assert_eq!(schema.fields().len(), 2);

    let name_field = schema.field_with_name("name").unwrap();
    let age_field = schema.field_with_name("age").unwrap();

    assert_eq!(name_field.data_type(), &DataType::Utf8);
    assert_eq!(age_field.data_type(), &DataType::Int64);
}

#[test]
fn test_infer_schema_first_seen_order() {
    let records = vec![json!({"b": 1, "a": 2}), json!({"c": 3})];
    let schema = infer_schema(&records).unwrap();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, vec!["b", "a", "c"]);
}

#[test]
fn test_infer_schema_mixed_numbers() {
    let records = vec![json!({"value": 42}), json!({"value": 3.14})];

    let schema = infer_schema(&records).unwrap();
    let value_field = schema.field_with_name("value").unwrap();
    // Mixed int/float should become Float64
    assert_eq!(value_field.data_type(), &DataType::Float64);
}

#[test]
fn test_infer_schema_with_nulls() {
    let records = vec![
        json!({"name": "Alice", "email": null}),
        json!({"name": "Bob", "email": "bob@example.com"}),
    ];

    let schema = infer_schema(&records).unwrap();
    let email_field = schema.field_with_name("email").unwrap();
    assert_eq!(email_field.data_type(), &DataType::Utf8);
}

// ============================================================================
// JSON to Arrow Tests
// ============================================================================

#[test]
fn test_json_to_arrow_simple() {
    let records = vec![
        json!({"id": 1, "name": "Alice"}),
        json!({"id": 2, "name": "Bob"}),
    ];

    let batch = json_to_arrow(&records, None).unwrap();
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.num_columns(), 2);
}

#[test]
fn test_json_to_arrow_empty() {
    let records: Vec<serde_json::Value> = vec![];
    let batch = json_to_arrow(&records, None).unwrap();
    assert_eq!(batch.num_rows(), 0);
}

#[test]
fn test_json_to_arrow_with_missing_values() {
    let records = vec![
        json!({"id": 1, "name": "Alice"}),
        json!({"id": 2, "name": null}),
        json!({"id": 3}),
    ];

    let batch = json_to_arrow(&records, None).unwrap();
    assert_eq!(batch.num_rows(), 3);

    let names = batch
        .column(batch.schema().index_of("name").unwrap())
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap()
        .clone();
    assert!(names.is_null(1));
    assert!(names.is_null(2));
}

#[test]
fn test_json_to_arrow_with_arrays() {
    let records = vec![
        json!({"tags": ["a", "b"]}),
        json!({"tags": ["c"]}),
        json!({"tags": []}),
    ];

    let batch = json_to_arrow(&records, None).unwrap();
    assert_eq!(batch.num_rows(), 3);
}

// ============================================================================
// Unify Tests
// ============================================================================

#[test]
fn test_unify_widens_both_sides() {
    // {a,b} against {b,c} -> both sides end with {a,b,c}
    let left = json_to_arrow(&[json!({"a": 1, "b": "x"})], None).unwrap();
    let right = json_to_arrow(&[json!({"b": "y", "c": true})], None).unwrap();

    let (left_out, right_out) = unify(&left, &right).unwrap();

    assert_eq!(left_out.schema(), right_out.schema());
    let schema = left_out.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);

    // Original non-null values preserved verbatim; new cells are null
    let a_left = left_out.column(0).as_any().downcast_ref::<Int64Array>().unwrap().clone();
    assert_eq!(a_left.value(0), 1);
    let a_right = right_out.column(0);
    assert!(a_right.is_null(0));
    let c_left = left_out.column(2);
    assert!(c_left.is_null(0));
}

#[test]
fn test_unify_null_column_type_follows_other_side() {
    let left = json_to_arrow(&[json!({"a": 1})], None).unwrap();
    let right = json_to_arrow(&[json!({"a": 2, "score": 9.5})], None).unwrap();

    let (left_out, _) = unify(&left, &right).unwrap();
    let score = left_out.schema().field_with_name("score").unwrap().clone();
    assert_eq!(score.data_type(), &DataType::Float64);
}

#[test]
fn test_unify_with_empty_side() {
    let left = json_to_arrow(&[], None).unwrap();
    let right = json_to_arrow(&[json!({"a": 1})], None).unwrap();

    let (left_out, right_out) = unify(&left, &right).unwrap();
    assert_eq!(left_out.num_rows(), 0);
    assert_eq!(right_out.num_rows(), 1);
    assert_eq!(left_out.schema(), right_out.schema());
}

#[test]
fn test_unified_batches_concatenate() {
    let left = json_to_arrow(&[json!({"a": 1, "b": "x"}), json!({"a": 2, "b": "y"})], None).unwrap();
    let right = json_to_arrow(&[json!({"b": "z", "c": 7})], None).unwrap();

    let (left_out, right_out) = unify(&left, &right).unwrap();
    let combined = concat_batches(&left_out.schema(), [&left_out, &right_out]).unwrap();

    assert_eq!(combined.num_rows(), 3);
    // Existing rows first, new rows appended, order preserved
    let b = combined
        .column(combined.schema().index_of("b").unwrap())
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap()
        .clone();
    assert_eq!(b.value(0), "x");
    assert_eq!(b.value(1), "y");
    assert_eq!(b.value(2), "z");
}

#[test]
fn test_check_compatible_accepts_matching_types() {
    let a = infer_schema(&[json!({"id": 1, "name": "x"})]).unwrap();
    let b = infer_schema(&[json!({"id": 2, "extra": true})]).unwrap();
    assert!(check_compatible(&a, &b).is_ok());
}

#[test]
fn test_check_compatible_rejects_type_clash() {
    let a = infer_schema(&[json!({"amount": 10})]).unwrap();
    let b = infer_schema(&[json!({"amount": "ten"})]).unwrap();

    let err = check_compatible(&a, &b).unwrap_err();
    match err {
        crate::error::Error::SchemaConflict { column, .. } => assert_eq!(column, "amount"),
        other => panic!("Expected SchemaConflict, got: {other}"),
    }
}
