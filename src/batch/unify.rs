//! Schema unification across divergent batches
//!
//! Two batches produced by different ingestion calls may carry different
//! column sets. Before they can be concatenated into one partition file,
//! both sides must be widened to the union schema, with missing columns
//! filled by typed nulls.

use crate::error::{Error, Result};
use arrow::array::new_null_array;
use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::collections::HashSet;
use std::sync::Arc;

/// Widen both batches to the identical union column set.
///
/// Columns present on only one side are added to the other as full-length
/// null arrays of the same type. Original columns are untouched; the union
/// schema lists the left batch's columns first, then right-only columns in
/// their original order. Every union field is nullable.
///
/// Same-name columns with differing types are passed through uninterpreted;
/// the resulting batches then fail to assemble downstream. Callers that
/// want a diagnosable error run [`check_compatible`] first.
pub fn unify(left: &RecordBatch, right: &RecordBatch) -> Result<(RecordBatch, RecordBatch)> {
    let mut fields: Vec<Field> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let left_schema = left.schema();
    let right_schema = right.schema();

    for field in left_schema.fields() {
        fields.push(Field::new(field.name(), field.data_type().clone(), true));
        seen.insert(field.name().clone());
    }
    for field in right_schema.fields() {
        if !seen.contains(field.name()) {
            fields.push(Field::new(field.name(), field.data_type().clone(), true));
        }
    }

    let union_schema: SchemaRef = Arc::new(Schema::new(fields));
    let left_out = project(left, &union_schema)?;
    let right_out = project(right, &union_schema)?;
    Ok((left_out, right_out))
}

/// Rebuild a batch against the union schema, null-filling absent columns
fn project(batch: &RecordBatch, schema: &SchemaRef) -> Result<RecordBatch> {
    let batch_schema = batch.schema();
    let columns = schema
        .fields()
        .iter()
        .map(|field| match batch_schema.index_of(field.name()) {
            Ok(idx) => Arc::clone(batch.column(idx)),
            Err(_) => new_null_array(field.data_type(), batch.num_rows()),
        })
        .collect();

    RecordBatch::try_new(Arc::clone(schema), columns).map_err(Error::from)
}

/// Reject same-name columns whose types disagree between the two schemas.
///
/// Run ahead of [`unify`] + concatenation so the caller gets a named
/// schema-conflict error instead of an opaque merge failure.
pub fn check_compatible(existing: &Schema, incoming: &Schema) -> Result<()> {
    for field in incoming.fields() {
        if let Ok(prior) = existing.field_with_name(field.name()) {
            if prior.data_type() != field.data_type() {
                return Err(Error::SchemaConflict {
                    column: field.name().clone(),
                    existing: format!("{}", prior.data_type()),
                    incoming: format!("{}", field.data_type()),
                });
            }
        }
    }
    Ok(())
}
