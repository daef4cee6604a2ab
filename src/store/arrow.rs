// src/store/arrow.rs

use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{
        Array, ArrayRef, Float64Array, Float64Builder, StringArray, StringBuilder,
        TimestampMillisecondArray, TimestampMillisecondBuilder,
    },
    datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema, TimeUnit},
    record_batch::RecordBatch,
};
use chrono::{TimeZone, Utc};
use std::sync::Arc;

use crate::normalize::{columns, CoercionKind, ColumnDefinition, FieldValue, VehicleRecord};

pub const PROVIDER_COLUMN: &str = "provider";

/// Map a coercion kind onto the Arrow type its values are stored as.
///
/// - Identity → Utf8
/// - Money    → Float64
/// - Date     → Timestamp(ms, UTC)
pub fn map_to_arrow_type(kind: CoercionKind) -> DataType {
    match kind {
        CoercionKind::Identity => DataType::Utf8,
        CoercionKind::Money => DataType::Float64,
        CoercionKind::Date => DataType::Timestamp(TimeUnit::Millisecond, Some(Arc::from("UTC"))),
    }
}

/// `provider` followed by every registry column, all nullable except provider.
pub fn build_arrow_schema(cols: &[ColumnDefinition]) -> Arc<ArrowSchema> {
    let mut fields = Vec::with_capacity(cols.len() + 1);
    fields.push(ArrowField::new(PROVIDER_COLUMN, DataType::Utf8, false));
    fields.extend(
        cols.iter()
            .map(|c| ArrowField::new(c.canonical_field, map_to_arrow_type(c.coercion), true)),
    );
    Arc::new(ArrowSchema::new(fields))
}

pub fn vehicle_schema() -> Arc<ArrowSchema> {
    build_arrow_schema(columns())
}

/// Pack records into one batch. A value whose type does not match its
/// column is written as null.
pub fn records_to_batch(records: &[VehicleRecord]) -> Result<RecordBatch> {
    let schema = vehicle_schema();
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

    let providers: StringArray = records.iter().map(|r| Some(r.provider.as_str())).collect();
    arrays.push(Arc::new(providers));

    for def in columns() {
        let field = def.canonical_field;
        let values = records.iter().map(|r| r.get(field));
        let array: ArrayRef = match def.coercion {
            CoercionKind::Identity => {
                let mut b = StringBuilder::new();
                for v in values {
                    b.append_option(v.and_then(FieldValue::as_text));
                }
                Arc::new(b.finish())
            }
            CoercionKind::Money => {
                let mut b = Float64Builder::new();
                for v in values {
                    b.append_option(v.and_then(FieldValue::as_number));
                }
                Arc::new(b.finish())
            }
            CoercionKind::Date => {
                let mut b = TimestampMillisecondBuilder::new();
                for v in values {
                    b.append_option(v.and_then(FieldValue::as_date).map(|d| d.timestamp_millis()));
                }
                Arc::new(b.finish().with_timezone("UTC"))
            }
        };
        arrays.push(array);
    }

    RecordBatch::try_new(schema, arrays).context("building vehicle record batch")
}

/// Unpack a stored batch back into records, in row order.
pub fn batch_to_records(batch: &RecordBatch) -> Result<Vec<VehicleRecord>> {
    let providers = column_as::<StringArray>(batch, PROVIDER_COLUMN)?;
    let mut records: Vec<VehicleRecord> = (0..batch.num_rows())
        .map(|i| VehicleRecord::new(providers.value(i)))
        .collect();

    for def in columns() {
        let field = def.canonical_field;
        match def.coercion {
            CoercionKind::Identity => {
                let arr = column_as::<StringArray>(batch, field)?;
                for (rec, v) in records.iter_mut().zip(arr.iter()) {
                    rec.set(field, v.map_or(FieldValue::Null, |s| FieldValue::Text(s.to_string())));
                }
            }
            CoercionKind::Money => {
                let arr = column_as::<Float64Array>(batch, field)?;
                for (rec, v) in records.iter_mut().zip(arr.iter()) {
                    rec.set(field, v.map_or(FieldValue::Null, FieldValue::Number));
                }
            }
            CoercionKind::Date => {
                let arr = column_as::<TimestampMillisecondArray>(batch, field)?;
                for (rec, v) in records.iter_mut().zip(arr.iter()) {
                    let value = v
                        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                        .map_or(FieldValue::Null, FieldValue::Date);
                    rec.set(field, value);
                }
            }
        }
    }

    Ok(records)
}

fn column_as<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("stored batch has no `{}` column", name))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow!("stored column `{}` has unexpected type", name))
}
