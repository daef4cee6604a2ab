// src/normalize/mod.rs

pub mod coerce;
pub mod columns;
pub mod date_parser;
pub mod diagnostics;
pub mod record;

pub use columns::{columns, CoercionKind, ColumnDefinition, COLUMNS};
pub use diagnostics::{Diagnostic, DiagnosticSink, Severity, TracingSink};
pub use record::{FieldValue, RawRow, VehicleRecord};

use coerce::{Coerced, CoercionFailure};
use tracing::debug;

/// Map one raw row onto a vehicle record.
///
/// Every registry field is present in the output. A column missing from
/// the row is set to `Null` without coercion. A present value that fails
/// coercion is also `Null` and is reported to `sink` tagged with
/// `row_index`: an Error for a date (blank cells included), a Warning for
/// money.
pub fn normalize_row<S: DiagnosticSink + ?Sized>(
    row: &RawRow,
    row_index: usize,
    provider: &str,
    sink: &mut S,
) -> VehicleRecord {
    let mut vehicle = VehicleRecord::new(provider);

    for def in columns() {
        let header = match columns::find_header(row.headers(), def) {
            Some(h) => h,
            None => {
                vehicle.set(def.canonical_field, FieldValue::Null);
                continue;
            }
        };

        let coerced = coerce::coerce(def.coercion, row.get(header));
        if let Coerced::Failed(failure) = &coerced {
            let diagnostic = match failure {
                CoercionFailure::UnparsableDate(_) => Diagnostic::error(failure.to_string()),
                CoercionFailure::UnparsableMoney(_) => Diagnostic::warning(failure.to_string()),
            };
            sink.emit(diagnostic.at_row(row_index).on_field(def.canonical_field));
        }
        vehicle.set(def.canonical_field, coerced.into_value());
    }

    vehicle
}

/// Normalize a whole upload.
///
/// An empty input yields an empty result and a single "no rows received"
/// diagnostic. Rows that carry no usable value are dropped silently;
/// surviving records keep their input order.
pub fn normalize_batch<S: DiagnosticSink + ?Sized>(
    rows: &[RawRow],
    provider: &str,
    sink: &mut S,
) -> Vec<VehicleRecord> {
    if rows.is_empty() {
        sink.emit(Diagnostic::error("no rows received"));
        return Vec::new();
    }

    let vehicles: Vec<VehicleRecord> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| normalize_row(row, idx, provider, sink))
        .filter(|v| !v.is_blank())
        .collect();

    debug!(
        rows = rows.len(),
        kept = vehicles.len(),
        provider,
        "normalized batch"
    );
    vehicles
}
