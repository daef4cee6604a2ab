pub mod config;
pub mod ingest;
pub mod normalize;
pub mod store;

pub use normalize::{normalize_batch, normalize_row, RawRow, VehicleRecord};
