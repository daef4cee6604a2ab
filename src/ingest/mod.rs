pub mod pipeline;
pub mod source;

pub use pipeline::{import_upload, ImportSummary};
pub use source::{load_upload, parse_csv};
