// src/ingest/pipeline.rs
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::normalize::{normalize_batch, DiagnosticSink, RawRow, VehicleRecord};
use crate::store::VehicleStore;

/// What one upload produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub file: PathBuf,
    pub rows_read: usize,
    pub records_stored: usize,
}

/// A loaded and normalized upload, ready to be persisted.
#[derive(Debug)]
pub struct PreparedUpload {
    pub file: PathBuf,
    pub rows_read: usize,
    pub vehicles: Vec<VehicleRecord>,
}

pub fn validate_provider(provider: &str) -> Result<()> {
    if provider.trim().is_empty() {
        bail!("provider is required");
    }
    Ok(())
}

/// Load and normalize an upload without touching the store.
pub fn prepare_upload<S: DiagnosticSink + ?Sized>(
    path: &Path,
    provider: &str,
    sink: &mut S,
) -> Result<PreparedUpload> {
    validate_provider(provider)?;

    let rows: Vec<RawRow> = super::source::load_upload(path)?;
    info!("Processing file content");
    let vehicles = normalize_batch(&rows, provider, sink);
    info!("Done processing file content");

    Ok(PreparedUpload {
        file: path.to_path_buf(),
        rows_read: rows.len(),
        vehicles,
    })
}

/// Persist a prepared upload. An upload with nothing left to store is an
/// error so the caller can report it.
pub fn store_upload(store: &VehicleStore, upload: PreparedUpload) -> Result<ImportSummary> {
    if upload.vehicles.is_empty() {
        bail!(
            "no vehicles available to persist from {} ({} rows read)",
            upload.file.display(),
            upload.rows_read
        );
    }

    debug!("Persisting vehicles to store");
    let records_stored = store
        .insert_many(&upload.vehicles)
        .with_context(|| format!("storing vehicles from {}", upload.file.display()))?;
    debug!("Done persisting vehicles to store");

    Ok(ImportSummary {
        file: upload.file,
        rows_read: upload.rows_read,
        records_stored,
    })
}

/// Read, normalize and store one upload for `provider`.
#[tracing::instrument(level = "info", skip(path, store, sink), fields(path = %path.display()))]
pub fn import_upload<S: DiagnosticSink + ?Sized>(
    path: &Path,
    provider: &str,
    store: &VehicleStore,
    sink: &mut S,
) -> Result<ImportSummary> {
    let upload = prepare_upload(path, provider, sink)?;
    store_upload(store, upload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Diagnostic, FieldValue};
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,vehicle_import=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn upload(content: &str) -> Result<NamedTempFile> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(content.as_bytes())?;
        Ok(tmp)
    }

    #[test]
    fn imports_a_provider_file() -> Result<()> {
        init_test_logging();
        let csv = "uuid,vin,make,model,mileage,year,price,zip code,create date,update date\n\
            u-1,1HGCM,Honda,Accord,42000,2019,\"$20,000\",94103,2023-01-15,not-a-date\n\
            ,,,,,,,,,\n\
            u-2,2T1BU,Toyota,Corolla,1000,2022,-$50,10001,01/20/2023,2023-02-01T10:00:00Z\n";
        let file = upload(csv)?;
        let dir = tempdir()?;
        let store = VehicleStore::open(dir.path())?;
        let mut diags: Vec<Diagnostic> = Vec::new();

        let summary = import_upload(file.path(), "acme", &store, &mut diags)?;
        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.records_stored, 2);

        // the bad update date, then both blank dates of the empty line
        let reported: Vec<(Option<usize>, Option<&str>)> =
            diags.iter().map(|d| (d.row, d.field)).collect();
        assert_eq!(
            reported,
            vec![
                (Some(0), Some("update_date")),
                (Some(1), Some("create_date")),
                (Some(1), Some("update_date")),
            ]
        );

        let stored = store.find(50)?;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].get("price"), Some(&FieldValue::Number(20000.0)));
        assert_eq!(stored[0].get("update_date"), Some(&FieldValue::Null));
        assert_eq!(stored[1].get("price"), Some(&FieldValue::Number(-50.0)));
        assert_eq!(stored[1].get("zip_code"), Some(&FieldValue::Text("10001".into())));
        assert!(stored.iter().all(|r| r.provider == "acme"));
        Ok(())
    }

    #[test]
    fn empty_provider_is_rejected() -> Result<()> {
        let file = upload("VIN\nA\n")?;
        let dir = tempdir()?;
        let store = VehicleStore::open(dir.path())?;
        let err = import_upload(file.path(), "  ", &store, &mut Vec::<Diagnostic>::new())
            .unwrap_err();
        assert!(err.to_string().contains("provider"));
        assert_eq!(store.count()?, 0);
        Ok(())
    }

    #[test]
    fn nothing_to_store_is_an_error() -> Result<()> {
        let file = upload("VIN,Price\n,\n,\n")?;
        let dir = tempdir()?;
        let store = VehicleStore::open(dir.path())?;
        let err = import_upload(file.path(), "acme", &store, &mut Vec::<Diagnostic>::new())
            .unwrap_err();
        assert!(err.to_string().contains("no vehicles available"));
        Ok(())
    }

    #[test]
    fn header_only_upload_reports_no_rows() -> Result<()> {
        let file = upload("VIN,Make\n")?;
        let mut diags: Vec<Diagnostic> = Vec::new();
        let prepared = prepare_upload(file.path(), "acme", &mut diags)?;
        assert_eq!(prepared.rows_read, 0);
        assert!(prepared.vehicles.is_empty());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "no rows received");
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.csv");
        assert!(prepare_upload(&missing, "acme", &mut Vec::<Diagnostic>::new()).is_err());
    }
}
