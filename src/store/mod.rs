// src/store/mod.rs

pub mod arrow;

use anyhow::{Context, Result};
use chrono::Utc;
use glob::glob;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::{debug, info};

use crate::normalize::VehicleRecord;
use self::arrow::{batch_to_records, records_to_batch};

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 200;

const TABLE: &str = "vehicles";

/// Page size for `find`: a parsable integer in `1..=MAX_LIMIT` is taken
/// as-is, anything else falls back to `DEFAULT_LIMIT`.
pub fn resolve_limit(raw: Option<&str>) -> usize {
    match raw.and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(n) if (1..=MAX_LIMIT as i64).contains(&n) => n as usize,
        _ => DEFAULT_LIMIT,
    }
}

/// Vehicle documents stored as Parquet, one file per inserted batch,
/// hive-partitioned by insert date:
/// `<dir>/vehicles/date=YYYYMMDD/<ts>-<seq>.parquet`.
pub struct VehicleStore {
    table_dir: PathBuf,
    seq: AtomicU64,
}

impl VehicleStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let table_dir = dir.as_ref().join(TABLE);
        fs::create_dir_all(&table_dir)
            .with_context(|| format!("could not create `{}`", table_dir.display()))?;
        Ok(Self {
            table_dir,
            seq: AtomicU64::new(0),
        })
    }

    pub fn table_dir(&self) -> &Path {
        &self.table_dir
    }

    /// Persist `records` as a single file. Returns the number written.
    #[tracing::instrument(level = "debug", skip(self, records), fields(n = records.len()))]
    pub fn insert_many(&self, records: &[VehicleRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let partition = format!("date={}", now.format("%Y%m%d"));
        let dir = self.table_dir.join(partition);
        fs::create_dir_all(&dir)
            .with_context(|| format!("could not create `{}`", dir.display()))?;

        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let fname = format!("{:020}-{:06}.parquet", now.timestamp_micros(), seq);
        let tmp = dir.join(format!("{}.tmp", fname));
        let final_path = dir.join(&fname);

        let batch = records_to_batch(records)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let file = File::create(&tmp)
            .with_context(|| format!("could not create temporary file `{}`", tmp.display()))?;
        let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))
            .context("creating ArrowWriter for vehicles")?;
        writer.write(&batch).context("writing vehicle batch")?;
        writer.close().context("closing vehicle writer")?;

        fs::rename(&tmp, &final_path).with_context(|| {
            format!(
                "failed to rename `{}` to `{}`",
                tmp.display(),
                final_path.display()
            )
        })?;

        info!(file = %final_path.display(), "stored {} vehicles", records.len());
        Ok(records.len())
    }

    /// Up to `limit` records, oldest insert first.
    pub fn find(&self, limit: usize) -> Result<Vec<VehicleRecord>> {
        let mut out = Vec::new();
        if limit == 0 {
            return Ok(out);
        }

        for path in self.data_files()? {
            let file =
                File::open(&path).with_context(|| format!("failed to open `{}`", path.display()))?;
            let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)
                .with_context(|| format!("failed to read `{}`", path.display()))?
                .with_batch_size(1024)
                .build()?;
            while let Some(batch) = reader
                .next()
                .transpose()
                .with_context(|| format!("error reading RecordBatch from `{}`", path.display()))?
            {
                for rec in batch_to_records(&batch)? {
                    out.push(rec);
                    if out.len() >= limit {
                        debug!("Fetched vehicles, limit {}", limit);
                        return Ok(out);
                    }
                }
            }
        }

        debug!("Fetched {} vehicles, limit {}", out.len(), limit);
        Ok(out)
    }

    /// Total stored records, read from file metadata only.
    pub fn count(&self) -> Result<usize> {
        let mut total = 0usize;
        for path in self.data_files()? {
            let file =
                File::open(&path).with_context(|| format!("failed to open `{}`", path.display()))?;
            let builder = ParquetRecordBatchReaderBuilder::try_new(file)
                .with_context(|| format!("failed to read `{}`", path.display()))?;
            total += builder.metadata().file_metadata().num_rows() as usize;
        }
        Ok(total)
    }

    /// Finished data files, ordered by partition then file name.
    fn data_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = format!("{}/date=*/*.parquet", self.table_dir.display());
        let mut files: Vec<PathBuf> = glob(&pattern)
            .context("invalid glob pattern for vehicle files")?
            .filter_map(Result::ok)
            .collect();
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::FieldValue;
    use tempfile::tempdir;

    fn vehicle(vin: &str, price: Option<f64>) -> VehicleRecord {
        let mut v = VehicleRecord::new("acme");
        v.set("vin", FieldValue::Text(vin.to_string()));
        v.set("price", price.map_or(FieldValue::Null, FieldValue::Number));
        v
    }

    #[test]
    fn limit_policy() {
        assert_eq!(resolve_limit(None), DEFAULT_LIMIT);
        assert_eq!(resolve_limit(Some("10")), 10);
        assert_eq!(resolve_limit(Some("200")), 200);
        assert_eq!(resolve_limit(Some("201")), DEFAULT_LIMIT);
        assert_eq!(resolve_limit(Some("0")), DEFAULT_LIMIT);
        assert_eq!(resolve_limit(Some("-5")), DEFAULT_LIMIT);
        assert_eq!(resolve_limit(Some("ten")), DEFAULT_LIMIT);
    }

    #[test]
    fn insert_then_find_in_order() -> Result<()> {
        let dir = tempdir()?;
        let store = VehicleStore::open(dir.path())?;

        assert_eq!(store.insert_many(&[vehicle("A", Some(1.0)), vehicle("B", None)])?, 2);
        assert_eq!(store.insert_many(&[vehicle("C", Some(3.5))])?, 1);
        assert_eq!(store.insert_many(&[])?, 0);

        let all = store.find(DEFAULT_LIMIT)?;
        let vins: Vec<&str> = all
            .iter()
            .filter_map(|r| r.get("vin").and_then(FieldValue::as_text))
            .collect();
        assert_eq!(vins, vec!["A", "B", "C"]);
        assert_eq!(all[1].get("price"), Some(&FieldValue::Null));
        assert_eq!(all[2].get("price"), Some(&FieldValue::Number(3.5)));
        assert_eq!(all[0].provider, "acme");
        assert_eq!(store.count()?, 3);
        Ok(())
    }

    #[test]
    fn find_honours_limit() -> Result<()> {
        let dir = tempdir()?;
        let store = VehicleStore::open(dir.path())?;
        let batch: Vec<VehicleRecord> = (0..10).map(|i| vehicle(&i.to_string(), None)).collect();
        store.insert_many(&batch)?;

        assert_eq!(store.find(3)?.len(), 3);
        assert_eq!(store.find(0)?.len(), 0);
        assert_eq!(store.find(100)?.len(), 10);
        Ok(())
    }

    #[test]
    fn no_temp_files_left_behind() -> Result<()> {
        let dir = tempdir()?;
        let store = VehicleStore::open(dir.path())?;
        store.insert_many(&[vehicle("A", None)])?;

        let pattern = format!("{}/**/*.tmp", store.table_dir().display());
        assert_eq!(glob(&pattern)?.count(), 0);
        Ok(())
    }
}
