// src/ingest/source.rs
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::{
    fs::File,
    io::{Cursor, Read},
    path::Path,
};
use tracing::{debug, info};
use zip::ZipArchive;

use crate::normalize::RawRow;

/// Tokenize CSV bytes into rows keyed by the first record's headers.
///
/// Records shorter than the header line simply lack the trailing headers;
/// extra cells beyond the header line are ignored.
pub fn parse_csv(data: &[u8], file_name: &str) -> Result<Vec<RawRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(Cursor::new(data));

    let headers = rdr
        .headers()
        .with_context(|| format!("reading header line of {}", file_name))?
        .clone();

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("CSV parse error in {} at record {}", file_name, idx))?;
        let row: RawRow = headers.iter().zip(record.iter()).collect();
        rows.push(row);
    }

    debug!(file = file_name, rows = rows.len(), "parsed CSV");
    Ok(rows)
}

/// Load every row of an upload.
///
/// A `.zip` upload contributes each `.csv` entry, in archive order; any
/// other path is read as a single CSV file.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_upload<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>> {
    let path = path.as_ref();
    let is_zip = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("zip"));

    let rows = if is_zip {
        load_zip(path)?
    } else {
        let mut buf = Vec::new();
        File::open(path)
            .with_context(|| format!("Failed to open upload: {:?}", path))?
            .read_to_end(&mut buf)
            .with_context(|| format!("Failed to read upload: {:?}", path))?;
        parse_csv(&buf, &path.display().to_string())?
    };

    info!("Finished reading upload, got {} rows", rows.len());
    Ok(rows)
}

fn load_zip(zip_path: &Path) -> Result<Vec<RawRow>> {
    let file = File::open(zip_path)
        .with_context(|| format!("Failed to open ZIP file: {:?}", zip_path))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {:?}", zip_path))?;

    let mut rows = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to access ZIP entry #{} in {:?}", i, zip_path))?;
        let name = entry.name().to_string();
        if !entry.is_file() || !name.to_lowercase().ends_with(".csv") {
            continue;
        }

        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buf)
            .with_context(|| format!("Failed to read {} into memory", name))?;
        rows.extend(parse_csv(&buf, &name)?);
    }
    Ok(rows)
}
