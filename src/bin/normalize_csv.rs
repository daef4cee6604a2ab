use std::env;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing_subscriber::{fmt, EnvFilter};
use vehicle_import::ingest::{load_upload, pipeline::validate_provider};
use vehicle_import::normalize::{normalize_batch, Diagnostic};

/// Dry run: print the records an upload would produce as JSON lines on
/// stdout, and every diagnostic on stderr. Nothing is stored.
fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <provider> <file.csv|file.zip>", args[0]);
        std::process::exit(1);
    }
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let provider = &args[1];
    validate_provider(provider)?;
    let path = Path::new(&args[2]);

    let rows = load_upload(path)?;
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let vehicles = normalize_batch(&rows, provider, &mut diagnostics);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for v in &vehicles {
        serde_json::to_writer(&mut out, v)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    for d in &diagnostics {
        eprintln!("{}", d);
    }
    eprintln!(
        "{} rows → {} vehicles, {} diagnostics",
        rows.len(),
        vehicles.len(),
        diagnostics.len()
    );
    Ok(())
}
