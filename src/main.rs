use anyhow::{bail, Context, Result};
use std::{env, path::PathBuf, sync::Arc};
use tokio::{
    sync::{mpsc, Semaphore},
    time::Instant,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use vehicle_import::{
    config::Config,
    ingest::pipeline::{self, PreparedUpload},
    normalize::{columns, TracingSink},
    store::{resolve_limit, VehicleStore},
};

const USAGE: &str = "usage:
  vehicle-import import <provider> <file.csv|file.zip>...
  vehicle-import list [limit]
  vehicle-import columns";

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::load()?;

    // ─── 1) init logging ─────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.as_str()));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("import") => {
            let provider = args.get(1).cloned().unwrap_or_default();
            let files: Vec<PathBuf> = args.iter().skip(2).map(PathBuf::from).collect();
            if files.is_empty() {
                bail!("{}", USAGE);
            }
            run_import(&cfg, provider, files).await
        }
        Some("list") => run_list(&cfg, args.get(1).map(String::as_str)),
        Some("columns") => {
            print!("{}", columns::registry_yaml()?);
            Ok(())
        }
        _ => bail!("{}", USAGE),
    }
}

async fn run_import(cfg: &Config, provider: String, files: Vec<PathBuf>) -> Result<()> {
    pipeline::validate_provider(&provider)?;
    let store = VehicleStore::open(&cfg.store_dir)?;
    info!(store = %store.table_dir().display(), "importing {} uploads", files.len());

    // ─── 2) load + normalize uploads on the blocking pool ───────────
    let (tx, mut rx) = mpsc::channel::<(PathBuf, Result<(PreparedUpload, usize)>)>(16);
    let sem = Arc::new(Semaphore::new(cfg.max_concurrent_imports));
    let provider = Arc::new(provider);
    let mut handles = Vec::with_capacity(files.len());

    for path in files {
        let tx = tx.clone();
        let sem = sem.clone();
        let provider = Arc::clone(&provider);

        handles.push(tokio::spawn(async move {
            let _permit = match sem.acquire_owned().await {
                Ok(p) => p,
                Err(e) => {
                    let _ = tx.send((path, Err(e.into()))).await;
                    return;
                }
            };
            let start = Instant::now();
            let job_path = path.clone();
            let res = tokio::task::spawn_blocking(move || {
                let mut sink = TracingSink::new();
                pipeline::prepare_upload(&job_path, &provider, &mut sink)
                    .map(|upload| (upload, sink.total()))
            })
            .await
            .context("normalize task panicked")
            .and_then(|r| r);
            info!(file = %path.display(), elapsed = ?start.elapsed(), "normalized");
            let _ = tx.send((path, res)).await;
        }));
    }
    // drop the original sender so `rx.recv()` ends once every upload is in
    drop(tx);

    // ─── 3) persist uploads one at a time ───────────────────────────
    let mut failed = 0usize;
    while let Some((path, msg)) = rx.recv().await {
        let result = msg.and_then(|(upload, diagnostics)| {
            pipeline::store_upload(&store, upload).map(|summary| (summary, diagnostics))
        });
        match result {
            Ok((summary, diagnostics)) => info!(
                file = %summary.file.display(),
                rows = summary.rows_read,
                stored = summary.records_stored,
                diagnostics,
                "imported"
            ),
            Err(e) => {
                failed += 1;
                error!("import of {} failed: {:#}", path.display(), e);
            }
        }
    }

    for h in handles {
        let _ = h.await;
    }

    if failed > 0 {
        bail!("{} upload(s) failed", failed);
    }
    info!("all done");
    Ok(())
}

fn run_list(cfg: &Config, raw_limit: Option<&str>) -> Result<()> {
    let store = VehicleStore::open(&cfg.store_dir)?;
    let limit = resolve_limit(raw_limit);
    let vehicles = store.find(limit)?;
    info!("Sending {} records", vehicles.len());
    println!("{}", serde_json::to_string_pretty(&vehicles)?);
    Ok(())
}
