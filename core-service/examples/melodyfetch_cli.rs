//! Command-line catalog client
//!
//! Drives the task bridge from the main thread the way a GUI event loop
//! would: submit, then pump deliveries.
//!
//! Run with:
//! ```bash
//! # Search by keyword
//! cargo run -p core-service --example melodyfetch_cli -- "sunny day"
//!
//! # Look up a track id and download it into the download folder
//! cargo run -p core-service --example melodyfetch_cli -- 186016 --download
//!
//! # Use a catalog configuration file and JSON logs
//! MELODYFETCH_CONFIG=catalog.toml MELODYFETCH_LOG=json \
//!     cargo run -p core-service --example melodyfetch_cli -- "sunny day"
//! ```

use anyhow::{bail, Context};
use bridge_traits::time::LogLevel;
use core_catalog::{CatalogOutcome, CatalogQuery};
use core_runtime::config::{CatalogApiConfig, CoreConfig};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{CoreService, Operation, TaskResult};
use std::cell::{Cell, RefCell};
use std::env;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let download = args.iter().any(|a| a == "--download");
    let input = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_default();

    let format = match env::var("MELODYFETCH_LOG").as_deref() {
        Ok("json") => LogFormat::Json,
        Ok("compact") => LogFormat::Compact,
        _ => LogFormat::default(),
    };
    init_logging(
        LoggingConfig::default()
            .with_format(format)
            .with_level(LogLevel::Info),
    )?;

    let catalog = match env::var("MELODYFETCH_CONFIG") {
        Ok(path) => CatalogApiConfig::load(&path)?,
        Err(_) => CatalogApiConfig::default(),
    };
    let config = CoreConfig::builder().catalog(catalog).build()?;
    let core = CoreService::new(config)?;

    let query = CatalogQuery::parse(&input)?;
    info!(?query, "Submitting");

    let mut bridge = core.start_bridge()?;
    let done = Rc::new(Cell::new(false));
    let selected = Rc::new(RefCell::new(None));

    {
        let done = done.clone();
        let catalog = core.catalog().clone();
        bridge.on_search_done(move |request_id, outcome| {
            match outcome {
                CatalogOutcome::Success(tracks) => {
                    for track in tracks {
                        println!("{:>12}  {} - {}  {}", track.id, track.title, track.artist, catalog.web_url(&track.id));
                    }
                }
                CatalogOutcome::Empty => println!("No results"),
                CatalogOutcome::Failure(e) => println!("Search {request_id} failed: {e}"),
            }
            done.set(true);
        });
    }
    {
        let done = done.clone();
        let selected = selected.clone();
        bridge.on_detail_done(move |_, outcome| {
            match outcome {
                CatalogOutcome::Success(detail) => {
                    println!("{} - {}", detail.title, detail.artist);
                    println!("  album:    {}", detail.album);
                    println!("  duration: {}", detail.duration_label);
                    println!("  size:     {}", detail.size_label);
                    *selected.borrow_mut() = Some(detail);
                }
                CatalogOutcome::Empty => println!("Nothing found"),
                CatalogOutcome::Failure(e) => println!("Lookup failed: {e}"),
            }
            done.set(true);
        });
    }
    bridge.on_download_progress(|_, progress| {
        if let Some(percent) = progress.percent() {
            eprint!("\r{percent:>3}%");
        }
    });

    bridge.submit(Operation::from_query(query))?;
    while !done.get() {
        bridge.wait_and_dispatch(Duration::from_millis(100));
    }

    let track = selected.borrow_mut().take();
    if let (true, Some(detail)) = (download, track) {
        let url = match detail.download_url.clone() {
            Some(url) => url,
            None => bail!("Track {} has no download URL", detail.id),
        };

        let finished = Rc::new(RefCell::new(None));
        {
            let finished = finished.clone();
            bridge.submit_with(
                Operation::Download {
                    url,
                    destination: PathBuf::from(detail.suggested_file_name()),
                },
                move |_, result| {
                    if let TaskResult::Download(report) = result {
                        *finished.borrow_mut() = Some(report);
                    }
                },
            )?;
        }

        let report = loop {
            bridge.wait_and_dispatch(Duration::from_millis(100));
            if let Some(report) = finished.borrow_mut().take() {
                break report;
            }
        };
        let report = report.context("Download failed")?;
        eprintln!();
        println!("Saved {} ({} bytes)", report.path.display(), report.bytes_written);
    }

    bridge.shutdown();
    Ok(())
}
