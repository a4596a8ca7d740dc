//! `albumdl fetch` – queue albums from a catalog directory and download them.

use albumdl_core::catalog::{Bitrate, DirCatalog, DownloadRequest};
use albumdl_core::config::AppConfig;
use albumdl_core::job::Collaborators;
use albumdl_core::layout::TemplateLayout;
use albumdl_core::status::{ProgressStats, QueueEntry};
use albumdl_core::{DownloadService, JobStatus};
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const PRINT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct FetchArgs {
    pub references: Vec<String>,
    pub catalog: PathBuf,
    pub bitrate: Bitrate,
    pub download_dir: PathBuf,
    pub delete_on_interrupt: bool,
}

pub async fn run_fetch(cfg: &AppConfig, args: FetchArgs) -> Result<()> {
    let catalog = Arc::new(DirCatalog::new(&args.catalog));
    let collaborators = Collaborators::new(Arc::clone(&catalog) as _)
        .with_validator(catalog as _)
        .with_layout(Arc::new(TemplateLayout::from(&cfg.layout)));
    let svc = DownloadService::new(cfg, args.download_dir.clone(), collaborators);
    svc.start();

    let mut jobs = Vec::new();
    for reference in &args.references {
        let request = DownloadRequest::new(reference.clone()).with_bitrate(args.bitrate);
        match svc.enqueue(&request).await {
            Ok(id) => jobs.extend(svc.job(id.as_str())),
            Err(e) => eprintln!("skipping {}: {:#}", reference, e),
        }
    }
    if jobs.is_empty() {
        svc.shutdown().await;
        bail!("no albums queued");
    }
    println!(
        "queued {} album(s) into {}",
        jobs.len(),
        args.download_dir.display()
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(PRINT_INTERVAL);
    let interrupted = loop {
        tokio::select! {
            _ = &mut ctrl_c => break true,
            _ = ticker.tick() => {
                let entries = svc.list_jobs();
                print_table(&entries);
                if entries.iter().all(|e| e.job.status.is_terminal()) {
                    break false;
                }
            }
        }
    };

    if interrupted {
        println!("interrupted; stopping outstanding jobs");
        for job in &jobs {
            let id = job.id().as_str();
            if !args.delete_on_interrupt {
                svc.remove_job(id);
            } else if job.status() != JobStatus::Completed {
                if let Err(e) = svc.remove_job_and_data(id).await {
                    eprintln!("{:#}", e);
                }
            }
        }
    }
    svc.shutdown().await;

    let failed: Vec<_> = jobs
        .iter()
        .filter(|j| j.status() == JobStatus::Failed)
        .collect();
    for job in &failed {
        let reason = job
            .last_error()
            .unwrap_or_else(|| format!("{} track(s) failed", job.failed_tracks()));
        eprintln!("{} - {}: {}", job.artist(), job.title(), reason);
    }
    if interrupted {
        bail!("interrupted");
    }
    if !failed.is_empty() {
        bail!("{} of {} album(s) failed", failed.len(), jobs.len());
    }
    Ok(())
}

fn print_table(entries: &[QueueEntry]) {
    println!(
        "{:<36} {:<12} {:>6} {:>8} {}",
        "ID", "STATE", "DONE", "ETA", "TITLE"
    );
    for e in entries {
        let pct = ProgressStats::from_snapshot(&e.job).fraction() * 100.0;
        let eta = e
            .remaining
            .map(|d| format!("{}s", d.as_secs()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<36} {:<12} {:>5.1}% {:>8} {}",
            e.job.id.as_str(),
            e.job.status.to_string(),
            pct,
            eta,
            e.job.display_title()
        );
    }
}
