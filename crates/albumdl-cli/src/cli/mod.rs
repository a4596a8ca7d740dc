//! CLI for the albumdl album download queue.

mod commands;

use anyhow::Result;
use albumdl_core::catalog::Bitrate;
use albumdl_core::config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_config, run_fetch, FetchArgs};

/// Top-level CLI for albumdl.
#[derive(Debug, Parser)]
#[command(name = "albumdl")]
#[command(about = "albumdl: queued album downloads with per-track fan-out", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue one or more albums and download them, printing progress until all finish.
    Fetch {
        /// Album references: `album:<id>` or a catalog album URL.
        #[arg(required = true, value_name = "REFERENCE")]
        references: Vec<String>,

        /// Catalog directory (albums/, tracks/, lyrics/, art/).
        #[arg(long, value_name = "DIR")]
        catalog: PathBuf,

        /// Requested quality: flac, 320 or 128.
        #[arg(long, default_value = "128", value_name = "BITRATE")]
        bitrate: Bitrate,

        /// Where albums are written (default: config `download_dir`, else current dir).
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,

        /// Override `max_concurrent_jobs` from config.
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,

        /// Override `max_concurrent_tracks` from config.
        #[arg(long, value_name = "N")]
        tracks: Option<usize>,

        /// On Ctrl-C, also delete the album folders of unfinished jobs.
        #[arg(long)]
        delete_on_interrupt: bool,
    },

    /// Show the config file path and effective settings.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                references,
                catalog,
                bitrate,
                download_dir,
                jobs,
                tracks,
                delete_on_interrupt,
            } => {
                if let Some(jobs) = jobs {
                    cfg.max_concurrent_jobs = jobs;
                }
                if let Some(tracks) = tracks {
                    cfg.max_concurrent_tracks = tracks;
                }
                let download_dir = match download_dir.or_else(|| cfg.download_dir.clone()) {
                    Some(dir) => dir,
                    None => std::env::current_dir()?,
                };
                let args = FetchArgs {
                    references,
                    catalog,
                    bitrate,
                    download_dir,
                    delete_on_interrupt,
                };
                run_fetch(&cfg, args).await?;
            }
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
