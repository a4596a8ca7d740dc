//! One track unit: fetch, place, write, annotate.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use super::{ExecContext, Job};
use crate::catalog::{Lyrics, TrackMetadata, TrackRef};
use crate::error::TrackError;
use crate::layout::lrc_path;
use crate::lyrics::{fill_gaps, needs_secondary, render_lrc};

const COVER_ART_FILE: &str = "folder.jpg";

/// Runs one track to completion, racing the job's cancel token.
///
/// Cancellation wins ties, so a unit observed after removal never reports success.
pub(crate) async fn run_track_unit(
    job: &Job,
    ctx: &ExecContext,
    track: TrackRef,
    cancel: &CancellationToken,
) -> Result<(), TrackError> {
    if cancel.is_cancelled() {
        return Err(TrackError::Canceled(track.id));
    }
    let work = async {
        match ctx.settings.track_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, download_track(job, ctx, track.id)).await {
                    Ok(res) => res,
                    Err(_) => Err(anyhow!("timed out after {:?}", limit)),
                }
            }
            None => download_track(job, ctx, track.id).await,
        }
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TrackError::Canceled(track.id)),
        res = work => res.map_err(|e| TrackError::transient(track.id, e)),
    }
}

async fn download_track(job: &Job, ctx: &ExecContext, track_id: u64) -> Result<()> {
    let c = &ctx.collaborators;
    let s = &ctx.settings;

    let payload = c
        .catalog
        .fetch_track(track_id, job.bitrate())
        .await
        .context("fetch track")?;

    let out_path = c.layout.track_path(&s.download_dir, &payload.meta, payload.format);
    let folder = out_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| s.download_dir.clone());
    c.sink.create_dir_all(&folder).await?;
    job.set_download_folder(&folder);

    if let Some(resolution) = s.cover_art_resolution {
        if job.claim_art() {
            save_cover_art(job, ctx, &folder, resolution).await;
        }
    }

    c.sink.write(&out_path, &payload.data).await?;

    let lyrics = gather_lyrics(ctx, track_id, &payload.meta).await;
    c.tags
        .apply(&out_path, &payload.meta, &lyrics.plain)
        .await
        .context("apply tags")?;

    if s.save_synced_lyrics && !lyrics.synced.is_empty() {
        let lrc = render_lrc(&lyrics.synced);
        c.sink.write(&lrc_path(&out_path), lrc.as_bytes()).await?;
    }

    tracing::debug!(
        "job {} track {} written to {}",
        job.id(),
        track_id,
        out_path.display()
    );
    Ok(())
}

/// Cover art is best effort: a failure is logged and the track continues.
async fn save_cover_art(job: &Job, ctx: &ExecContext, folder: &Path, resolution: u32) {
    let c = &ctx.collaborators;
    let target = folder.join(COVER_ART_FILE);
    if c.sink.exists(&target).await {
        return;
    }
    let result = async {
        let art = c.catalog.fetch_art(job.album(), resolution).await?;
        c.sink.write(&target, &art).await
    }
    .await;
    if let Err(e) = result {
        tracing::warn!("job {} cover art not saved: {:#}", job.id(), e);
    }
}

/// Catalog lyrics first, then the secondary source for whatever is missing.
/// Lookup failures are logged; lyrics never fail a track.
async fn gather_lyrics(ctx: &ExecContext, track_id: u64, meta: &TrackMetadata) -> Lyrics {
    let s = &ctx.settings;
    let mut lyrics = Lyrics::default();
    if !s.fetch_lyrics {
        return lyrics;
    }

    match ctx.collaborators.catalog.fetch_lyrics(track_id).await {
        Ok(Some(found)) => {
            lyrics.plain = found.plain;
            if s.save_synced_lyrics {
                lyrics.synced = found.synced;
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("track {} catalog lyrics: {:#}", track_id, e),
    }

    if !s.use_secondary_lyrics || !needs_secondary(&lyrics, s.save_synced_lyrics) {
        return lyrics;
    }
    if let Some(source) = &ctx.collaborators.secondary_lyrics {
        match source.find_lyrics(meta).await {
            Ok(Some(found)) => fill_gaps(&mut lyrics, found, s.save_synced_lyrics),
            Ok(None) => {}
            Err(e) => tracing::warn!("track {} secondary lyrics: {:#}", track_id, e),
        }
    }
    lyrics
}
