//! Directory-backed catalog: a local mirror laid out as
//!
//! ```text
//! <root>/albums/<album>.json   {"title", "artist", "explicit", "tracks": [id, ...]}
//! <root>/tracks/<id>.json      TrackMetadata
//! <root>/tracks/<id>.flac|mp3  audio
//! <root>/lyrics/<id>.json      Lyrics (optional)
//! <root>/art/<album>.jpg       cover (optional)
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{
    AlbumInfo, AlbumRef, Bitrate, CatalogClient, Lyrics, SessionValidator, TrackMetadata,
    TrackPayload, TrackRef,
};

#[derive(Debug, Deserialize)]
struct AlbumManifest {
    title: String,
    artist: String,
    #[serde(default)]
    explicit: bool,
    tracks: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct DirCatalog {
    root: PathBuf,
}

impl DirCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn audio_path(&self, track_id: u64, bitrate: Bitrate) -> PathBuf {
        self.root
            .join("tracks")
            .join(format!("{}.{}", track_id, bitrate.format().extension()))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parse {}", path.display()))
}

#[async_trait]
impl CatalogClient for DirCatalog {
    async fn resolve_album(&self, album: &AlbumRef, bitrate: Bitrate) -> Result<AlbumInfo> {
        let manifest_path = self.root.join("albums").join(format!("{}.json", album.id()));
        let manifest: AlbumManifest = read_json(&manifest_path).await?;

        let mut tracks = Vec::with_capacity(manifest.tracks.len());
        for id in manifest.tracks {
            // A missing audio file resolves to size 0 and fails later as a track error.
            let size = match tokio::fs::metadata(self.audio_path(id, bitrate)).await {
                Ok(m) => m.len(),
                Err(e) => {
                    tracing::debug!(track_id = id, "no audio for {}: {}", bitrate, e);
                    0
                }
            };
            tracks.push(TrackRef { id, size });
        }

        Ok(AlbumInfo {
            title: manifest.title,
            artist: manifest.artist,
            explicit: manifest.explicit,
            tracks,
        })
    }

    async fn fetch_track(&self, track_id: u64, bitrate: Bitrate) -> Result<TrackPayload> {
        let meta_path = self.root.join("tracks").join(format!("{}.json", track_id));
        let meta: TrackMetadata = read_json(&meta_path).await?;
        let audio_path = self.audio_path(track_id, bitrate);
        let data = tokio::fs::read(&audio_path)
            .await
            .with_context(|| format!("read {}", audio_path.display()))?;
        Ok(TrackPayload {
            data,
            format: bitrate.format(),
            meta,
        })
    }

    async fn fetch_lyrics(&self, track_id: u64) -> Result<Option<Lyrics>> {
        let path = self.root.join("lyrics").join(format!("{}.json", track_id));
        if tokio::fs::metadata(&path).await.is_err() {
            return Ok(None);
        }
        read_json(&path).await.map(Some)
    }

    async fn fetch_art(&self, album: &AlbumRef, _resolution: u32) -> Result<Vec<u8>> {
        let path = self.root.join("art").join(format!("{}.jpg", album.id()));
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("read {}", path.display()))
    }
}

#[async_trait]
impl SessionValidator for DirCatalog {
    /// The mirror needs no credential; it is usable while its album index is readable.
    async fn is_credential_valid(&self) -> bool {
        tokio::fs::metadata(self.root.join("albums"))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }
}
