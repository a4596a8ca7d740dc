//! Catalog collaborator boundary.
//!
//! The core never talks to the catalog wire protocol. Everything it needs is
//! expressed as the traits below, taking and returning typed values that an
//! adapter validates once when it decodes the catalog's responses.

mod dir;
mod reference;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use dir::DirCatalog;
pub use reference::{AlbumRef, AudioFormat, Bitrate, DownloadRequest};

/// One entry of an album's track list: catalog id plus byte size for the chosen bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackRef {
    pub id: u64,
    pub size: u64,
}

/// Album as resolved from the catalog for a given bitrate.
#[derive(Debug, Clone)]
pub struct AlbumInfo {
    pub title: String,
    pub artist: String,
    pub explicit: bool,
    /// Ordered as on the release.
    pub tracks: Vec<TrackRef>,
}

/// Per-track descriptive data, used for naming and for the secondary lyrics lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub track_number: u32,
    #[serde(default)]
    pub track_count: u32,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub duration_secs: u32,
}

/// Raw audio plus what the catalog told us about it.
#[derive(Debug, Clone)]
pub struct TrackPayload {
    pub data: Vec<u8>,
    pub format: AudioFormat,
    pub meta: TrackMetadata,
}

/// One timed lyric line; `timestamp` is already in LRC form (`[mm:ss.xx]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedLine {
    pub timestamp: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lyrics {
    #[serde(default)]
    pub plain: String,
    #[serde(default)]
    pub synced: Vec<SyncedLine>,
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn resolve_album(&self, album: &AlbumRef, bitrate: Bitrate) -> Result<AlbumInfo>;

    async fn fetch_track(&self, track_id: u64, bitrate: Bitrate) -> Result<TrackPayload>;

    async fn fetch_lyrics(&self, track_id: u64) -> Result<Option<Lyrics>>;

    /// Square cover art at roughly `resolution` pixels per edge.
    async fn fetch_art(&self, album: &AlbumRef, resolution: u32) -> Result<Vec<u8>>;
}

/// Session/credential validity, owned by whoever manages authentication.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    async fn is_credential_valid(&self) -> bool;
}

/// Secondary lyrics provider, consulted when the catalog has none or only partial lyrics.
#[async_trait]
pub trait LyricsSource: Send + Sync {
    async fn find_lyrics(&self, meta: &TrackMetadata) -> Result<Option<Lyrics>>;
}

/// Embeds tags (and plain lyrics) into a written audio file.
#[async_trait]
pub trait TagWriter: Send + Sync {
    async fn apply(&self, path: &Path, meta: &TrackMetadata, plain_lyrics: &str) -> Result<()>;
}

/// Tag writer that leaves files untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTags;

#[async_trait]
impl TagWriter for NoTags {
    async fn apply(&self, _path: &Path, _meta: &TrackMetadata, _plain_lyrics: &str) -> Result<()> {
        Ok(())
    }
}

/// Validator for catalogs that need no credential.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysValid;

#[async_trait]
impl SessionValidator for AlwaysValid {
    async fn is_credential_valid(&self) -> bool {
        true
    }
}
