//! Download requests: album reference parsing and quality selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ResolveError;

/// Quality variant requested from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bitrate {
    Mp3_128,
    Mp3_320,
    Flac,
}

impl Bitrate {
    /// Picks the bitrate an indexer release advertises: FLAC codec wins, then a "320" container.
    pub fn from_release(codec: Option<&str>, container: Option<&str>) -> Self {
        if codec.is_some_and(|c| c.eq_ignore_ascii_case("flac")) {
            Bitrate::Flac
        } else if container.is_some_and(|c| c.trim() == "320") {
            Bitrate::Mp3_320
        } else {
            Bitrate::Mp3_128
        }
    }

    pub fn format(self) -> AudioFormat {
        match self {
            Bitrate::Flac => AudioFormat::Flac,
            Bitrate::Mp3_128 | Bitrate::Mp3_320 => AudioFormat::Mp3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Bitrate::Mp3_128 => "MP3 128",
            Bitrate::Mp3_320 => "MP3 320",
            Bitrate::Flac => "FLAC",
        }
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Bitrate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flac" => Ok(Bitrate::Flac),
            "320" | "mp3_320" => Ok(Bitrate::Mp3_320),
            "128" | "mp3_128" => Ok(Bitrate::Mp3_128),
            other => Err(format!("unknown bitrate '{}' (expected flac, 320 or 128)", other)),
        }
    }
}

/// Container format marker returned with track bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Flac,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
        }
    }
}

/// Catalog album identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlbumRef {
    id: String,
}

impl AlbumRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Accepts `album:<id>` or a catalog URL whose path contains `album/<id>`
    /// (locale prefixes such as `/en/album/123` are fine). Tracks, playlists
    /// and artists are rejected.
    pub fn parse(reference: &str) -> Result<Self, ResolveError> {
        let reference = reference.trim();
        let unsupported = || ResolveError::UnsupportedReference(reference.to_string());

        if let Some(id) = reference.strip_prefix("album:") {
            return valid_id(id).map(Self::new).ok_or_else(unsupported);
        }

        let url = url::Url::parse(reference).map_err(|_| unsupported())?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        segments
            .windows(2)
            .find(|w| w[0].eq_ignore_ascii_case("album"))
            .and_then(|w| valid_id(w[1]))
            .map(Self::new)
            .ok_or_else(unsupported)
    }
}

impl fmt::Display for AlbumRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "album:{}", self.id)
    }
}

fn valid_id(id: &str) -> Option<&str> {
    let id = id.trim();
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())).then_some(id)
}

/// What an indexer/download-client adapter submits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_bitrate(mut self, bitrate: Bitrate) -> Self {
        match bitrate {
            Bitrate::Flac => self.codec = Some("FLAC".to_string()),
            Bitrate::Mp3_320 => self.container = Some("320".to_string()),
            Bitrate::Mp3_128 => {}
        }
        self
    }

    pub fn bitrate(&self) -> Bitrate {
        Bitrate::from_release(self.codec.as_deref(), self.container.as_deref())
    }

    pub fn album(&self) -> Result<AlbumRef, ResolveError> {
        AlbumRef::parse(&self.url)
    }
}
