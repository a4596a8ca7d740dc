//! Output layout: where a track lands on disk.
//!
//! The default `TemplateLayout` fills `%placeholder%` templates from the
//! track's metadata. Each substituted value is sanitized on its own, so a
//! title containing `/` can never create extra directories.

mod sanitize;

use sanitize::{truncate_on_char_boundary, NAME_MAX};

use std::path::{Path, PathBuf};

use crate::catalog::{AudioFormat, TrackMetadata};
use crate::config::LayoutConfig;

pub use sanitize::sanitize_component;

pub trait OutputLayout: Send + Sync {
    /// Full path of the audio file for `meta` under `root`.
    fn track_path(&self, root: &Path, meta: &TrackMetadata, format: AudioFormat) -> PathBuf;
}

/// Placeholders: `%title% %album% %albumartist% %artist% %track% %trackcount% %year% %ext%`.
/// `%track%` is zero-padded to two digits.
#[derive(Debug, Clone)]
pub struct TemplateLayout {
    folder_template: String,
    file_template: String,
}

impl TemplateLayout {
    pub fn new(folder_template: impl Into<String>, file_template: impl Into<String>) -> Self {
        Self {
            folder_template: folder_template.into(),
            file_template: file_template.into(),
        }
    }

    fn placeholder(name: &str, meta: &TrackMetadata, ext: &str) -> Option<String> {
        let value = match name {
            "albumartist" => meta.album_artist.clone(),
            "artist" => meta.artist.clone(),
            "album" => meta.album.clone(),
            "title" => meta.title.clone(),
            "trackcount" => meta.track_count.to_string(),
            "track" => format!("{:02}", meta.track_number),
            "year" => meta.year.map(|y| y.to_string()).unwrap_or_default(),
            "ext" => ext.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Expands placeholders in one left-to-right pass. Substituted values are
    /// never scanned again; unknown `%name%` sequences are kept as written.
    fn fill(template: &str, meta: &TrackMetadata, ext: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('%') else {
                rest = &rest[start..];
                break;
            };
            match Self::placeholder(&after[..end], meta, ext) {
                Some(value) => {
                    out.push_str(&sanitize_component(&value));
                    rest = &after[end + 1..];
                }
                None => {
                    // keep the text, rescan from the closing '%'
                    out.push('%');
                    out.push_str(&after[..end]);
                    rest = &after[end..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl From<&LayoutConfig> for TemplateLayout {
    fn from(cfg: &LayoutConfig) -> Self {
        Self::new(cfg.folder_template.clone(), cfg.file_template.clone())
    }
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self::from(&LayoutConfig::default())
    }
}

impl OutputLayout for TemplateLayout {
    fn track_path(&self, root: &Path, meta: &TrackMetadata, format: AudioFormat) -> PathBuf {
        let ext = format.extension();
        let mut path = root.to_path_buf();
        for component in Self::fill(&self.folder_template, meta, ext).split('/') {
            if component.trim().is_empty() {
                continue;
            }
            path.push(sanitize_component(component));
        }
        let stem = sanitize_component(&Self::fill(&self.file_template, meta, ext));
        let stem = truncate_on_char_boundary(&stem, NAME_MAX.saturating_sub(ext.len() + 1));
        path.push(format!("{}.{}", stem, ext));
        path
    }
}

/// Sidecar path for synced lyrics next to the audio file.
pub fn lrc_path(track_path: &Path) -> PathBuf {
    track_path.with_extension("lrc")
}
