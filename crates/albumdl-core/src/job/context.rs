//! Everything a running job needs besides the job itself.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{AlwaysValid, CatalogClient, LyricsSource, NoTags, SessionValidator, TagWriter};
use crate::config::AppConfig;
use crate::layout::{OutputLayout, TemplateLayout};
use crate::sink::{FileSink, LocalFs};

/// Injected collaborators. Only the catalog is mandatory; the rest default to
/// local disk, the default naming template, no tagging and no secondary lyrics.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogClient>,
    pub validator: Arc<dyn SessionValidator>,
    pub sink: Arc<dyn FileSink>,
    pub layout: Arc<dyn OutputLayout>,
    pub tags: Arc<dyn TagWriter>,
    pub secondary_lyrics: Option<Arc<dyn LyricsSource>>,
}

impl Collaborators {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self {
            catalog,
            validator: Arc::new(AlwaysValid),
            sink: Arc::new(LocalFs),
            layout: Arc::new(TemplateLayout::default()),
            tags: Arc::new(NoTags),
            secondary_lyrics: None,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn SessionValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn FileSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_layout(mut self, layout: Arc<dyn OutputLayout>) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_tags(mut self, tags: Arc<dyn TagWriter>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_secondary_lyrics(mut self, source: Arc<dyn LyricsSource>) -> Self {
        self.secondary_lyrics = Some(source);
        self
    }
}

/// Per-job execution knobs, derived from `AppConfig`.
#[derive(Debug, Clone)]
pub struct ExecSettings {
    pub download_dir: PathBuf,
    /// Track units in flight per job (T). Values below 1 are treated as 1.
    pub max_concurrent_tracks: usize,
    pub fetch_lyrics: bool,
    pub save_synced_lyrics: bool,
    pub use_secondary_lyrics: bool,
    pub cover_art_resolution: Option<u32>,
    pub track_timeout: Option<Duration>,
}

impl ExecSettings {
    pub fn from_config(cfg: &AppConfig, download_dir: PathBuf) -> Self {
        Self {
            download_dir,
            max_concurrent_tracks: cfg.max_concurrent_tracks,
            fetch_lyrics: cfg.lyrics.fetch,
            save_synced_lyrics: cfg.lyrics.save_synced,
            use_secondary_lyrics: cfg.lyrics.use_secondary,
            cover_art_resolution: cfg.cover_art_resolution,
            track_timeout: cfg.track_timeout(),
        }
    }
}

impl Default for ExecSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default(), PathBuf::from("."))
    }
}

pub struct ExecContext {
    pub collaborators: Collaborators,
    pub settings: ExecSettings,
}

impl ExecContext {
    pub fn new(collaborators: Collaborators, settings: ExecSettings) -> Self {
        Self {
            collaborators,
            settings,
        }
    }
}
