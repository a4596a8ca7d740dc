use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lyrics handling (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Ask the catalog for lyrics at all.
    pub fetch: bool,
    /// Write a `.lrc` sidecar when synced lines are available.
    pub save_synced: bool,
    /// Consult the secondary lyrics source when the catalog's lyrics are missing or incomplete.
    pub use_secondary: bool,
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            fetch: true,
            save_synced: false,
            use_secondary: false,
        }
    }
}

/// Output naming templates. See `layout::TemplateLayout` for placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub folder_template: String,
    pub file_template: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            folder_template: "%albumartist%/%album%".to_string(),
            file_template: "%track% - %title%".to_string(),
        }
    }
}

/// Global configuration loaded from `~/.config/albumdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Capacity of the submission queue; enqueue waits when it is full.
    pub queue_capacity: usize,
    /// Maximum number of album jobs executing at once.
    pub max_concurrent_jobs: usize,
    /// Maximum number of track downloads running at once inside one job.
    pub max_concurrent_tracks: usize,
    /// Minimum seconds between credential validity checks for a job.
    pub validity_check_interval_secs: u64,
    /// Root output directory (None = current directory at run time).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Optional per-track timeout in seconds. None keeps track units unbounded.
    #[serde(default)]
    pub track_timeout_secs: Option<u64>,
    /// Cover art edge size in pixels; when set, `folder.jpg` is written once per album folder.
    #[serde(default)]
    pub cover_art_resolution: Option<u32>,
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 500,
            max_concurrent_jobs: 3,
            max_concurrent_tracks: 3,
            validity_check_interval_secs: 30 * 60,
            download_dir: None,
            track_timeout_secs: None,
            cover_art_resolution: None,
            lyrics: LyricsConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validity_check_interval(&self) -> Duration {
        Duration::from_secs(self.validity_check_interval_secs)
    }

    pub fn track_timeout(&self) -> Option<Duration> {
        self.track_timeout_secs.map(Duration::from_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("albumdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<AppConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = AppConfig::default();
        let toml = render(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Config as it would be written to disk.
pub fn render(cfg: &AppConfig) -> Result<String> {
    Ok(toml::to_string_pretty(cfg)?)
}

/// Load configuration from an explicit path (no default file is created).
pub fn load_from(path: &Path) -> Result<AppConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.queue_capacity, 500);
        assert_eq!(cfg.max_concurrent_jobs, 3);
        assert_eq!(cfg.max_concurrent_tracks, 3);
        assert_eq!(cfg.validity_check_interval(), Duration::from_secs(1800));
        assert!(cfg.track_timeout().is_none());
        assert!(cfg.lyrics.fetch);
        assert!(!cfg.lyrics.save_synced);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = AppConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: AppConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.queue_capacity, cfg.queue_capacity);
        assert_eq!(parsed.max_concurrent_jobs, cfg.max_concurrent_jobs);
        assert_eq!(parsed.layout.file_template, cfg.layout.file_template);
    }

    #[test]
    fn config_toml_sections_are_optional() {
        let toml = r#"
            queue_capacity = 10
            max_concurrent_jobs = 1
            max_concurrent_tracks = 2
            validity_check_interval_secs = 60
        "#;
        let cfg: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.queue_capacity, 10);
        assert_eq!(cfg.max_concurrent_tracks, 2);
        assert!(cfg.download_dir.is_none());
        assert!(cfg.cover_art_resolution.is_none());
        assert_eq!(cfg.layout.folder_template, "%albumartist%/%album%");
    }

    #[test]
    fn config_toml_custom_sections() {
        let toml = r#"
            queue_capacity = 500
            max_concurrent_jobs = 3
            max_concurrent_tracks = 3
            validity_check_interval_secs = 1800
            download_dir = "/srv/music"
            track_timeout_secs = 120
            cover_art_resolution = 1024

            [lyrics]
            fetch = true
            save_synced = true
            use_secondary = true

            [layout]
            folder_template = "%artist%"
            file_template = "%title%"
        "#;
        let cfg: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.download_dir.as_deref(), Some(Path::new("/srv/music")));
        assert_eq!(cfg.track_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(cfg.cover_art_resolution, Some(1024));
        assert!(cfg.lyrics.save_synced && cfg.lyrics.use_secondary);
        assert_eq!(cfg.layout.folder_template, "%artist%");
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, toml::to_string_pretty(&AppConfig::default()).unwrap()).unwrap();
        let cfg = load_from(&path).unwrap();
        assert_eq!(cfg.queue_capacity, 500);
    }
}
