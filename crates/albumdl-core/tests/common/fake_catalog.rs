//! In-memory catalog for integration tests.
//!
//! Albums are registered with their track sizes; track ids are
//! `album_id * 100 + position`. Individual tracks can be made to fail, panic,
//! or wait on a gate. Every `fetch_track` call is counted per album so tests
//! can check how many jobs and track units ran at once.

use albumdl_core::catalog::{
    AlbumInfo, AlbumRef, AudioFormat, Bitrate, CatalogClient, Lyrics, SessionValidator,
    TrackMetadata, TrackPayload, TrackRef,
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Default)]
struct Concurrency {
    per_album: HashMap<u64, usize>,
    max_per_album: HashMap<u64, usize>,
    max_albums: usize,
}

pub struct FakeCatalog {
    albums: Mutex<HashMap<u64, Vec<u64>>>,
    failing: Mutex<HashSet<u64>>,
    panicking: Mutex<HashSet<u64>>,
    gated: Mutex<HashSet<u64>>,
    /// Gated tracks wait for a permit here.
    pub gate: Semaphore,
    delay: Duration,
    stats: Mutex<Concurrency>,
    pub fetches: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Every `fetch_track` sleeps for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            albums: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            panicking: Mutex::new(HashSet::new()),
            gated: Mutex::new(HashSet::new()),
            gate: Semaphore::new(0),
            delay,
            stats: Mutex::new(Concurrency::default()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn track_id(album: u64, position: u64) -> u64 {
        album * 100 + position
    }

    pub fn add_album(&self, album: u64, sizes: &[u64]) {
        self.albums.lock().unwrap().insert(album, sizes.to_vec());
    }

    pub fn fail_track(&self, album: u64, position: u64) {
        self.failing
            .lock()
            .unwrap()
            .insert(Self::track_id(album, position));
    }

    pub fn panic_track(&self, album: u64, position: u64) {
        self.panicking
            .lock()
            .unwrap()
            .insert(Self::track_id(album, position));
    }

    pub fn gate_track(&self, album: u64, position: u64) {
        self.gated
            .lock()
            .unwrap()
            .insert(Self::track_id(album, position));
    }

    pub fn max_albums_in_flight(&self) -> usize {
        self.stats.lock().unwrap().max_albums
    }

    pub fn max_tracks_in_flight(&self, album: u64) -> usize {
        self.stats
            .lock()
            .unwrap()
            .max_per_album
            .get(&album)
            .copied()
            .unwrap_or(0)
    }

    fn enter(&self, album: u64) {
        let mut stats = self.stats.lock().unwrap();
        let now = {
            let n = stats.per_album.entry(album).or_insert(0);
            *n += 1;
            *n
        };
        let max = stats.max_per_album.entry(album).or_insert(0);
        *max = (*max).max(now);
        let albums = stats.per_album.values().filter(|&&n| n > 0).count();
        stats.max_albums = stats.max_albums.max(albums);
    }

    fn leave(&self, album: u64) {
        let mut stats = self.stats.lock().unwrap();
        if let Some(n) = stats.per_album.get_mut(&album) {
            *n -= 1;
        }
    }
}

/// Decrements the in-flight counter even when the fetch future is dropped.
struct InFlight<'a> {
    catalog: &'a FakeCatalog,
    album: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.catalog.leave(self.album);
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn resolve_album(&self, album: &AlbumRef, _bitrate: Bitrate) -> Result<AlbumInfo> {
        let id: u64 = album.id().parse()?;
        let sizes = self
            .albums
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("album {} not found", id))?;
        Ok(AlbumInfo {
            title: format!("Album {}", id),
            artist: "Fake Artist".into(),
            explicit: false,
            tracks: sizes
                .iter()
                .enumerate()
                .map(|(i, &size)| TrackRef {
                    id: Self::track_id(id, i as u64 + 1),
                    size,
                })
                .collect(),
        })
    }

    async fn fetch_track(&self, track_id: u64, _bitrate: Bitrate) -> Result<TrackPayload> {
        let album = track_id / 100;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.enter(album);
        let _in_flight = InFlight {
            catalog: self,
            album,
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.gated.lock().unwrap().contains(&track_id) {
            self.gate.acquire().await?.forget();
        }
        if self.panicking.lock().unwrap().contains(&track_id) {
            panic!("fake catalog exploded on track {}", track_id);
        }
        if self.failing.lock().unwrap().contains(&track_id) {
            bail!("server error for track {}", track_id);
        }
        Ok(TrackPayload {
            data: track_id.to_le_bytes().to_vec(),
            format: AudioFormat::Mp3,
            meta: TrackMetadata {
                title: format!("Track {}", track_id % 100),
                artist: "Fake Artist".into(),
                album: format!("Album {}", album),
                album_artist: "Fake Artist".into(),
                track_number: (track_id % 100) as u32,
                ..Default::default()
            },
        })
    }

    async fn fetch_lyrics(&self, _track_id: u64) -> Result<Option<Lyrics>> {
        Ok(None)
    }

    async fn fetch_art(&self, _album: &AlbumRef, _resolution: u32) -> Result<Vec<u8>> {
        bail!("no art in fake catalog")
    }
}

/// Validator whose answer can be flipped at runtime; optionally panics once.
#[derive(Default)]
pub struct ToggleValidator {
    pub invalid: AtomicBool,
    pub panic_once: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl SessionValidator for ToggleValidator {
    async fn is_credential_valid(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_once.swap(false, Ordering::SeqCst) {
            panic!("session store unavailable");
        }
        !self.invalid.load(Ordering::SeqCst)
    }
}
