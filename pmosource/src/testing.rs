//! In-memory source for tests
//!
//! [`FakeSource`] knows a fixed set of tracks, counts every call and can be
//! told to fail a given reference, which is what the prefetch and cache
//! tests need to observe coalescing and failure isolation.

use crate::{AudioDownloader, MetadataFetcher, Result, SourceError, TrackMetadata, stem_name};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct FakeState {
    tracks: HashMap<String, TrackMetadata>,
    failing: HashSet<String>,
    fetch_calls: HashMap<String, usize>,
    download_calls: HashMap<String, usize>,
}

#[derive(Default)]
pub struct FakeSource {
    state: Mutex<FakeState>,
    download_delay: Option<Duration>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every download sleeps this long before writing its file
    pub fn with_download_delay(mut self, delay: Duration) -> Self {
        self.download_delay = Some(delay);
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Registers a track; `track_ref` is what gets queued, `id` names the file
    pub fn add_track(&self, track_ref: &str, id: &str) -> TrackMetadata {
        let meta = TrackMetadata {
            id: id.to_string(),
            title: format!("Track {id}"),
            duration_secs: 180,
            url: track_ref.to_string(),
        };
        self.state()
            .tracks
            .insert(track_ref.to_string(), meta.clone());
        meta
    }

    /// Makes fetch and download of `track_ref` fail with a network error
    pub fn fail_track(&self, track_ref: &str) {
        self.state().failing.insert(track_ref.to_string());
    }

    pub fn heal_track(&self, track_ref: &str) {
        self.state().failing.remove(track_ref);
    }

    pub fn fetch_calls(&self, track_ref: &str) -> usize {
        self.state().fetch_calls.get(track_ref).copied().unwrap_or(0)
    }

    pub fn download_calls(&self, track_ref: &str) -> usize {
        self.state().download_calls.get(track_ref).copied().unwrap_or(0)
    }

    pub fn total_downloads(&self) -> usize {
        self.state().download_calls.values().sum()
    }

    fn lookup(&self, track_ref: &str) -> Result<TrackMetadata> {
        let state = self.state();
        if state.failing.contains(track_ref) {
            return Err(SourceError::Network(format!("unreachable: {track_ref}")));
        }
        state
            .tracks
            .get(track_ref)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(track_ref.to_string()))
    }
}

#[async_trait]
impl MetadataFetcher for FakeSource {
    async fn fetch(&self, track_ref: &str) -> Result<TrackMetadata> {
        *self
            .state()
            .fetch_calls
            .entry(track_ref.to_string())
            .or_default() += 1;
        self.lookup(track_ref)
    }
}

#[async_trait]
impl AudioDownloader for FakeSource {
    async fn download(&self, track_ref: &str, dest_stem: &Path) -> Result<PathBuf> {
        *self
            .state()
            .download_calls
            .entry(track_ref.to_string())
            .or_default() += 1;

        if let Some(delay) = self.download_delay {
            tokio::time::sleep(delay).await;
        }
        self.lookup(track_ref)?;

        let stem = stem_name(dest_stem)?;
        let tmp = dest_stem.with_file_name(format!(".{stem}.download"));
        let dest = dest_stem.with_file_name(format!("{stem}.mp3"));

        tokio::fs::write(&tmp, format!("audio:{track_ref}")).await?;
        tokio::fs::rename(&tmp, &dest).await?;
        Ok(dest)
    }
}
