//! # PMOSource
//!
//! Common traits and types for PMOMusic track sources.
//!
//! A source turns a track reference (the canonical URL a user queued) into
//! two things the rest of the workspace needs:
//!
//! - [`TrackMetadata`], through [`MetadataFetcher`]
//! - a local audio file, through [`AudioDownloader`]
//!
//! Both traits are object safe and used as `Arc<dyn ...>` by `pmoaudiocache`
//! and `pmoplaylist`. Concrete implementations live in their own crates
//! (`pmoyoutube`); the `testing` feature provides an in-memory
//! [`testing::FakeSource`] for the test suites of the dependent crates.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use async_trait::async_trait;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Descriptive metadata of a track
///
/// Immutable once fetched: the metadata cache never updates an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Short identifier provided by the source, used to name cached audio files
    pub id: String,
    pub title: String,
    pub duration_secs: u64,
    /// Canonical URL of the track
    pub url: String,
}

/// Error types for source operations
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Track not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from source: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Whether retrying later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Network(_) | SourceError::Io(_))
    }
}

/// Result type for source operations
pub type Result<T> = std::result::Result<T, SourceError>;

/// Resolves a track reference into its metadata
///
/// Implementations must be idempotent and callable concurrently; a call may
/// take several seconds.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, track_ref: &str) -> Result<TrackMetadata>;
}

/// Downloads the audio of a track reference
#[async_trait]
pub trait AudioDownloader: Send + Sync {
    /// Writes the audio to `{dest_stem}.{ext}` and returns that path
    ///
    /// The file must appear atomically: while the download is running,
    /// nothing matching `{dest_stem}.*` may be visible in the parent
    /// directory. A second download of the same track overwrites the first.
    async fn download(&self, track_ref: &str, dest_stem: &Path) -> Result<PathBuf>;
}

/// A source able to both describe and download tracks
pub trait TrackSource: MetadataFetcher + AudioDownloader {}

impl<T: MetadataFetcher + AudioDownloader> TrackSource for T {}

/// File name of `dest_stem` (the stable id), used by downloaders to build
/// temporary and final file names
pub fn stem_name(dest_stem: &Path) -> Result<String> {
    dest_stem
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid destination {}", dest_stem.display()),
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(SourceError::Network("timeout".into()).is_transient());
        assert!(SourceError::Io(std::io::Error::other("disk")).is_transient());
        assert!(!SourceError::NotFound("x".into()).is_transient());
        assert!(!SourceError::InvalidResponse("x".into()).is_transient());
    }

    #[test]
    fn stem_name_rejects_root() {
        assert_eq!(stem_name(Path::new("/tmp/cache/abc")).unwrap(), "abc");
        assert!(stem_name(Path::new("/")).is_err());
    }
}
