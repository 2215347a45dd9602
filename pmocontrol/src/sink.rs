//! Audio output contract.
//!
//! The voice transport is opaque to this crate: a guild gets one
//! [`AudioSink`] from the [`SinkFactory`] and the driver only ever talks to it
//! through these methods.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::Result;

/// Called by the sink when a track finishes on its own.
///
/// Fires at most once per [`AudioSink::play`] call, and never after
/// [`AudioSink::stop`].
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Joins the given voice channel.
    async fn connect(&self, channel_id: u64) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    /// Starts playing a local audio file, replacing whatever was playing.
    async fn play(&self, path: &Path, on_complete: CompletionCallback) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn resume(&self) -> Result<()>;

    /// Stops playback; the pending completion callback is dropped.
    async fn stop(&self) -> Result<()>;

    fn is_playing(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Output volume, 0.0 to 1.0.
    async fn set_volume(&self, volume: f32) -> Result<()>;
}

/// Builds the sink of a guild. Called once, when its player is spawned.
pub trait SinkFactory: Send + Sync {
    fn create(&self, guild_id: u64) -> Arc<dyn AudioSink>;
}
