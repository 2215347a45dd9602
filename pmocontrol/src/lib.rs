//! Playback control for guild queues.
//!
//! [`PlaybackDriver`] runs one player actor per guild on top of the
//! `pmoplaylist` sessions: it plays the current track through the guild's
//! [`AudioSink`], advances the queue when a track completes, keeps the
//! prefetch window warm, and evicts guilds that stay idle.

mod driver;
mod errors;
mod player;
mod progress;
mod sink;

#[cfg(feature = "pmoconfig")]
mod config_ext;

pub use driver::{DEFAULT_IDLE_TIMEOUT, DEFAULT_SWEEP_INTERVAL, PlaybackDriver};
pub use errors::{ControlError, Result};
pub use player::{PlaybackState, PlayerStatus};
pub use progress::{ProgressTracker, format_duration};
pub use sink::{AudioSink, CompletionCallback, SinkFactory};

#[cfg(feature = "pmoconfig")]
pub use config_ext::PlayerConfigExt;
