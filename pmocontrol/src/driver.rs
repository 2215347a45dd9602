//! Playback driver: one player per guild, plus the idle sweeper.
//!
//! The driver owns no queue state. It receives the [`PlaylistManager`]
//! registry at construction, asks it for sessions, and forwards each command
//! to the player actor of the guild (see [`crate::player`]).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pmoplaylist::{PlaylistManager, Prefetcher};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::errors::Result;
use crate::player::{Command, PlayerHandle, PlayerStatus};
use crate::sink::SinkFactory;

/// Inactivity after which a guild that is not playing is evicted.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);
/// Period of the idle sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct DriverInner {
    manager: PlaylistManager,
    prefetcher: Arc<Prefetcher>,
    sinks: Arc<dyn SinkFactory>,
    players: Mutex<HashMap<u64, PlayerHandle>>,
}

#[derive(Clone)]
pub struct PlaybackDriver {
    inner: Arc<DriverInner>,
}

impl PlaybackDriver {
    pub fn new(
        manager: PlaylistManager,
        prefetcher: Arc<Prefetcher>,
        sinks: Arc<dyn SinkFactory>,
    ) -> Self {
        Self {
            inner: Arc::new(DriverInner {
                manager,
                prefetcher,
                sinks,
                players: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn manager(&self) -> &PlaylistManager {
        &self.inner.manager
    }

    /// Guilds with a running player.
    pub async fn players(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.inner.players.lock().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    async fn player(&self, guild_id: u64) -> PlayerHandle {
        let mut players = self.inner.players.lock().await;
        players
            .entry(guild_id)
            .or_insert_with(|| {
                debug!(guild_id, "Spawning player");
                PlayerHandle::spawn(
                    guild_id,
                    self.inner.manager.clone(),
                    self.inner.prefetcher.clone(),
                    self.inner.sinks.create(guild_id),
                )
            })
            .clone()
    }

    async fn request(
        &self,
        guild_id: u64,
        make: impl FnOnce(oneshot::Sender<Result<PlayerStatus>>) -> Command,
    ) -> Result<PlayerStatus> {
        self.player(guild_id).await.request(guild_id, make).await?
    }

    /// Starts playing the current track in the given voice channel.
    ///
    /// The first play blocks until the track is downloaded when it is not
    /// cached yet. Resumes when paused; does nothing while playing.
    pub async fn play(&self, guild_id: u64, channel_id: u64) -> Result<PlayerStatus> {
        self.request(guild_id, |reply| Command::Play { channel_id, reply })
            .await
    }

    pub async fn pause(&self, guild_id: u64) -> Result<PlayerStatus> {
        self.request(guild_id, |reply| Command::Pause { reply }).await
    }

    pub async fn resume(&self, guild_id: u64) -> Result<PlayerStatus> {
        self.request(guild_id, |reply| Command::Resume { reply }).await
    }

    /// Stops playback and leaves the voice channel. The queue is untouched.
    pub async fn stop(&self, guild_id: u64) -> Result<PlayerStatus> {
        self.request(guild_id, |reply| Command::Stop { reply }).await
    }

    /// Moves to the next track, and plays it if something was playing.
    ///
    /// Skipping past the last track (without loop) stops playback and
    /// returns `PlaylistExhausted`.
    pub async fn skip(&self, guild_id: u64) -> Result<PlayerStatus> {
        self.request(guild_id, |reply| Command::Skip { reply }).await
    }

    pub async fn previous(&self, guild_id: u64) -> Result<PlayerStatus> {
        self.request(guild_id, |reply| Command::Previous { reply })
            .await
    }

    /// Sets the volume of the session (persisted) and of the sink.
    pub async fn set_volume(&self, guild_id: u64, volume: f32) -> Result<PlayerStatus> {
        self.request(guild_id, |reply| Command::SetVolume { volume, reply })
            .await
    }

    pub async fn status(&self, guild_id: u64) -> Result<PlayerStatus> {
        self.request(guild_id, |reply| Command::Status { reply }).await
    }

    /// Stops the player of the guild and drops it. Returns false when the
    /// guild had no player.
    pub async fn leave(&self, guild_id: u64) -> bool {
        let Some(handle) = self.inner.players.lock().await.remove(&guild_id) else {
            return false;
        };
        if handle
            .request(guild_id, |reply| Command::Shutdown { reply })
            .await
            .is_err()
        {
            debug!(guild_id, "Player already gone");
        }
        true
    }

    /// Evicts every guild idle for at least `threshold` whose sink is not
    /// playing. Returns the evicted guild ids.
    pub async fn sweep(&self, threshold: Duration) -> Vec<u64> {
        let mut evicted = Vec::new();
        for guild_id in self.inner.manager.idle_guilds(threshold).await {
            let playing = self
                .inner
                .players
                .lock()
                .await
                .get(&guild_id)
                .map(|handle| handle.sink.is_playing())
                .unwrap_or(false);
            if playing {
                debug!(guild_id, "Idle session still playing, kept");
                continue;
            }

            self.leave(guild_id).await;
            self.inner.manager.evict(guild_id).await;
            info!(guild_id, "Evicted idle guild");
            evicted.push(guild_id);
        }
        evicted
    }

    /// Runs [`PlaybackDriver::sweep`] every `interval` until the returned
    /// task is aborted.
    pub fn spawn_idle_sweeper(&self, interval: Duration, threshold: Duration) -> JoinHandle<()> {
        let driver = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = driver.sweep(threshold).await;
                if !evicted.is_empty() {
                    debug!(count = evicted.len(), "Idle sweep done");
                }
            }
        })
    }
}
