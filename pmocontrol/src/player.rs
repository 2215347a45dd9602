//! Per-guild playback actor.
//!
//! Every command and every sink completion for a guild goes through one
//! unbounded channel and is handled by a single task, strictly in order.
//! Each `play()` handed to the sink is tagged with a generation number; a
//! completion carrying an older generation belongs to a track that was
//! stopped or replaced and is dropped.

use std::sync::Arc;
use std::time::Duration;

use pmoplaylist::{Error as PlaylistError, Playlist, PlaylistManager, Prefetcher};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::errors::{ControlError, Result};
use crate::progress::ProgressTracker;
use crate::sink::AudioSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Snapshot returned by every driver command.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatus {
    pub guild_id: u64,
    pub state: PlaybackState,
    /// Track under the cursor, playing or not.
    pub current: Option<String>,
    pub elapsed: Duration,
    pub volume: f32,
}

type Reply = oneshot::Sender<Result<PlayerStatus>>;

pub(crate) enum Command {
    Play { channel_id: u64, reply: Reply },
    Pause { reply: Reply },
    Resume { reply: Reply },
    Stop { reply: Reply },
    Skip { reply: Reply },
    Previous { reply: Reply },
    SetVolume { volume: f32, reply: Reply },
    Status { reply: Reply },
    TrackCompleted { generation: u64 },
    Shutdown { reply: oneshot::Sender<()> },
}

pub(crate) struct Player {
    guild_id: u64,
    manager: PlaylistManager,
    prefetcher: Arc<Prefetcher>,
    sink: Arc<dyn AudioSink>,
    events: mpsc::WeakUnboundedSender<Command>,
    state: PlaybackState,
    tracker: ProgressTracker,
    generation: u64,
    connected: bool,
    /// Track handed to the sink by the last `play()`.
    started: Option<String>,
}

impl Player {
    pub(crate) fn new(
        guild_id: u64,
        manager: PlaylistManager,
        prefetcher: Arc<Prefetcher>,
        sink: Arc<dyn AudioSink>,
        events: mpsc::WeakUnboundedSender<Command>,
    ) -> Self {
        Self {
            guild_id,
            manager,
            prefetcher,
            sink,
            events,
            state: PlaybackState::Idle,
            tracker: ProgressTracker::new(),
            generation: 0,
            connected: false,
            started: None,
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        debug!(guild_id = self.guild_id, "Player started");
        while let Some(command) = commands.recv().await {
            match command {
                Command::Play { channel_id, reply } => {
                    let result = self.play(channel_id).await;
                    self.reply(reply, result).await;
                }
                Command::Pause { reply } => {
                    let result = self.pause().await;
                    self.reply(reply, result).await;
                }
                Command::Resume { reply } => {
                    let result = self.resume().await;
                    self.reply(reply, result).await;
                }
                Command::Stop { reply } => {
                    let result = self.stop().await;
                    self.reply(reply, result).await;
                }
                Command::Skip { reply } => {
                    let result = self.skip().await;
                    self.reply(reply, result).await;
                }
                Command::Previous { reply } => {
                    let result = self.previous().await;
                    self.reply(reply, result).await;
                }
                Command::SetVolume { volume, reply } => {
                    let result = self.set_volume(volume).await;
                    self.reply(reply, result).await;
                }
                Command::Status { reply } => {
                    self.reply(reply, Ok(())).await;
                }
                Command::TrackCompleted { generation } => {
                    self.on_track_completed(generation).await;
                }
                Command::Shutdown { reply } => {
                    if let Err(e) = self.halt().await {
                        warn!(guild_id = self.guild_id, error = %e, "Sink error while shutting down");
                    }
                    let _ = reply.send(());
                    break;
                }
            }
        }
        debug!(guild_id = self.guild_id, "Player stopped");
    }

    async fn reply(&self, reply: Reply, result: Result<()>) {
        let response = match result {
            Ok(()) => self.status().await,
            Err(e) => Err(e),
        };
        // The caller may have given up waiting
        let _ = reply.send(response);
    }

    async fn session(&self) -> Result<Arc<Playlist>> {
        Ok(self.manager.get_or_create(self.guild_id).await?)
    }

    async fn status(&self) -> Result<PlayerStatus> {
        let session = self.session().await?;
        Ok(PlayerStatus {
            guild_id: self.guild_id,
            state: self.state,
            current: session.current().await.ok(),
            elapsed: self.tracker.elapsed(),
            volume: session.volume().await,
        })
    }

    fn is_active(&self) -> bool {
        self.state != PlaybackState::Idle
    }

    async fn play(&mut self, channel_id: u64) -> Result<()> {
        match self.state {
            PlaybackState::Playing => return Ok(()),
            PlaybackState::Paused => return self.resume().await,
            PlaybackState::Idle => {}
        }

        let session = self.session().await?;
        session.touch();
        // Rejects an empty queue before joining the channel
        session.current().await?;

        self.sink.connect(channel_id).await?;
        self.connected = true;

        if let Err(e) = self.start_current(&session).await {
            self.halt().await?;
            return Err(e);
        }
        Ok(())
    }

    /// Plays the track under the cursor, downloading it first if needed.
    async fn start_current(&mut self, session: &Playlist) -> Result<()> {
        let track = session.current().await?;
        let path = self.prefetcher.resolve(&track).await?;

        self.generation += 1;
        let generation = self.generation;
        let events = self.events.clone();
        let on_complete = Box::new(move || {
            if let Some(events) = events.upgrade() {
                let _ = events.send(Command::TrackCompleted { generation });
            }
        });

        self.sink.set_volume(session.volume().await).await?;
        self.sink.play(&path, on_complete).await?;
        self.tracker.start();
        self.state = PlaybackState::Playing;
        self.started = Some(track.clone());
        session.touch();

        info!(guild_id = self.guild_id, track = %track, generation, "Playing");
        session.prefetch().await;
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        if self.state != PlaybackState::Playing {
            return Ok(());
        }
        self.sink.pause().await?;
        self.tracker.pause();
        self.state = PlaybackState::Paused;
        self.session().await?.touch();
        Ok(())
    }

    async fn resume(&mut self) -> Result<()> {
        if self.state != PlaybackState::Paused {
            return Ok(());
        }
        self.sink.resume().await?;
        self.tracker.resume();
        self.state = PlaybackState::Playing;
        self.session().await?.touch();
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.halt().await?;
        if let Some(session) = self.manager.get(self.guild_id).await {
            session.touch();
        }
        Ok(())
    }

    /// Back to idle: stops the sink, leaves the channel and invalidates any
    /// completion still in flight.
    async fn halt(&mut self) -> Result<()> {
        self.generation += 1;
        self.tracker.reset();
        self.started = None;
        let was_active = self.is_active();
        self.state = PlaybackState::Idle;

        if was_active {
            self.sink.stop().await?;
        }
        if self.connected {
            self.connected = false;
            self.sink.disconnect().await?;
        }
        Ok(())
    }

    async fn skip(&mut self) -> Result<()> {
        let session = self.session().await?;
        match session.next_song().await {
            Ok(_) => self.restart_if_active(&session).await,
            Err(PlaylistError::PlaylistExhausted) => {
                info!(guild_id = self.guild_id, "Skipped past the last track");
                self.halt().await?;
                Err(PlaylistError::PlaylistExhausted.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn previous(&mut self) -> Result<()> {
        let session = self.session().await?;
        session.prev_song().await?;
        self.restart_if_active(&session).await
    }

    async fn restart_if_active(&mut self, session: &Playlist) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        // Invalidate the completion of the track being replaced
        self.generation += 1;
        self.sink.stop().await?;
        if let Err(e) = self.start_current(session).await {
            error!(guild_id = self.guild_id, error = %e, "Cannot start track, going idle");
            self.halt().await?;
            return Err(e);
        }
        Ok(())
    }

    async fn set_volume(&mut self, volume: f32) -> Result<()> {
        let session = self.session().await?;
        session.set_volume(volume).await?;
        if self.is_active() {
            self.sink.set_volume(volume).await?;
        }
        Ok(())
    }

    async fn on_track_completed(&mut self, generation: u64) {
        if generation != self.generation || self.state != PlaybackState::Playing {
            debug!(
                guild_id = self.guild_id,
                generation,
                current = self.generation,
                "Ignoring stale completion"
            );
            return;
        }

        if let Err(e) = self.advance().await {
            if e.is_exhausted() {
                info!(guild_id = self.guild_id, "Queue finished");
            } else {
                error!(guild_id = self.guild_id, error = %e, "Cannot advance, going idle");
            }
            if let Err(e) = self.halt().await {
                warn!(guild_id = self.guild_id, error = %e, "Sink error while going idle");
            }
        }
    }

    /// Moves past the finished track. When the queue was edited while it
    /// played and the cursor now holds another track, that track is the
    /// next one to play.
    async fn advance(&mut self) -> Result<()> {
        let session = self.session().await?;
        let moved = match (&self.started, session.current().await) {
            (Some(started), Ok(now)) => *started != now,
            _ => false,
        };
        if moved {
            debug!(guild_id = self.guild_id, "Current track changed while playing");
        } else {
            session.next_song().await?;
        }
        self.start_current(&session).await
    }
}

/// Handle kept by the driver for a running player.
#[derive(Clone)]
pub(crate) struct PlayerHandle {
    pub(crate) commands: mpsc::UnboundedSender<Command>,
    pub(crate) sink: Arc<dyn AudioSink>,
}

impl PlayerHandle {
    pub(crate) fn spawn(
        guild_id: u64,
        manager: PlaylistManager,
        prefetcher: Arc<Prefetcher>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let player = Player::new(
            guild_id,
            manager,
            prefetcher,
            sink.clone(),
            commands.downgrade(),
        );
        tokio::spawn(player.run(receiver));
        Self { commands, sink }
    }

    /// Sends a command built around a reply channel and waits for the answer.
    pub(crate) async fn request<T>(
        &self,
        guild_id: u64,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T> {
        let (reply, answer) = oneshot::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| ControlError::PlayerGone(guild_id))?;
        answer.await.map_err(|_| ControlError::PlayerGone(guild_id))
    }
}
