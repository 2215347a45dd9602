use crate::Command;
use anyhow::{Context, Result, bail};
use pmoaudiocache::AudioCacheConfigExt;
use pmocontrol::format_duration;
use pmoconfig::Config;
use pmoplaylist::{
    MetadataCache, Playlist, PlaylistConfigExt, PlaylistManager, Prefetcher, SqliteStore,
    volume_to_percent,
};
use pmoyoutube::YoutubeConfigExt;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::info;

pub struct App {
    store: Arc<SqliteStore>,
    manager: PlaylistManager,
    metadata: MetadataCache,
    prefetcher: Arc<Prefetcher>,
}

impl App {
    pub fn from_config(config: &Config) -> Result<Self> {
        let db_path = config.playlist_db_path()?;
        let store = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Cannot open session store {}", db_path.display()))?,
        );
        info!(db = %db_path.display(), "Session store opened");

        let source = Arc::new(config.youtube_source());
        let metadata = MetadataCache::new(store.clone(), source.clone());
        let prefetcher = Arc::new(Prefetcher::new(
            config.create_audio_cache()?,
            metadata.clone(),
            source,
            config.prefetch_window(),
        ));

        // Sans préchargement automatique : seul `warm` télécharge
        let manager = PlaylistManager::new(store.clone(), None, config.session_defaults());

        Ok(Self {
            store,
            manager,
            metadata,
            prefetcher,
        })
    }

    async fn session(&self, guild_id: u64) -> Result<Arc<Playlist>> {
        Ok(self.manager.get_or_create(guild_id).await?)
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::List => self.list().await,
            Command::Show { guild, all } => self.show(guild, all).await,
            Command::Add {
                guild,
                tracks,
                next,
            } => {
                let session = self.session(guild).await?;
                let count = tracks.len();
                if next && !session.is_empty().await {
                    // Chaque insertion se place juste après la courante
                    for track in tracks.into_iter().rev() {
                        session.prepend_song(track).await?;
                    }
                } else {
                    session.append_songs(tracks).await?;
                }
                println!("Queued {count} track(s) for guild {guild}");
                Ok(())
            }
            Command::Next { guild } => {
                let track = self.session(guild).await?.next_song().await?;
                self.print_current(&track).await;
                Ok(())
            }
            Command::Jump { guild, position } => {
                let track = self.session(guild).await?.jump_to(position).await?;
                self.print_current(&track).await;
                Ok(())
            }
            Command::Remove {
                guild,
                position,
                track,
                all,
            } => {
                let session = self.session(guild).await?;
                match (position, track) {
                    (_, Some(track)) => {
                        let removed = session.remove_song(&track, all).await?;
                        println!("Removed {removed} occurrence(s) of {track}");
                    }
                    (Some(position), None) => {
                        let removed = session.remove_at(position).await?;
                        println!("Removed {removed}");
                    }
                    (None, None) => bail!("Give a position or --track"),
                }
                Ok(())
            }
            Command::Move { guild, from, to } => {
                self.session(guild).await?.move_song(from, to).await?;
                println!("Moved track {from} to position {to}");
                Ok(())
            }
            Command::Shuffle { guild } => {
                self.session(guild).await?.shuffle().await?;
                println!("Shuffled queue of guild {guild}");
                Ok(())
            }
            Command::Clear { guild } => {
                self.session(guild).await?.clear().await?;
                println!("Cleared queue of guild {guild}");
                Ok(())
            }
            Command::Volume { guild, percent } => {
                let session = self.session(guild).await?;
                if let Some(percent) = percent {
                    session.set_volume_percent(percent).await?;
                }
                let percent = session.volume_percent().await;
                println!("Volume: {percent}%");
                Ok(())
            }
            Command::Warm { guild } => self.warm(guild).await,
            Command::Forget { guild } => {
                if self.store.delete_session(guild)? {
                    println!("Forgot queue of guild {guild}");
                } else {
                    println!("No saved queue for guild {guild}");
                }
                Ok(())
            }
        }
    }

    async fn list(&self) -> Result<()> {
        let guilds = self.store.guild_ids()?;
        if guilds.is_empty() {
            println!("No saved queue");
            return Ok(());
        }
        for guild in guilds {
            let session = self.session(guild).await?;
            let updated = self
                .store
                .last_updated(guild)?
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            let tracks = session.len().await;
            let volume = session.volume_percent().await;
            println!("{guild:>20}  {tracks:>4} track(s)  volume {volume:>3}%  updated {updated}");
        }
        Ok(())
    }

    async fn show(&self, guild_id: u64, all: bool) -> Result<()> {
        let core = self.session(guild_id).await?.snapshot().await;
        println!(
            "Guild {guild_id}  volume {}%  loop {}",
            volume_to_percent(core.volume()),
            if core.is_looping() { "on" } else { "off" }
        );

        let Some(cursor) = core.cursor() else {
            println!("(empty)");
            return Ok(());
        };

        let first = if all { 0 } else { cursor };
        let refs = core.tracks()[first..].to_vec();
        for (offset, (track, meta)) in self.metadata.describe(&refs).await.into_iter().enumerate() {
            let index = first + offset;
            let marker = match index.cmp(&cursor) {
                Ordering::Less => "      ".to_string(),
                Ordering::Equal => "▶   1.".to_string(),
                Ordering::Greater => format!("{:>5}.", index - cursor + 1),
            };
            match meta {
                Some(meta) => println!(
                    "{marker} {} [{}]  {track}",
                    meta.title,
                    format_duration(meta.duration_secs)
                ),
                None => println!("{marker} {track}"),
            }
        }
        Ok(())
    }

    async fn print_current(&self, track: &str) {
        match self.metadata.get(track).await {
            Ok(meta) => println!(
                "Now at: {} [{}]",
                meta.title,
                format_duration(meta.duration_secs)
            ),
            Err(_) => println!("Now at: {track}"),
        }
    }

    async fn warm(&self, guild_id: u64) -> Result<()> {
        let window = self
            .session(guild_id)
            .await?
            .snapshot()
            .await
            .window(self.prefetcher.window());
        if window.is_empty() {
            println!("Nothing to warm");
            return Ok(());
        }

        let report = self.prefetcher.prefetch(guild_id, window).await;
        for track in &report.ready {
            println!("ready   {track}");
        }
        for (track, reason) in &report.failed {
            println!("failed  {track}: {reason}");
        }
        if !report.failed.is_empty() {
            bail!("{} track(s) could not be cached", report.failed.len());
        }
        Ok(())
    }
}
