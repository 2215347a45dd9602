//! PMOQueue : outil d'exploitation des files d'attente persistées
//!
//! Travaille directement sur la base des sessions (`playlists.db`) et sur le
//! cache audio. À utiliser quand le bot est arrêté : une session déjà chargée
//! par le bot ne verrait pas ces modifications avant son éviction.

mod commands;
mod logs;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pmoqueue", version, about = "Inspect and edit persisted guild queues")]
struct Cli {
    /// Répertoire de configuration (sinon PMOMUSIC_CONFIG, .pmomusic, ~/.pmomusic)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List guilds with a saved queue
    List,
    /// Show the queue of a guild, from the current track on
    Show {
        guild: u64,
        /// Also list the tracks before the current one
        #[arg(long)]
        all: bool,
    },
    /// Queue tracks at the end, or right after the current one
    Add {
        guild: u64,
        #[arg(required = true)]
        tracks: Vec<String>,
        #[arg(long)]
        next: bool,
    },
    /// Advance to the next track
    Next { guild: u64 },
    /// Make the track at this position current
    Jump { guild: u64, position: usize },
    /// Remove by position, or every occurrence of a track with --track
    Remove {
        guild: u64,
        #[arg(required_unless_present = "track", conflicts_with = "track")]
        position: Option<usize>,
        #[arg(long)]
        track: Option<String>,
        /// With --track, remove every occurrence instead of the first one
        #[arg(long, requires = "track")]
        all: bool,
    },
    /// Move the track at FROM to position TO
    Move { guild: u64, from: usize, to: usize },
    /// Shuffle every track except the current one
    Shuffle { guild: u64 },
    /// Empty the queue
    Clear { guild: u64 },
    /// Show or set the volume, in percent
    Volume {
        guild: u64,
        percent: Option<u32>,
    },
    /// Download the current track and the next ones into the audio cache
    Warm { guild: u64 },
    /// Delete the saved queue of a guild
    Forget { guild: u64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = pmoconfig::Config::load_config(cli.config.as_deref())?;
    logs::init_logging(&config);

    let app = commands::App::from_config(&config)?;
    app.run(cli.command).await
}
