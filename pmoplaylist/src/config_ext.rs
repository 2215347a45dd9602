//! Extension de pmoconfig pour les playlists

use crate::manager::SessionDefaults;
use crate::prefetch::DEFAULT_PREFETCH_WINDOW;
use anyhow::Result;
use std::path::PathBuf;

/// Trait d'extension pour pmoconfig::Config
pub trait PlaylistConfigExt {
    /// Chemin de la base SQLite des sessions (`playlists.directory`/playlists.db)
    fn playlist_db_path(&self) -> Result<PathBuf>;

    /// Nombre de pistes préchargées après la courante (`playlists.prefetch_window`)
    fn prefetch_window(&self) -> usize;

    /// Volume et bouclage des nouvelles sessions
    fn session_defaults(&self) -> SessionDefaults;
}

impl PlaylistConfigExt for pmoconfig::Config {
    fn playlist_db_path(&self) -> Result<PathBuf> {
        let playlists_dir = self.get_managed_dir(&["playlists", "directory"], "playlists")?;
        Ok(playlists_dir.join("playlists.db"))
    }

    fn prefetch_window(&self) -> usize {
        self.get_usize(&["playlists", "prefetch_window"], DEFAULT_PREFETCH_WINDOW)
    }

    fn session_defaults(&self) -> SessionDefaults {
        let fallback = SessionDefaults::default();
        let volume = self.get_f64(&["playlists", "default_volume"], fallback.volume as f64);
        SessionDefaults {
            volume: (volume as f32).clamp(0.0, 1.0),
            looping: self.get_bool(&["playlists", "default_loop"], fallback.looping),
        }
    }
}
