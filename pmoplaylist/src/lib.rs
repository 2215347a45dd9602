//! # pmoplaylist - Files d'attente par guilde
//!
//! Cette crate fournit le moteur de sessions :
//! - une file ordonnée par guilde, avec curseur, volume et bouclage
//! - des mutations atomiques, écrites dans le stockage avant de retourner
//! - la restauration de l'état au premier accès après un redémarrage
//! - le préchargement des prochaines pistes dans `pmoaudiocache`
//!
//! # Architecture
//!
//! - **PlaylistManager** : registre des sessions (création au premier accès, éviction)
//! - **Playlist** : session d'une guilde, lectures et mutations
//! - **PlaylistCore** : état pur (file + curseur), sans I/O
//! - **StateStore** / **SqliteStore** : persistance des sessions et des métadonnées
//! - **MetadataCache** : métadonnées des pistes, résolues paresseusement
//! - **Prefetcher** : téléchargement de la fenêtre courante
//!
//! Les positions passées aux opérations sont relatives à la piste courante
//! et commencent à 1 : `move_song(3, 2)` déplace la deuxième piste après la
//! courante juste après celle-ci.
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use pmoplaylist::{PlaylistManager, SessionDefaults, SqliteStore};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> pmoplaylist::Result<()> {
//! let store = Arc::new(SqliteStore::open("playlists.db".as_ref())?);
//! let manager = PlaylistManager::new(store, None, SessionDefaults::default());
//!
//! let session = manager.get_or_create(1234).await?;
//! session.append_song("https://www.youtube.com/watch?v=a").await?;
//! session.append_song("https://www.youtube.com/watch?v=b").await?;
//! session.move_song(2, 1).await?;
//!
//! println!("Now playing: {}", session.current().await?);
//! # Ok(())
//! # }
//! ```

mod error;
mod manager;
mod metadata;
mod persistence;
mod playlist;
mod prefetch;

#[cfg(feature = "pmoconfig")]
mod config_ext;

// Réexports publics
pub use error::{Error, Result};
pub use manager::{PlaylistManager, SessionDefaults};
pub use metadata::MetadataCache;
pub use persistence::{SessionRecord, SqliteStore, StateStore};
pub use playlist::core::{volume_from_percent, volume_to_percent, PlaylistCore};
pub use playlist::Playlist;
pub use prefetch::{PrefetchReport, Prefetcher, DEFAULT_PREFETCH_WINDOW};

#[cfg(feature = "pmoconfig")]
pub use config_ext::PlaylistConfigExt;
