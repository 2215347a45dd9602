//! # pmoaudiocache - Cache audio sur disque
//!
//! Un fichier par piste, nommé `{stable_id}.{ext}` dans un répertoire unique.
//! La présence d'une piste est un simple test d'existence sur le système de
//! fichiers : il n'y a pas d'index séparé, donc rien à resynchroniser après
//! un redémarrage ou un nettoyage manuel du répertoire.
//!
//! Les téléchargements passent par [`AudioCache::ensure`], qui garantit au
//! plus un téléchargement en cours par identifiant : les appels concurrents
//! pour la même piste attendent le premier puis réutilisent son fichier.
//!
//! ```rust,no_run
//! use pmoaudiocache::AudioCache;
//! # async fn demo(meta: pmosource::TrackMetadata, source: &dyn pmosource::AudioDownloader)
//! #     -> pmoaudiocache::Result<()> {
//! let cache = AudioCache::new("./cache_audio")?;
//! let path = cache.ensure(&meta.url, &meta, source).await?;
//! assert_eq!(cache.local_path_for(&meta.id), Some(path));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;

#[cfg(feature = "pmoconfig")]
pub mod config_ext;

pub use cache::AudioCache;
pub use error::{CacheError, Result};

#[cfg(feature = "pmoconfig")]
pub use config_ext::AudioCacheConfigExt;
