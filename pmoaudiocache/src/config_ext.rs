//! Extension pour intégrer le cache audio dans pmoconfig
//!
//! Ce module fournit le trait `AudioCacheConfigExt` qui ajoute à
//! `pmoconfig::Config` la gestion du répertoire du cache audio.

use crate::AudioCache;
use anyhow::Result;
use pmoconfig::Config;
use std::path::PathBuf;

const DEFAULT_AUDIO_CACHE_DIR: &str = "cache_audio";

/// Trait d'extension pour gérer le cache audio dans pmoconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use pmoaudiocache::AudioCacheConfigExt;
///
/// let cache = config.create_audio_cache()?;
/// ```
pub trait AudioCacheConfigExt {
    /// Répertoire du cache audio (`audio_cache.directory`, défaut `cache_audio`)
    fn get_audiocache_dir(&self) -> Result<PathBuf>;

    /// Définit le répertoire du cache audio (absolu ou relatif au config_dir)
    fn set_audiocache_dir(&self, directory: &str) -> Result<()>;

    /// Crée le cache audio dans le répertoire configuré
    fn create_audio_cache(&self) -> Result<AudioCache>;
}

impl AudioCacheConfigExt for Config {
    fn get_audiocache_dir(&self) -> Result<PathBuf> {
        self.get_managed_dir(&["audio_cache", "directory"], DEFAULT_AUDIO_CACHE_DIR)
    }

    fn set_audiocache_dir(&self, directory: &str) -> Result<()> {
        self.set_managed_dir(&["audio_cache", "directory"], directory)
    }

    fn create_audio_cache(&self) -> Result<AudioCache> {
        let dir = self.get_audiocache_dir()?;
        Ok(AudioCache::new(dir)?)
    }
}
