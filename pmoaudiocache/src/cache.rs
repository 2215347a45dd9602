//! Cache audio indexé par identifiant stable
//!
//! Le répertoire du cache ne contient que des fichiers complets : les
//! téléchargeurs écrivent ailleurs (ou sous un nom caché) puis renomment,
//! donc tout fichier `{id}.*` visible est jouable.

use crate::error::{CacheError, Result};
use pmosource::{AudioDownloader, TrackMetadata};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Cache audio sur disque avec coalescence des téléchargements
///
/// Cloner un `AudioCache` partage la même table des téléchargements en cours.
#[derive(Clone)]
pub struct AudioCache {
    dir: PathBuf,
    /// Verrous des téléchargements en cours (stable_id -> verrou)
    downloads: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl AudioCache {
    /// Ouvre (et crée si besoin) le répertoire du cache
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            downloads: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.dir
    }

    /// Chemin sans extension passé aux téléchargeurs
    pub fn dest_stem(&self, stable_id: &str) -> Result<PathBuf> {
        validate_id(stable_id)?;
        Ok(self.dir.join(stable_id))
    }

    /// Fichier audio `{stable_id}.*` s'il est présent
    ///
    /// Test d'existence pur, sans verrou : un écrasement concurrent par un
    /// nouveau téléchargement de la même piste reste valide.
    pub fn local_path_for(&self, stable_id: &str) -> Option<PathBuf> {
        if validate_id(stable_id).is_err() {
            return None;
        }
        let prefix = format!("{stable_id}.");
        std::fs::read_dir(&self.dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .find(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with(&prefix))
                    && entry.file_type().map(|t| t.is_file()).unwrap_or(false)
            })
            .map(|entry| entry.path())
    }

    pub fn is_cached(&self, stable_id: &str) -> bool {
        self.local_path_for(stable_id).is_some()
    }

    /// [`AudioCache::local_path_for`] sur le pool de tâches bloquantes
    pub async fn find(&self, stable_id: &str) -> Result<Option<PathBuf>> {
        let cache = self.clone();
        let stable_id = stable_id.to_string();
        tokio::task::spawn_blocking(move || cache.local_path_for(&stable_id))
            .await
            .map_err(|e| CacheError::Io(std::io::Error::other(e)))
    }

    /// Indique si un téléchargement est en cours pour cet identifiant
    pub async fn in_flight(&self, stable_id: &str) -> bool {
        self.downloads.read().await.contains_key(stable_id)
    }

    /// Garantit la présence locale de la piste et retourne son chemin
    ///
    /// Au plus un téléchargement par identifiant : un second appelant attend
    /// la fin du premier, revérifie la présence du fichier et ne relance le
    /// téléchargement que si le premier a échoué.
    pub async fn ensure(
        &self,
        track_ref: &str,
        meta: &TrackMetadata,
        downloader: &dyn AudioDownloader,
    ) -> Result<PathBuf> {
        let stem = self.dest_stem(&meta.id)?;

        if let Some(path) = self.find(&meta.id).await? {
            debug!(stable_id = %meta.id, "Audio already cached");
            return Ok(path);
        }

        let slot = {
            let mut downloads = self.downloads.write().await;
            downloads
                .entry(meta.id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let result = {
            let _guard = slot.lock().await;
            match self.find(&meta.id).await {
                Err(e) => Err(e),
                Ok(Some(path)) => {
                    debug!(stable_id = %meta.id, "Audio downloaded by a concurrent task");
                    Ok(path)
                }
                Ok(None) => {
                    info!(stable_id = %meta.id, title = %meta.title, "Downloading into audio cache");
                    downloader
                        .download(track_ref, &stem)
                        .await
                        .map_err(CacheError::from)
                }
            }
        };

        // Dernier utilisateur du verrou : on le retire de la table
        {
            let mut downloads = self.downloads.write().await;
            if Arc::strong_count(&slot) == 2 {
                downloads.remove(&meta.id);
            }
        }

        result
    }
}

/// Un identifiant doit être un nom de fichier simple, non caché
fn validate_id(stable_id: &str) -> Result<()> {
    let valid = !stable_id.is_empty()
        && !stable_id.starts_with('.')
        && !stable_id.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidId(stable_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_plain_file_names() {
        assert!(validate_id("dQw4w9WgXcQ").is_ok());
        assert!(validate_id("a-b_c").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id(".partial").is_err());
        assert!(validate_id("../etc").is_err());
        assert!(validate_id("a/b").is_err());
    }

    #[test]
    fn lookup_matches_prefix_and_dot_only() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path()).unwrap();

        std::fs::write(dir.path().join("abc.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("abcd.mp3"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("zzz.d")).unwrap();

        assert_eq!(cache.local_path_for("abc"), Some(dir.path().join("abc.mp3")));
        assert_eq!(cache.local_path_for("ab"), None);
        // Les répertoires ne comptent pas
        assert_eq!(cache.local_path_for("zzz"), None);
        assert_eq!(cache.local_path_for("../abc"), None);
    }
}
