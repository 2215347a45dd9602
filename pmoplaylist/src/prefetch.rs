//! Préchargement des prochaines pistes dans le cache audio
//!
//! Le moteur calcule la fenêtre (piste courante + `window` suivantes) sous
//! son verrou, puis la confie au [`Prefetcher`] qui travaille sur cette copie
//! dans une tâche séparée. Chaque piste est traitée indépendamment : un échec
//! est journalisé et la piste sera retentée au prochain déclenchement.

use crate::metadata::MetadataCache;
use crate::Result;
use futures::future::join_all;
use pmoaudiocache::AudioCache;
use pmosource::AudioDownloader;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Nombre de pistes préchargées après la piste courante
pub const DEFAULT_PREFETCH_WINDOW: usize = 3;

/// Résultat d'une passe de préchargement
#[derive(Debug, Default, Clone)]
pub struct PrefetchReport {
    /// Références dont l'audio est disponible localement
    pub ready: Vec<String>,
    /// Références en échec, avec la raison
    pub failed: Vec<(String, String)>,
}

pub struct Prefetcher {
    cache: AudioCache,
    metadata: MetadataCache,
    downloader: Arc<dyn AudioDownloader>,
    window: usize,
}

impl Prefetcher {
    pub fn new(
        cache: AudioCache,
        metadata: MetadataCache,
        downloader: Arc<dyn AudioDownloader>,
        window: usize,
    ) -> Self {
        Self {
            cache,
            metadata,
            downloader,
            window,
        }
    }

    /// Nombre de pistes suivant la courante à garder en cache
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn cache(&self) -> &AudioCache {
        &self.cache
    }

    pub fn metadata(&self) -> &MetadataCache {
        &self.metadata
    }

    /// Chemin local de l'audio, téléchargé à la demande si absent
    ///
    /// Appel bloquant utilisé au premier lancement de lecture.
    pub async fn resolve(&self, track_ref: &str) -> Result<PathBuf> {
        let meta = self.metadata.get(track_ref).await?;
        let path = self
            .cache
            .ensure(track_ref, &meta, self.downloader.as_ref())
            .await?;
        Ok(path)
    }

    /// Chemin local si l'audio est déjà en cache, sans rien télécharger
    pub async fn cached_path(&self, track_ref: &str) -> Result<Option<PathBuf>> {
        match self.metadata.cached(track_ref).await? {
            Some(meta) => Ok(self.cache.find(&meta.id).await?),
            None => Ok(None),
        }
    }

    /// Précharge toutes les pistes de `tracks` en parallèle
    ///
    /// Les doublons sont ignorés ; les erreurs restent dans le rapport.
    pub async fn prefetch(&self, guild_id: u64, tracks: Vec<String>) -> PrefetchReport {
        let mut seen = HashSet::new();
        let unique: Vec<String> = tracks
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();

        let results = join_all(unique.into_iter().map(|track_ref| async move {
            let result = self.resolve(&track_ref).await;
            (track_ref, result)
        }))
        .await;

        let mut report = PrefetchReport::default();
        for (track_ref, result) in results {
            match result {
                Ok(path) => {
                    debug!(guild_id, track = %track_ref, path = %path.display(), "Track ready");
                    report.ready.push(track_ref);
                }
                Err(e) => {
                    warn!(guild_id, track = %track_ref, error = %e, "Prefetch failed, will retry on next trigger");
                    report.failed.push((track_ref, e.to_string()));
                }
            }
        }
        report
    }

    /// Lance [`Prefetcher::prefetch`] en tâche de fond
    pub fn schedule(self: &Arc<Self>, guild_id: u64, tracks: Vec<String>) -> JoinHandle<PrefetchReport> {
        let prefetcher = Arc::clone(self);
        tokio::spawn(async move { prefetcher.prefetch(guild_id, tracks).await })
    }
}
