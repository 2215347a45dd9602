//! PlaylistManager : registre des sessions vivantes, une par guilde
//!
//! Le registre est une valeur explicite, créée par l'application et passée
//! à ceux qui en ont besoin (le pilote de lecture notamment). Une session
//! est créée au premier accès, restaurée depuis le stockage si un état y
//! existe, et retirée par [`PlaylistManager::evict`]. L'état persisté
//! survit à l'éviction.

use crate::persistence::StateStore;
use crate::playlist::core::PlaylistCore;
use crate::playlist::Playlist;
use crate::prefetch::Prefetcher;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

/// Valeurs initiales d'une session sans état enregistré
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionDefaults {
    pub volume: f32,
    pub looping: bool,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            volume: 0.5,
            looping: false,
        }
    }
}

struct ManagerInner {
    /// Une cellule par guilde : les accès concurrents à une guilde absente
    /// attendent la même restauration
    sessions: RwLock<HashMap<u64, Arc<OnceCell<Arc<Playlist>>>>>,
    store: Arc<dyn StateStore>,
    prefetcher: Option<Arc<Prefetcher>>,
    defaults: SessionDefaults,
}

/// Registre des sessions
#[derive(Clone)]
pub struct PlaylistManager {
    inner: Arc<ManagerInner>,
}

impl PlaylistManager {
    pub fn new(
        store: Arc<dyn StateStore>,
        prefetcher: Option<Arc<Prefetcher>>,
        defaults: SessionDefaults,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                sessions: RwLock::new(HashMap::new()),
                store,
                prefetcher,
                defaults,
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.inner.store
    }

    pub fn prefetcher(&self) -> Option<&Arc<Prefetcher>> {
        self.inner.prefetcher.as_ref()
    }

    /// Session de la guilde, créée (ou restaurée) si nécessaire
    ///
    /// Si la restauration échoue, rien n'est enregistré et l'appel suivant
    /// réessaie.
    pub async fn get_or_create(&self, guild_id: u64) -> Result<Arc<Playlist>> {
        let cell = {
            let sessions = self.inner.sessions.read().await;
            sessions.get(&guild_id).cloned()
        };
        let cell = match cell {
            Some(cell) => cell,
            None => {
                let mut sessions = self.inner.sessions.write().await;
                sessions
                    .entry(guild_id)
                    .or_insert_with(|| Arc::new(OnceCell::new()))
                    .clone()
            }
        };

        let playlist = cell.get_or_try_init(|| self.load(guild_id)).await?;
        Ok(playlist.clone())
    }

    async fn load(&self, guild_id: u64) -> Result<Arc<Playlist>> {
        let defaults = self.inner.defaults;
        let (core, restored) = match self.inner.store.read_session(guild_id).await? {
            Some(record) => (PlaylistCore::from_record(record, defaults.looping), true),
            None => (PlaylistCore::new(defaults.volume, defaults.looping), false),
        };

        let playlist = Arc::new(Playlist::new(
            guild_id,
            core,
            self.inner.store.clone(),
            self.inner.prefetcher.clone(),
        ));

        if restored {
            let tracks = playlist.len().await;
            info!(guild_id, tracks, "Restored session");
            playlist.prefetch().await;
        } else {
            debug!(guild_id, "Created empty session");
        }
        Ok(playlist)
    }

    /// Session de la guilde si elle est chargée, sans la créer
    pub async fn get(&self, guild_id: u64) -> Option<Arc<Playlist>> {
        let sessions = self.inner.sessions.read().await;
        sessions.get(&guild_id).and_then(|cell| cell.get().cloned())
    }

    /// Retire la session du registre
    ///
    /// Les références encore détenues sur la session refusent désormais les
    /// mutations (`SessionEvicted`). L'état persisté est conservé : le
    /// prochain `get_or_create` le restaure.
    ///
    /// Une mutation en cours sur la session se termine avant l'éviction, et
    /// aucune restauration ne peut lire le stockage entre les deux.
    pub async fn evict(&self, guild_id: u64) -> Option<Arc<Playlist>> {
        let mut sessions = self.inner.sessions.write().await;
        let playlist = sessions.get(&guild_id)?.get().cloned();
        if let Some(playlist) = &playlist {
            playlist.mark_evicted().await;
        }
        sessions.remove(&guild_id);
        drop(sessions);

        if playlist.is_some() {
            info!(guild_id, "Evicted session");
        }
        playlist
    }

    /// Guildes dont la session est chargée
    pub async fn guilds(&self) -> Vec<u64> {
        let sessions = self.inner.sessions.read().await;
        let mut ids: Vec<u64> = sessions
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Guildes inactives depuis au moins `threshold`
    pub async fn idle_guilds(&self, threshold: Duration) -> Vec<u64> {
        let sessions = self.inner.sessions.read().await;
        let mut ids: Vec<u64> = sessions
            .iter()
            .filter_map(|(id, cell)| cell.get().map(|p| (*id, p)))
            .filter(|(_, playlist)| playlist.idle_for() >= threshold)
            .map(|(id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Nombre de sessions chargées
    pub async fn len(&self) -> usize {
        self.guilds().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
