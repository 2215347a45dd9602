//! Session d'une guilde : file d'attente partagée et persistée

pub mod core;
mod read;
mod write;

use self::core::PlaylistCore;
use crate::persistence::StateStore;
use crate::prefetch::Prefetcher;
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error};

/// File d'attente d'une guilde
///
/// Toutes les mutations passent par [`Playlist::mutate`] : elles
/// s'appliquent à une copie de l'état, la copie est écrite dans le
/// [`StateStore`], puis publiée. Un lecteur ne voit donc jamais un état
/// non persisté, et un échec d'écriture laisse la session inchangée.
pub struct Playlist {
    guild_id: u64,
    core: RwLock<PlaylistCore>,
    store: Arc<dyn StateStore>,
    prefetcher: Option<Arc<Prefetcher>>,
    last_active: Mutex<Instant>,
    evicted: AtomicBool,
}

impl Playlist {
    pub(crate) fn new(
        guild_id: u64,
        core: PlaylistCore,
        store: Arc<dyn StateStore>,
        prefetcher: Option<Arc<Prefetcher>>,
    ) -> Self {
        Self {
            guild_id,
            core: RwLock::new(core),
            store,
            prefetcher,
            last_active: Mutex::new(Instant::now()),
            evicted: AtomicBool::new(false),
        }
    }

    pub fn guild_id(&self) -> u64 {
        self.guild_id
    }

    /// Faux une fois la session évincée du registre
    pub fn is_alive(&self) -> bool {
        !self.evicted.load(Ordering::SeqCst)
    }

    /// Attend la fin de la mutation en cours avant de marquer la session
    pub(crate) async fn mark_evicted(&self) {
        let _core = self.core.write().await;
        self.evicted.store(true, Ordering::SeqCst);
    }

    /// Met à jour l'horodatage d'activité (utilisé par l'éviction)
    pub fn touch(&self) {
        *self.last_active.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    pub fn last_active(&self) -> Instant {
        *self.last_active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Durée écoulée depuis la dernière activité
    pub fn idle_for(&self) -> std::time::Duration {
        self.last_active().elapsed()
    }

    fn lookahead(&self) -> usize {
        self.prefetcher.as_ref().map(|p| p.window()).unwrap_or(0)
    }

    /// Précharge la fenêtre courante en tâche de fond
    ///
    /// Retourne `None` si aucun préchargeur n'est configuré ou si la file
    /// est vide.
    pub async fn prefetch(&self) -> Option<JoinHandle<crate::PrefetchReport>> {
        let prefetcher = self.prefetcher.as_ref()?;
        let window = self.core.read().await.window(prefetcher.window());
        if window.is_empty() {
            return None;
        }
        Some(prefetcher.schedule(self.guild_id, window))
    }

    /// Applique une mutation de manière atomique et persistée
    ///
    /// `op` reçoit une copie de l'état ; si elle échoue, rien n'est écrit.
    /// L'écriture dans le stockage a lieu avant la publication du nouvel
    /// état ; en cas d'échec l'état précédent est conservé et l'erreur
    /// remontée. Le préchargement n'est relancé que si la fenêtre a changé.
    pub(crate) async fn mutate<T, F>(&self, name: &'static str, op: F) -> Result<T>
    where
        F: FnOnce(&mut PlaylistCore) -> Result<T>,
    {
        let mut core = self.core.write().await;
        if !self.is_alive() {
            return Err(Error::SessionEvicted(self.guild_id));
        }

        let mut next = core.clone();
        let value = op(&mut next)?;

        let record = next.to_record(self.guild_id);
        if let Err(e) = self.store.write_session(&record).await {
            error!(guild_id = self.guild_id, op = name, error = %e, "Failed to persist session, change discarded");
            return Err(e);
        }

        let lookahead = self.lookahead();
        let old_window = core.window(lookahead);
        *core = next;
        let new_window = core.window(lookahead);
        drop(core);

        self.touch();
        debug!(guild_id = self.guild_id, op = name, "Session updated");

        if old_window != new_window && !new_window.is_empty() {
            if let Some(prefetcher) = &self.prefetcher {
                prefetcher.schedule(self.guild_id, new_window);
            }
        }
        Ok(value)
    }
}
