//! Persistance de l'état des sessions et du cache de métadonnées
//!
//! [`StateStore`] est le contrat consommé par le moteur ; [`SqliteStore`]
//! en est l'implémentation fournie.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::Result;
use async_trait::async_trait;
use pmosource::TrackMetadata;
use serde::{Deserialize, Serialize};

/// État récupérable d'une session : file, curseur, volume
///
/// Les métadonnées et l'audio sont des caches reconstructibles à partir des
/// références et n'en font pas partie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub guild_id: u64,
    pub playlist: Vec<String>,
    pub idx: usize,
    pub volume: f32,
}

/// Stockage durable partagé par toutes les sessions
///
/// Les appels pour une même guilde sont déjà sérialisés par le moteur ;
/// une implémentation doit seulement supporter des appels concurrents pour
/// des guildes différentes.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// `Ok(None)` si aucune session n'a été enregistrée pour cette guilde
    async fn read_session(&self, guild_id: u64) -> Result<Option<SessionRecord>>;

    async fn write_session(&self, record: &SessionRecord) -> Result<()>;

    async fn read_metadata(&self, track_ref: &str) -> Result<Option<TrackMetadata>>;

    async fn write_metadata(&self, track_ref: &str, metadata: &TrackMetadata) -> Result<()>;
}
