//! Cache de métadonnées : référence de piste -> [`TrackMetadata`]
//!
//! Rempli paresseusement à la première demande et jamais invalidé : une
//! métadonnée enregistrée ne change plus.

use crate::persistence::StateStore;
use crate::Result;
use pmosource::{MetadataFetcher, TrackMetadata};
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Clone)]
pub struct MetadataCache {
    store: Arc<dyn StateStore>,
    fetcher: Arc<dyn MetadataFetcher>,
}

impl MetadataCache {
    pub fn new(store: Arc<dyn StateStore>, fetcher: Arc<dyn MetadataFetcher>) -> Self {
        Self { store, fetcher }
    }

    /// Métadonnées de la piste, depuis le stockage ou la source
    ///
    /// Une erreur d'écriture du cache est journalisée mais n'empêche pas de
    /// retourner la métadonnée obtenue.
    pub async fn get(&self, track_ref: &str) -> Result<TrackMetadata> {
        if let Some(meta) = self.store.read_metadata(track_ref).await? {
            debug!(track = %track_ref, stable_id = %meta.id, "Metadata cache hit");
            return Ok(meta);
        }

        let meta = self.fetcher.fetch(track_ref).await?;
        debug!(track = %track_ref, stable_id = %meta.id, "Fetched metadata");

        if let Err(e) = self.store.write_metadata(track_ref, &meta).await {
            error!(track = %track_ref, error = %e, "Failed to store metadata");
        }
        Ok(meta)
    }

    /// Métadonnées déjà connues, sans interroger la source
    pub async fn cached(&self, track_ref: &str) -> Result<Option<TrackMetadata>> {
        self.store.read_metadata(track_ref).await
    }

    /// Résout une liste de références pour affichage (meilleur effort)
    ///
    /// Les pistes dont la résolution échoue sont retournées sans métadonnée.
    pub async fn describe(&self, refs: &[String]) -> Vec<(String, Option<TrackMetadata>)> {
        let lookups = refs.iter().map(|r| async move {
            match self.get(r).await {
                Ok(meta) => (r.clone(), Some(meta)),
                Err(e) => {
                    debug!(track = %r, error = %e, "No metadata for listing");
                    (r.clone(), None)
                }
            }
        });
        futures::future::join_all(lookups).await
    }
}
