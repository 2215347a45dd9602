//! Lecture de l'état (verrou partagé)

use super::core::{volume_to_percent, PlaylistCore};
use super::Playlist;
use crate::Result;

impl Playlist {
    /// Référence de la piste courante (`EmptyQueue` si la file est vide)
    pub async fn current(&self) -> Result<String> {
        self.core.read().await.current().map(str::to_string)
    }

    /// Piste qui suivra la courante, en tenant compte du bouclage
    pub async fn peek_next(&self) -> Option<String> {
        self.core.read().await.peek_next().map(str::to_string)
    }

    pub async fn has_next(&self) -> bool {
        self.core.read().await.peek_next().is_some()
    }

    pub async fn tracks(&self) -> Vec<String> {
        self.core.read().await.tracks().to_vec()
    }

    /// Pistes à partir de la courante, avec leur position relative
    pub async fn upcoming(&self) -> Vec<(usize, String)> {
        self.core.read().await.upcoming()
    }

    /// Index absolu de la piste courante
    pub async fn cursor(&self) -> Option<usize> {
        self.core.read().await.cursor()
    }

    pub async fn len(&self) -> usize {
        self.core.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.core.read().await.is_empty()
    }

    /// Volume interne (0.0..=1.0)
    pub async fn volume(&self) -> f32 {
        self.core.read().await.volume()
    }

    pub async fn volume_percent(&self) -> u32 {
        volume_to_percent(self.volume().await)
    }

    pub async fn is_looping(&self) -> bool {
        self.core.read().await.is_looping()
    }

    /// Copie cohérente de tout l'état
    pub async fn snapshot(&self) -> PlaylistCore {
        self.core.read().await.clone()
    }
}
