//! Mutations de la file (toutes persistées avant de retourner)

use super::core::volume_from_percent;
use super::Playlist;
use crate::Result;

impl Playlist {
    /// Passe à la piste suivante et la retourne
    ///
    /// `PlaylistExhausted` après la dernière piste sans bouclage (le curseur
    /// ne bouge pas), `EmptyQueue` sur une file vide.
    pub async fn next_song(&self) -> Result<String> {
        self.mutate("next_song", |core| core.next()).await
    }

    /// Revient à la piste précédente (depuis la première : la dernière)
    pub async fn prev_song(&self) -> Result<String> {
        self.mutate("prev_song", |core| core.prev()).await
    }

    /// Insère une piste qui sera jouée juste après la courante
    pub async fn prepend_song(&self, track_ref: impl Into<String>) -> Result<()> {
        let track_ref = track_ref.into();
        self.mutate("prepend_song", move |core| {
            core.prepend(track_ref);
            Ok(())
        })
        .await
    }

    /// Ajoute une piste en fin de file
    pub async fn append_song(&self, track_ref: impl Into<String>) -> Result<()> {
        let track_ref = track_ref.into();
        self.mutate("append_song", move |core| {
            core.append(track_ref);
            Ok(())
        })
        .await
    }

    /// Ajoute plusieurs pistes en une seule écriture
    pub async fn append_songs(&self, track_refs: Vec<String>) -> Result<()> {
        self.mutate("append_songs", move |core| {
            core.extend(track_refs);
            Ok(())
        })
        .await
    }

    /// Supprime la piste à la position relative (1 = courante)
    pub async fn remove_at(&self, position: usize) -> Result<String> {
        self.mutate("remove_at", |core| core.remove_at(position)).await
    }

    /// Supprime la première occurrence, ou toutes, d'une référence
    pub async fn remove_song(&self, track_ref: &str, all: bool) -> Result<usize> {
        self.mutate("remove_song", |core| core.remove_track(track_ref, all))
            .await
    }

    /// Déplace une piste entre deux positions relatives
    pub async fn move_song(&self, from: usize, to: usize) -> Result<()> {
        self.mutate("move_song", |core| core.move_track(from, to))
            .await
    }

    /// Fait de la piste à la position relative la piste courante
    pub async fn jump_to(&self, position: usize) -> Result<String> {
        self.mutate("jump_to", |core| core.jump_to(position)).await
    }

    /// Mélange la file, la piste courante restant en place
    pub async fn shuffle(&self) -> Result<()> {
        self.mutate("shuffle", |core| {
            core.shuffle_with(&mut rand::rng());
            Ok(())
        })
        .await
    }

    /// Vide la file
    pub async fn clear(&self) -> Result<()> {
        self.mutate("clear", |core| {
            core.clear();
            Ok(())
        })
        .await
    }

    /// Volume interne, entre 0.0 et 1.0
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        self.mutate("set_volume", |core| core.set_volume(volume))
            .await
    }

    /// Volume en pourcentage (0..=100)
    pub async fn set_volume_percent(&self, percent: u32) -> Result<()> {
        let volume = volume_from_percent(percent)?;
        self.set_volume(volume).await
    }

    pub async fn set_looping(&self, looping: bool) -> Result<()> {
        self.mutate("set_looping", |core| {
            core.set_looping(looping);
            Ok(())
        })
        .await
    }
}
