//! PlaylistCore : file ordonnée, curseur, volume et bouclage
//!
//! Structure purement synchrone, sans I/O. Toutes les positions exposées
//! aux appelants sont relatives au curseur et commencent à 1 (1 = piste
//! courante) ; la conversion en index absolu passe toujours par
//! [`PlaylistCore::resolve`].

use crate::persistence::SessionRecord;
use crate::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;

/// Convertit un volume 0..=100 en volume interne 0.0..=1.0
pub fn volume_from_percent(percent: u32) -> Result<f32> {
    if percent > 100 {
        return Err(Error::VolumeOutOfRange(percent as f32 / 100.0));
    }
    Ok(percent as f32 / 100.0)
}

/// Convertit le volume interne en pourcentage arrondi
pub fn volume_to_percent(volume: f32) -> u32 {
    (volume.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// État complet d'une file d'attente
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistCore {
    tracks: Vec<String>,
    cursor: usize,
    looping: bool,
    volume: f32,
}

impl PlaylistCore {
    pub fn new(volume: f32, looping: bool) -> Self {
        Self {
            tracks: Vec::new(),
            cursor: 0,
            looping,
            volume: sanitize_volume(volume),
        }
    }

    /// Reconstruit l'état persisté, en ramenant curseur et volume dans leurs bornes
    pub fn from_record(record: SessionRecord, looping: bool) -> Self {
        let cursor = match record.playlist.len() {
            0 => 0,
            len => record.idx.min(len - 1),
        };
        Self {
            tracks: record.playlist,
            cursor,
            looping,
            volume: sanitize_volume(record.volume),
        }
    }

    pub fn to_record(&self, guild_id: u64) -> SessionRecord {
        SessionRecord {
            guild_id,
            playlist: self.tracks.clone(),
            idx: self.cursor,
            volume: self.volume,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[String] {
        &self.tracks
    }

    /// Index absolu de la piste courante, `None` si la file est vide
    pub fn cursor(&self) -> Option<usize> {
        (!self.tracks.is_empty()).then_some(self.cursor)
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn current(&self) -> Result<&str> {
        self.tracks
            .get(self.cursor)
            .map(String::as_str)
            .ok_or(Error::EmptyQueue)
    }

    /// Piste que sélectionnerait `next()`, sans déplacer le curseur
    pub fn peek_next(&self) -> Option<&str> {
        if self.tracks.is_empty() {
            return None;
        }
        match self.tracks.get(self.cursor + 1) {
            Some(track) => Some(track),
            None if self.looping => self.tracks.first().map(String::as_str),
            None => None,
        }
    }

    /// Piste courante suivie des `lookahead` suivantes
    ///
    /// En bouclage la fenêtre repart du début, sans jamais couvrir plus
    /// d'un tour de file.
    pub fn window(&self, lookahead: usize) -> Vec<String> {
        if self.tracks.is_empty() {
            return Vec::new();
        }
        let len = self.tracks.len();
        let reachable = if self.looping {
            len
        } else {
            len - self.cursor
        };
        (0..reachable.min(lookahead.saturating_add(1)))
            .map(|offset| self.tracks[(self.cursor + offset) % len].clone())
            .collect()
    }

    /// Pistes à partir du curseur avec leur position relative (1 = courante)
    pub fn upcoming(&self) -> Vec<(usize, String)> {
        self.tracks
            .iter()
            .skip(self.cursor)
            .enumerate()
            .map(|(i, track)| (i + 1, track.clone()))
            .collect()
    }

    /// Nombre de positions relatives valides
    fn available(&self) -> usize {
        self.tracks.len().saturating_sub(self.cursor)
    }

    /// Traduit une position relative (1 = courante) en index absolu
    ///
    /// Valide si `position >= 1` et `cursor + position - 1 < len`.
    pub fn resolve(&self, position: usize) -> Result<usize> {
        let out_of_range = || Error::IndexOutOfRange {
            position,
            available: self.available(),
        };
        if position == 0 {
            return Err(out_of_range());
        }
        let index = self
            .cursor
            .checked_add(position - 1)
            .ok_or_else(out_of_range)?;
        if index < self.tracks.len() {
            Ok(index)
        } else {
            Err(out_of_range())
        }
    }

    /// Avance le curseur
    ///
    /// Après la dernière piste : retour au début en bouclage, sinon
    /// `PlaylistExhausted` et le curseur reste sur la dernière piste.
    pub fn next(&mut self) -> Result<String> {
        if self.tracks.is_empty() {
            return Err(Error::EmptyQueue);
        }
        if self.cursor + 1 < self.tracks.len() {
            self.cursor += 1;
        } else if self.looping {
            self.cursor = 0;
        } else {
            return Err(Error::PlaylistExhausted);
        }
        Ok(self.tracks[self.cursor].clone())
    }

    /// Recule le curseur, avec retour à la fin depuis la première piste
    /// (indépendamment du bouclage)
    pub fn prev(&mut self) -> Result<String> {
        if self.tracks.is_empty() {
            return Err(Error::EmptyQueue);
        }
        self.cursor = match self.cursor {
            0 => self.tracks.len() - 1,
            c => c - 1,
        };
        Ok(self.tracks[self.cursor].clone())
    }

    /// Insère juste après la piste courante ; dans une file vide la piste
    /// devient la piste courante
    pub fn prepend(&mut self, track: String) {
        if self.tracks.is_empty() {
            self.tracks.push(track);
            self.cursor = 0;
        } else {
            self.tracks.insert(self.cursor + 1, track);
        }
    }

    pub fn append(&mut self, track: String) {
        self.tracks.push(track);
    }

    pub fn extend<I: IntoIterator<Item = String>>(&mut self, tracks: I) {
        self.tracks.extend(tracks);
    }

    /// Supprime la piste à la position relative donnée
    ///
    /// Pour la position 1, la piste suivante prend la place de la courante.
    /// Si la courante était la dernière, le curseur passe sur la nouvelle
    /// dernière piste.
    pub fn remove_at(&mut self, position: usize) -> Result<String> {
        let index = self.resolve(position)?;
        let removed = self.tracks.remove(index);
        self.clamp_cursor();
        Ok(removed)
    }

    /// Supprime la première occurrence (ou toutes) de `track`
    ///
    /// Retourne le nombre de pistes supprimées ; `TrackNotFound` si aucune.
    /// Le curseur continue de désigner la même piste quand elle est
    /// conservée.
    pub fn remove_track(&mut self, track: &str, all: bool) -> Result<usize> {
        let mut indices: Vec<usize> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.as_str() == track)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            return Err(Error::TrackNotFound(track.to_string()));
        }
        if !all {
            indices.truncate(1);
        }

        for &index in indices.iter().rev() {
            self.tracks.remove(index);
            if index < self.cursor {
                self.cursor -= 1;
            }
        }
        self.clamp_cursor();
        Ok(indices.len())
    }

    /// Déplace la piste `from` vers `to` (positions relatives)
    ///
    /// L'ordre relatif des autres pistes est conservé. Le curseur garde son
    /// index absolu : déplacer une piste en position 1 en fait la piste
    /// courante.
    pub fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        let from_index = self.resolve(from)?;
        let to_index = self.resolve(to)?;
        let track = self.tracks.remove(from_index);
        self.tracks.insert(to_index, track);
        Ok(())
    }

    /// Place le curseur sur la position relative donnée
    pub fn jump_to(&mut self, position: usize) -> Result<String> {
        self.cursor = self.resolve(position)?;
        Ok(self.tracks[self.cursor].clone())
    }

    /// Mélange toutes les pistes sauf la courante, qui garde sa place
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.tracks.len() < 2 {
            return;
        }
        let current = self.tracks.remove(self.cursor);
        self.tracks.shuffle(rng);
        self.tracks.insert(self.cursor, current);
    }

    /// Vide la file, curseur remis à 0
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.cursor = 0;
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(Error::VolumeOutOfRange(volume));
        }
        self.volume = volume;
        Ok(())
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn clamp_cursor(&mut self) {
        self.cursor = match self.tracks.len() {
            0 => 0,
            len => self.cursor.min(len - 1),
        };
    }
}

fn sanitize_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        1.0
    }
}
