//! Types d'erreurs pour pmoplaylist

/// Erreurs de gestion des files d'attente
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Aucune piste courante
    #[error("Queue is empty")]
    EmptyQueue,

    /// Fin de file atteinte sans bouclage
    #[error("End of playlist reached")]
    PlaylistExhausted,

    #[error("Position {position} is out of range ({available} tracks from the current one)")]
    IndexOutOfRange { position: usize, available: usize },

    #[error("Track not found in queue: {0}")]
    TrackNotFound(String),

    #[error("Volume {0} is out of range (expected 0.0..=1.0)")]
    VolumeOutOfRange(f32),

    #[error("Session for guild {0} has been evicted")]
    SessionEvicted(u64),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Audio cache error: {0}")]
    Cache(#[from] pmoaudiocache::CacheError),

    #[error("Source error: {0}")]
    Source(#[from] pmosource::SourceError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Erreur réseau ou disque passagère : un nouvel essai peut réussir
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Cache(e) => e.is_transient(),
            Error::Source(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Type Result spécialisé pour pmoplaylist
pub type Result<T> = std::result::Result<T, Error>;
