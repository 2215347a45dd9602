//! Types d'erreurs du cache audio

use pmosource::SourceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    /// L'identifiant ne peut pas servir de nom de fichier
    #[error("Invalid stable id: {0:?}")]
    InvalidId(String),

    #[error("Download failed: {0}")]
    Source(#[from] SourceError),

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Une nouvelle tentative plus tard peut réussir
    pub fn is_transient(&self) -> bool {
        match self {
            CacheError::InvalidId(_) => false,
            CacheError::Source(e) => e.is_transient(),
            CacheError::Io(_) => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
