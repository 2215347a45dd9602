use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error(transparent)]
    Playlist(#[from] pmoplaylist::Error),
    #[error("Sink Error: {0}")]
    Sink(String),
    #[error("Player for guild {0} is gone")]
    PlayerGone(u64),
}

impl ControlError {
    pub fn sink_error(message: &str) -> Self {
        ControlError::Sink(message.to_string())
    }

    /// True when the queue ran out of tracks (end of playback, not a failure).
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            ControlError::Playlist(pmoplaylist::Error::PlaylistExhausted)
        )
    }
}

pub type Result<T> = std::result::Result<T, ControlError>;
