//! Extension pour lire la configuration de la source yt-dlp depuis pmoconfig

use crate::{YoutubeSource, DEFAULT_AUDIO_FORMAT, DEFAULT_BINARY};
use pmoconfig::Config;

/// Trait d'extension de `pmoconfig::Config` pour la section `sources.youtube`
///
/// ```rust,ignore
/// use pmoyoutube::YoutubeConfigExt;
///
/// let source = config.youtube_source();
/// ```
pub trait YoutubeConfigExt {
    /// Exécutable yt-dlp (`sources.youtube.binary`)
    fn youtube_binary(&self) -> String;

    /// Format audio extrait (`sources.youtube.audio_format`)
    fn youtube_audio_format(&self) -> String;

    /// Téléchargements sous `nice -n 19` (`sources.youtube.low_priority`)
    fn youtube_low_priority(&self) -> bool;

    /// Construit une [`YoutubeSource`] à partir des trois valeurs ci-dessus
    fn youtube_source(&self) -> YoutubeSource {
        YoutubeSource::new()
            .with_binary(self.youtube_binary())
            .with_audio_format(self.youtube_audio_format())
            .with_low_priority(self.youtube_low_priority())
    }
}

impl YoutubeConfigExt for Config {
    fn youtube_binary(&self) -> String {
        self.get_string(&["sources", "youtube", "binary"], DEFAULT_BINARY)
    }

    fn youtube_audio_format(&self) -> String {
        self.get_string(&["sources", "youtube", "audio_format"], DEFAULT_AUDIO_FORMAT)
    }

    fn youtube_low_priority(&self) -> bool {
        self.get_bool(&["sources", "youtube", "low_priority"], true)
    }
}
