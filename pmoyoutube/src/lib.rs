//! # pmoyoutube - yt-dlp track source
//!
//! Implements [`pmosource::MetadataFetcher`] and [`pmosource::AudioDownloader`]
//! on top of the `yt-dlp` command line tool.
//!
//! - metadata: `yt-dlp --dump-single-json --skip-download <url>`
//! - audio: `yt-dlp -x --audio-format <fmt> <url>` into a hidden `.partial`
//!   directory, then renamed next to the other cached files so that a
//!   half-written download never matches `{id}.*`
//!
//! Downloads can run under `nice -n 19` so that transcoding never competes
//! with playback for CPU.
//!
//! ```no_run
//! use pmoyoutube::YoutubeSource;
//! use pmosource::MetadataFetcher;
//!
//! # async fn demo() -> pmosource::Result<()> {
//! let source = YoutubeSource::new();
//! let meta = source.fetch("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
//! println!("{} ({}s)", meta.title, meta.duration_secs);
//! # Ok(())
//! # }
//! ```

mod source;

#[cfg(feature = "pmoconfig")]
pub mod config_ext;

pub use source::{YoutubeSource, DEFAULT_AUDIO_FORMAT, DEFAULT_BINARY};

#[cfg(feature = "pmoconfig")]
pub use config_ext::YoutubeConfigExt;
