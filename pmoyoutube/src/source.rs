use async_trait::async_trait;
use pmosource::{
    AudioDownloader, MetadataFetcher, Result, SourceError, TrackMetadata, stem_name,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const DEFAULT_BINARY: &str = "yt-dlp";
pub const DEFAULT_AUDIO_FORMAT: &str = "mp3";

/// Hidden directory (inside the cache directory) receiving in-progress downloads
const PARTIAL_DIR: &str = ".partial";

/// Subset of the `--dump-single-json` output we rely on
#[derive(Debug, Deserialize)]
struct YtInfo {
    id: String,
    title: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    webpage_url: Option<String>,
}

/// Track source backed by the `yt-dlp` executable
#[derive(Debug, Clone)]
pub struct YoutubeSource {
    binary: String,
    audio_format: String,
    low_priority: bool,
}

impl Default for YoutubeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl YoutubeSource {
    pub fn new() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            audio_format: DEFAULT_AUDIO_FORMAT.to_string(),
            low_priority: true,
        }
    }

    /// Path or name of the yt-dlp executable
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_audio_format(mut self, format: impl Into<String>) -> Self {
        self.audio_format = format.into();
        self
    }

    /// Run downloads under `nice -n 19`
    pub fn with_low_priority(mut self, low_priority: bool) -> Self {
        self.low_priority = low_priority;
        self
    }

    fn command(&self, deprioritize: bool) -> Command {
        let mut cmd = if deprioritize {
            let mut cmd = Command::new("nice");
            cmd.args(["-n", "19", &self.binary]);
            cmd
        } else {
            Command::new(&self.binary)
        };
        cmd.kill_on_drop(true);
        cmd
    }

    async fn run(&self, mut cmd: Command, track_ref: &str) -> Result<Output> {
        let output = cmd.output().await?;
        if output.status.success() {
            Ok(output)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(classify_failure(track_ref, &stderr))
        }
    }
}

#[async_trait]
impl MetadataFetcher for YoutubeSource {
    async fn fetch(&self, track_ref: &str) -> Result<TrackMetadata> {
        debug!(track = %track_ref, "Fetching metadata with yt-dlp");

        let mut cmd = self.command(false);
        cmd.args([
            "--dump-single-json",
            "--no-playlist",
            "--skip-download",
            "--no-warnings",
            track_ref,
        ]);

        let output = self.run(cmd, track_ref).await?;
        parse_metadata(track_ref, &output.stdout)
    }
}

#[async_trait]
impl AudioDownloader for YoutubeSource {
    async fn download(&self, track_ref: &str, dest_stem: &Path) -> Result<PathBuf> {
        let stem = stem_name(dest_stem)?;
        let cache_dir = dest_stem.parent().unwrap_or(Path::new("."));
        let partial_dir = cache_dir.join(PARTIAL_DIR);
        tokio::fs::create_dir_all(&partial_dir).await?;
        remove_partials(&partial_dir, &stem).await;

        let template = partial_dir.join(format!("{stem}.%(ext)s"));
        info!(track = %track_ref, stable_id = %stem, "Downloading audio");

        let mut cmd = self.command(self.low_priority);
        cmd.args([
            "--format",
            "bestaudio/best",
            "--extract-audio",
            "--audio-format",
            &self.audio_format,
            "--no-playlist",
            "--no-progress",
            "--output",
        ]);
        cmd.arg(&template).arg(track_ref);

        if let Err(err) = self.run(cmd, track_ref).await {
            remove_partials(&partial_dir, &stem).await;
            return Err(err);
        }

        let produced = find_with_stem(&partial_dir, &stem, true).await?.ok_or_else(|| {
            SourceError::InvalidResponse(format!("yt-dlp produced no file for {track_ref}"))
        })?;
        let file_name = produced
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| SourceError::InvalidResponse(produced.display().to_string()))?;
        let dest = cache_dir.join(file_name);

        tokio::fs::rename(&produced, &dest).await?;
        debug!(path = %dest.display(), "Download complete");
        Ok(dest)
    }
}

/// Parses the JSON printed by `--dump-single-json`
pub(crate) fn parse_metadata(track_ref: &str, stdout: &[u8]) -> Result<TrackMetadata> {
    let info: YtInfo = serde_json::from_slice(stdout)
        .map_err(|e| SourceError::InvalidResponse(format!("{track_ref}: {e}")))?;

    if info.id.is_empty() || info.id.starts_with('.') || info.id.contains(['/', '\\']) {
        return Err(SourceError::InvalidResponse(format!(
            "{track_ref}: unusable id {:?}",
            info.id
        )));
    }

    Ok(TrackMetadata {
        duration_secs: info.duration.map(|d| d.max(0.0).round() as u64).unwrap_or(0),
        url: info.webpage_url.unwrap_or_else(|| track_ref.to_string()),
        id: info.id,
        title: info.title,
    })
}

/// Maps yt-dlp's stderr to a [`SourceError`]
pub(crate) fn classify_failure(track_ref: &str, stderr: &str) -> SourceError {
    const MISSING: [&str; 6] = [
        "Video unavailable",
        "Private video",
        "This video has been removed",
        "Unsupported URL",
        "is not a valid URL",
        "HTTP Error 404",
    ];

    let reason = stderr
        .lines()
        .rev()
        .find(|l| l.contains("ERROR"))
        .unwrap_or(stderr)
        .trim()
        .to_string();

    if MISSING.iter().any(|m| stderr.contains(m)) {
        SourceError::NotFound(format!("{track_ref}: {reason}"))
    } else {
        warn!(track = %track_ref, reason = %reason, "yt-dlp failed");
        SourceError::Network(format!("{track_ref}: {reason}"))
    }
}

/// First file of `dir` named `{stem}.*`; with `complete_only`, yt-dlp's
/// `.part` / `.ytdl` leftovers are skipped
async fn find_with_stem(dir: &Path, stem: &str, complete_only: bool) -> Result<Option<PathBuf>> {
    let prefix = format!("{stem}.");
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(&prefix) {
            continue;
        }
        if complete_only && (name.ends_with(".part") || name.ends_with(".ytdl")) {
            continue;
        }
        return Ok(Some(entry.path()));
    }
    Ok(None)
}

async fn remove_partials(dir: &Path, stem: &str) {
    while let Ok(Some(path)) = find_with_stem(dir, stem, false).await {
        if tokio::fs::remove_file(&path).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dump_json() {
        let json = br#"{"id":"dQw4w9WgXcQ","title":"Never Gonna","duration":212.6,
            "webpage_url":"https://www.youtube.com/watch?v=dQw4w9WgXcQ","formats":[]}"#;
        let meta = parse_metadata("https://youtu.be/dQw4w9WgXcQ", json).unwrap();

        assert_eq!(meta.id, "dQw4w9WgXcQ");
        assert_eq!(meta.title, "Never Gonna");
        assert_eq!(meta.duration_secs, 213);
        assert_eq!(meta.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn missing_fields_and_bad_ids() {
        let meta = parse_metadata("ref", br#"{"id":"abc","title":"Live"}"#).unwrap();
        assert_eq!(meta.duration_secs, 0);
        assert_eq!(meta.url, "ref");

        assert!(matches!(
            parse_metadata("ref", br#"{"id":"../x","title":"t"}"#),
            Err(SourceError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_metadata("ref", b"not json"),
            Err(SourceError::InvalidResponse(_))
        ));
    }

    #[test]
    fn classifies_stderr() {
        let gone = "WARNING: foo\nERROR: [youtube] abc: Video unavailable\n";
        assert!(matches!(
            classify_failure("r", gone),
            SourceError::NotFound(msg) if msg.contains("Video unavailable")
        ));

        let net = "ERROR: Unable to download webpage: <urlopen error timed out>";
        assert!(matches!(classify_failure("r", net), SourceError::Network(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_a_yt_dlp_compatible_binary() {
        use std::os::unix::fs::PermissionsExt;

        let bin_dir = tempfile::tempdir().unwrap();
        let script = bin_dir.path().join("fake-yt-dlp");
        std::fs::write(
            &script,
            r#"#!/bin/sh
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --dump-single-json)
      echo '{"id":"abc123","title":"Song","duration":61.4,"webpage_url":"https://x.test/abc123"}'
      exit 0;;
    --output) shift; out="$1";;
  esac
  shift
done
f=$(echo "$out" | sed 's/%(ext)s/mp3/')
echo data > "$f"
"#,
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let source = YoutubeSource::new()
            .with_binary(script.to_str().unwrap())
            .with_low_priority(false);

        let meta = source.fetch("https://x.test/abc123").await.unwrap();
        assert_eq!(meta.id, "abc123");
        assert_eq!(meta.duration_secs, 61);

        let cache = tempfile::tempdir().unwrap();
        let path = source
            .download("https://x.test/abc123", &cache.path().join("abc123"))
            .await
            .unwrap();
        assert_eq!(path, cache.path().join("abc123.mp3"));
        assert!(path.exists());
        assert!(find_with_stem(&cache.path().join(PARTIAL_DIR), "abc123", false)
            .await
            .unwrap()
            .is_none());
    }
}
