use pmoaudiocache::{AudioCache, CacheError};
use pmosource::testing::FakeSource;
use pmosource::{MetadataFetcher, SourceError, TrackMetadata};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn create_test_cache() -> (TempDir, AudioCache) {
    let temp_dir = tempfile::tempdir().unwrap();
    let cache = AudioCache::new(temp_dir.path()).unwrap();
    (temp_dir, cache)
}

#[tokio::test]
async fn test_audio_cache_creation() {
    let (temp_dir, cache) = create_test_cache();
    assert_eq!(cache.cache_dir(), temp_dir.path());
    assert!(!cache.is_cached("anything"));
}

#[tokio::test]
async fn test_ensure_downloads_once_then_hits() {
    let (temp_dir, cache) = create_test_cache();
    let source = FakeSource::new();
    let meta = source.add_track("https://t/a", "aaa");

    let path = cache.ensure("https://t/a", &meta, &source).await.unwrap();
    assert_eq!(path, temp_dir.path().join("aaa.mp3"));
    assert_eq!(cache.local_path_for("aaa"), Some(path.clone()));
    assert_eq!(cache.find("aaa").await.unwrap(), Some(path.clone()));
    assert_eq!(cache.find("bbb").await.unwrap(), None);

    // Deuxième appel : fichier déjà présent, pas de téléchargement
    let again = cache.ensure("https://t/a", &meta, &source).await.unwrap();
    assert_eq!(again, path);
    assert_eq!(source.download_calls("https://t/a"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ensure_coalesces() {
    let (_temp_dir, cache) = create_test_cache();
    let source = Arc::new(FakeSource::new().with_download_delay(Duration::from_millis(50)));
    let meta = source.add_track("https://t/b", "bbb");

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            let source = source.clone();
            let meta = meta.clone();
            tokio::spawn(async move { cache.ensure("https://t/b", &meta, source.as_ref()).await })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        assert!(result.unwrap().is_ok());
    }

    assert_eq!(source.download_calls("https://t/b"), 1);
    // Le verrou a été libéré une fois tout le monde servi
    assert!(!cache.in_flight("bbb").await);
}

#[tokio::test]
async fn test_failure_is_retried_on_next_call() {
    let (_temp_dir, cache) = create_test_cache();
    let source = FakeSource::new();
    let meta = source.add_track("https://t/c", "ccc");
    source.fail_track("https://t/c");

    let err = cache.ensure("https://t/c", &meta, &source).await.unwrap_err();
    assert!(matches!(err, CacheError::Source(SourceError::Network(_))));
    assert!(err.is_transient());
    assert!(!cache.is_cached("ccc"));
    assert!(!cache.in_flight("ccc").await);

    source.heal_track("https://t/c");
    cache.ensure("https://t/c", &meta, &source).await.unwrap();
    assert!(cache.is_cached("ccc"));
    assert_eq!(source.download_calls("https://t/c"), 2);
}

#[tokio::test]
async fn test_invalid_id_is_rejected_before_download() {
    let (_temp_dir, cache) = create_test_cache();
    let source = FakeSource::new();
    source.add_track("https://t/d", "ddd");
    let meta = TrackMetadata {
        id: "../escape".into(),
        ..source.fetch("https://t/d").await.unwrap()
    };

    let err = cache.ensure("https://t/d", &meta, &source).await.unwrap_err();
    assert!(matches!(err, CacheError::InvalidId(_)));
    assert!(!err.is_transient());
    assert_eq!(source.download_calls("https://t/d"), 0);
}

#[tokio::test]
async fn test_file_present_on_disk_counts_as_cached() {
    let (temp_dir, cache) = create_test_cache();
    std::fs::write(temp_dir.path().join("eee.opus"), b"audio").unwrap();

    let source = FakeSource::new();
    let meta = source.add_track("https://t/e", "eee");

    let path = cache.ensure("https://t/e", &meta, &source).await.unwrap();
    assert_eq!(path, temp_dir.path().join("eee.opus"));
    assert_eq!(source.download_calls("https://t/e"), 0);
}
