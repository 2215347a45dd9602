use pmoaudiocache::AudioCache;
use pmoplaylist::{
    MetadataCache, PlaylistManager, Prefetcher, SessionDefaults, SqliteStore, StateStore,
};
use pmosource::testing::FakeSource;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    source: Arc<FakeSource>,
    store: Arc<SqliteStore>,
    cache: AudioCache,
    prefetcher: Arc<Prefetcher>,
}

fn fixture(window: usize, tracks: usize) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    for i in 0..tracks {
        source.add_track(&format!("https://t/{i}"), &format!("id{i}"));
    }
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let cache = AudioCache::new(dir.path()).unwrap();
    let metadata = MetadataCache::new(store.clone(), source.clone());
    let prefetcher = Arc::new(Prefetcher::new(
        cache.clone(),
        metadata,
        source.clone(),
        window,
    ));
    Fixture {
        _dir: dir,
        source,
        store,
        cache,
        prefetcher,
    }
}

fn refs(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("https://t/{i}")).collect()
}

/// Attend qu'une condition devienne vraie (tâches de préchargement en fond)
async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn test_prefetch_downloads_window_and_caches_metadata() {
    let f = fixture(3, 4);
    let report = f.prefetcher.prefetch(1, refs(0..4)).await;

    assert_eq!(report.ready.len(), 4);
    assert!(report.failed.is_empty());
    for i in 0..4 {
        assert!(f.cache.is_cached(&format!("id{i}")));
    }

    // Les métadonnées sont désormais dans le stockage
    let meta = f.store.read_metadata("https://t/2").await.unwrap().unwrap();
    assert_eq!(meta.id, "id2");

    // Seconde passe : ni fetch ni téléchargement
    f.prefetcher.prefetch(1, refs(0..4)).await;
    assert_eq!(f.source.fetch_calls("https://t/2"), 1);
    assert_eq!(f.source.total_downloads(), 4);
}

#[tokio::test]
async fn test_failures_are_isolated_and_retried() {
    let f = fixture(3, 4);
    f.source.fail_track("https://t/1");

    let report = f.prefetcher.prefetch(1, refs(0..4)).await;
    assert_eq!(report.ready, vec!["https://t/0", "https://t/2", "https://t/3"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "https://t/1");

    f.source.heal_track("https://t/1");
    let report = f.prefetcher.prefetch(1, refs(1..2)).await;
    assert_eq!(report.ready, vec!["https://t/1"]);
    assert!(f.cache.is_cached("id1"));
}

#[tokio::test]
async fn test_duplicate_refs_are_downloaded_once() {
    let f = fixture(3, 2);
    let window = vec![
        "https://t/0".to_string(),
        "https://t/1".to_string(),
        "https://t/0".to_string(),
    ];
    let report = f.prefetcher.prefetch(1, window).await;
    assert_eq!(report.ready.len(), 2);
    assert_eq!(f.source.download_calls("https://t/0"), 1);
}

#[tokio::test]
async fn test_resolve_and_cached_path() {
    let f = fixture(3, 1);
    assert!(f.prefetcher.cached_path("https://t/0").await.unwrap().is_none());

    let path = f.prefetcher.resolve("https://t/0").await.unwrap();
    assert_eq!(
        f.prefetcher.cached_path("https://t/0").await.unwrap(),
        Some(path)
    );

    let missing = f.prefetcher.resolve("https://t/unknown").await.unwrap_err();
    assert!(!missing.is_transient());
}

#[tokio::test]
async fn test_mutations_warm_the_window_in_background() {
    let f = fixture(2, 6);
    let manager = PlaylistManager::new(
        f.store.clone(),
        Some(f.prefetcher.clone()),
        SessionDefaults::default(),
    );
    let session = manager.get_or_create(1).await.unwrap();

    session.append_songs(refs(0..6)).await.unwrap();
    // Fenêtre : courante + 2
    let cache = f.cache.clone();
    assert!(eventually(|| (0..3).all(|i| cache.is_cached(&format!("id{i}")))).await);
    assert!(!f.cache.is_cached("id3"));

    session.next_song().await.unwrap();
    assert!(eventually(|| cache.is_cached("id3")).await);
    assert!(!f.cache.is_cached("id4"));
}

#[tokio::test]
async fn test_changes_outside_window_do_not_trigger() {
    let f = fixture(1, 5);
    let manager = PlaylistManager::new(
        f.store.clone(),
        Some(f.prefetcher.clone()),
        SessionDefaults::default(),
    );
    let session = manager.get_or_create(1).await.unwrap();
    session.append_songs(refs(0..4)).await.unwrap();
    let cache = f.cache.clone();
    assert!(eventually(|| cache.is_cached("id1")).await);

    let fetches = f.source.fetch_calls("https://t/0");
    // Ajout en fin de file : la fenêtre (0, 1) ne change pas
    session.append_song("https://t/4").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(f.source.fetch_calls("https://t/0"), fetches);
    assert!(!f.cache.is_cached("id4"));
}

#[tokio::test]
async fn test_restored_session_prefetches_once() {
    let f = fixture(1, 3);
    {
        let manager = PlaylistManager::new(f.store.clone(), None, SessionDefaults::default());
        let session = manager.get_or_create(8).await.unwrap();
        session.append_songs(refs(0..3)).await.unwrap();
        session.next_song().await.unwrap();
    }
    assert_eq!(f.source.total_downloads(), 0);

    let manager = PlaylistManager::new(
        f.store.clone(),
        Some(f.prefetcher.clone()),
        SessionDefaults::default(),
    );
    manager.get_or_create(8).await.unwrap();

    let cache = f.cache.clone();
    assert!(eventually(|| cache.is_cached("id1") && cache.is_cached("id2")).await);
    assert!(!f.cache.is_cached("id0"));
}
