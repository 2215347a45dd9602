use pmoplaylist::{SessionRecord, SqliteStore, StateStore};
use pmosource::TrackMetadata;

fn record(guild_id: u64, tracks: &[&str], idx: usize, volume: f32) -> SessionRecord {
    SessionRecord {
        guild_id,
        playlist: tracks.iter().map(|t| t.to_string()).collect(),
        idx,
        volume,
    }
}

#[tokio::test]
async fn test_unknown_guild_reads_none() {
    let store = SqliteStore::in_memory().unwrap();
    assert!(store.read_session(42).await.unwrap().is_none());
    assert!(store.read_metadata("https://t/x").await.unwrap().is_none());
    assert!(store.last_updated(42).unwrap().is_none());
}

#[tokio::test]
async fn test_session_round_trip_and_replace() {
    let store = SqliteStore::in_memory().unwrap();

    let first = record(7, &["a", "b", "a"], 2, 0.25);
    store.write_session(&first).await.unwrap();
    assert_eq!(store.read_session(7).await.unwrap(), Some(first));

    // Un second enregistrement remplace le premier
    let second = record(7, &[], 0, 1.0);
    store.write_session(&second).await.unwrap();
    assert_eq!(store.read_session(7).await.unwrap(), Some(second));
    assert!(store.last_updated(7).unwrap().is_some());
}

#[tokio::test]
async fn test_guild_ids_and_delete() {
    let store = SqliteStore::in_memory().unwrap();
    for id in [30, 10, 20] {
        store.write_session(&record(id, &["x"], 0, 0.5)).await.unwrap();
    }
    assert_eq!(store.guild_ids().unwrap(), vec![10, 20, 30]);

    assert!(store.delete_session(20).unwrap());
    assert!(!store.delete_session(20).unwrap());
    assert_eq!(store.guild_ids().unwrap(), vec![10, 30]);
}

#[tokio::test]
async fn test_large_guild_ids_survive() {
    let store = SqliteStore::in_memory().unwrap();
    let snowflake = 1_152_921_504_606_846_976u64;
    store
        .write_session(&record(snowflake, &["x"], 0, 0.5))
        .await
        .unwrap();
    assert_eq!(store.read_session(snowflake).await.unwrap().unwrap().guild_id, snowflake);
}

#[tokio::test]
async fn test_metadata_round_trip() {
    let store = SqliteStore::in_memory().unwrap();
    let meta = TrackMetadata {
        id: "abc".into(),
        title: "Song".into(),
        duration_secs: 245,
        url: "https://www.youtube.com/watch?v=abc".into(),
    };
    store.write_metadata("https://youtu.be/abc", &meta).await.unwrap();
    assert_eq!(
        store.read_metadata("https://youtu.be/abc").await.unwrap(),
        Some(meta)
    );
}

#[tokio::test]
async fn test_file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("playlists.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        store.write_session(&record(1, &["a", "b"], 1, 0.8)).await.unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(
        store.read_session(1).await.unwrap(),
        Some(record(1, &["a", "b"], 1, 0.8))
    );
}
