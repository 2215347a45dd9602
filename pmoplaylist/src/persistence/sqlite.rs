//! Implémentation SQLite de [`StateStore`]

use super::{SessionRecord, StateStore};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pmosource::TrackMetadata;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

fn db_error(context: &'static str) -> impl Fn(rusqlite::Error) -> Error {
    move |e| Error::PersistenceError(format!("{context}: {e}"))
}

/// Une base pour toutes les guildes
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Ouvre (ou crée) la base et ses tables
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::PersistenceError(format!("Failed to create directory: {e}"))
            })?;
        }
        let conn = Connection::open(db_path).map_err(db_error("Failed to open database"))?;
        debug!(path = %db_path.display(), "Opened session database");
        Self::init(conn)
    }

    /// Base en mémoire, pour les tests et les outils
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_error("Failed to open database"))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS state (
                guild_id INTEGER PRIMARY KEY,
                playlist TEXT NOT NULL,
                idx INTEGER NOT NULL,
                volume REAL NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS metadata (
                track_ref TEXT PRIMARY KEY,
                id TEXT NOT NULL,
                title TEXT NOT NULL,
                duration INTEGER NOT NULL,
                url TEXT NOT NULL
            );",
        )
        .map_err(db_error("Failed to create tables"))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Guildes ayant un état enregistré
    pub fn guild_ids(&self) -> Result<Vec<u64>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT guild_id FROM state ORDER BY guild_id")
            .map_err(db_error("Failed to prepare statement"))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(db_error("Failed to list sessions"))?;

        let ids = rows
            .map(|r| r.map(|id| id as u64))
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_error("Failed to read session id"))?;
        Ok(ids)
    }

    /// Date de la dernière écriture de l'état d'une guilde
    pub fn last_updated(&self, guild_id: u64) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT updated_at FROM state WHERE guild_id = ?1",
                params![guild_id as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error("Failed to read session"))?;

        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| Error::PersistenceError(format!("Invalid timestamp {s}: {e}")))
        })
        .transpose()
    }

    /// Supprime l'état enregistré ; retourne `false` s'il n'existait pas
    pub fn delete_session(&self, guild_id: u64) -> Result<bool> {
        let n = self
            .conn()
            .execute(
                "DELETE FROM state WHERE guild_id = ?1",
                params![guild_id as i64],
            )
            .map_err(db_error("Failed to delete session"))?;
        Ok(n > 0)
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn read_session(&self, guild_id: u64) -> Result<Option<SessionRecord>> {
        let row: Option<(String, i64, f64)> = self
            .conn()
            .query_row(
                "SELECT playlist, idx, volume FROM state WHERE guild_id = ?1",
                params![guild_id as i64],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(db_error("Failed to load session"))?;

        let Some((playlist, idx, volume)) = row else {
            return Ok(None);
        };

        let playlist: Vec<String> = serde_json::from_str(&playlist).map_err(|e| {
            Error::PersistenceError(format!("Corrupted playlist for guild {guild_id}: {e}"))
        })?;

        Ok(Some(SessionRecord {
            guild_id,
            playlist,
            idx: idx.max(0) as usize,
            volume: volume as f32,
        }))
    }

    async fn write_session(&self, record: &SessionRecord) -> Result<()> {
        let playlist = serde_json::to_string(&record.playlist)
            .map_err(|e| Error::PersistenceError(format!("Failed to encode playlist: {e}")))?;

        self.conn()
            .execute(
                "INSERT OR REPLACE INTO state (guild_id, playlist, idx, volume, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.guild_id as i64,
                    playlist,
                    record.idx as i64,
                    record.volume as f64,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(db_error("Failed to save session"))?;
        Ok(())
    }

    async fn read_metadata(&self, track_ref: &str) -> Result<Option<TrackMetadata>> {
        self.conn()
            .query_row(
                "SELECT id, title, duration, url FROM metadata WHERE track_ref = ?1",
                params![track_ref],
                |row| {
                    Ok(TrackMetadata {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        duration_secs: row.get::<_, i64>(2)?.max(0) as u64,
                        url: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(db_error("Failed to load metadata"))
    }

    async fn write_metadata(&self, track_ref: &str, metadata: &TrackMetadata) -> Result<()> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO metadata (track_ref, id, title, duration, url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    track_ref,
                    metadata.id,
                    metadata.title,
                    metadata.duration_secs as i64,
                    metadata.url,
                ],
            )
            .map_err(db_error("Failed to save metadata"))?;
        Ok(())
    }
}
