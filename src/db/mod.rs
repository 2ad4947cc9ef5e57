pub mod models;
pub mod queries;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Schema incomplete: missing table '{0}'")]
    SchemaIncomplete(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

pub struct Database {
    pub conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        // WAL mode for better concurrent read performance
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.migrate()?;
        Ok(())
    }

    fn migrate(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if version < 1 {
            self.migrate_v1()?;
        }
        if version < 2 {
            self.migrate_v2()?;
        }

        self.conn.pragma_update(None, "user_version", 2)?;
        Ok(())
    }

    /// Current schema version as recorded in `user_version`.
    pub fn schema_version(&self) -> Result<i32> {
        let v = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        Ok(v)
    }

    /// V1: Core catalog schema — artists, albums, songs, settings.
    ///
    /// Artist and album identity is enforced with unique constraints so that
    /// concurrent get-or-create never produces two rows for the same key.
    /// Song artist_id / album_id are kept as plain integers; referential
    /// integrity is maintained by the import engine and the reconcile pass
    /// (songs may legitimately reference artists that no longer exist, which
    /// is exactly what `reconcile` repairs).
    fn migrate_v1(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS artists (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL UNIQUE,
                bio             TEXT,
                avatar          TEXT,
                verified        INTEGER NOT NULL DEFAULT 0,
                total_plays     INTEGER NOT NULL DEFAULT 0,
                total_downloads INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS albums (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL,
                artist_id       INTEGER NOT NULL,
                release_date    TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(title, artist_id)
            );

            CREATE INDEX IF NOT EXISTS idx_albums_artist ON albums(artist_id);

            CREATE TABLE IF NOT EXISTS songs (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL,
                artist_id       INTEGER NOT NULL,
                album_id        INTEGER,

                -- Free-text artist name carried over from the source record,
                -- kept alongside the FK (the reconcile pass reads it back)
                artist_name     TEXT,

                file_path       TEXT,
                duration        INTEGER NOT NULL DEFAULT 0,
                file_size       INTEGER,
                plays           INTEGER NOT NULL DEFAULT 0,
                downloads       INTEGER NOT NULL DEFAULT 0,
                lyrics          TEXT,
                UNIQUE(title, artist_id)
            );

            CREATE INDEX IF NOT EXISTS idx_songs_artist ON songs(artist_id);
            CREATE INDEX IF NOT EXISTS idx_songs_album ON songs(album_id);

            CREATE TABLE IF NOT EXISTS settings (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )?;
        Ok(())
    }

    /// V2: Optional song columns added by a later installation step.
    fn migrate_v2(&self) -> Result<()> {
        let new_columns = [
            "cover_art TEXT",
            "status TEXT",
            "is_featured INTEGER DEFAULT 0",
            "is_explicit INTEGER DEFAULT 0",
            "upload_date TEXT",
        ];

        for col in &new_columns {
            // SQLite doesn't have IF NOT EXISTS for ALTER TABLE ADD COLUMN,
            // so we ignore "duplicate column" errors
            let sql = format!("ALTER TABLE songs ADD COLUMN {col}");
            match self.conn.execute(&sql, []) {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ffi::ErrorCode::Unknown
                        || err.extended_code == 1 =>
                {
                    // Column already exists — fine
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// True iff the named table exists in the open database.
    ///
    /// Purely informational; a metadata query failure propagates as an error
    /// rather than reading as "absent".
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            rusqlite::params![table],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// True iff the named column exists on the given table.
    /// A missing table simply yields false.
    pub fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
            rusqlite::params![table, column],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

/// Probed capabilities of the songs table: which optional columns are
/// present on this particular database.
///
/// A database provisioned by an older installation may lack any of these;
/// the import engine shapes its INSERT accordingly instead of failing.
#[derive(Debug, Clone, Copy)]
pub struct SongColumns {
    pub cover_art: bool,
    pub status: bool,
    pub is_featured: bool,
    pub is_explicit: bool,
    pub upload_date: bool,
}

impl SongColumns {
    pub fn probe(db: &Database) -> Result<Self> {
        if !db.table_exists("songs")? {
            return Err(DbError::SchemaIncomplete("songs".to_string()));
        }
        Ok(Self {
            cover_art: db.column_exists("songs", "cover_art")?,
            status: db.column_exists("songs", "status")?,
            is_featured: db.column_exists("songs", "is_featured")?,
            is_explicit: db.column_exists("songs", "is_explicit")?,
            upload_date: db.column_exists("songs", "upload_date")?,
        })
    }

    /// Names of the optional columns that are missing, for operator display.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.cover_art {
            out.push("cover_art");
        }
        if !self.status {
            out.push("status");
        }
        if !self.is_featured {
            out.push("is_featured");
        }
        if !self.is_explicit {
            out.push("is_explicit");
        }
        if !self.upload_date {
            out.push("upload_date");
        }
        out
    }
}
