use super::models::{Artist, ArtistSynthesis, CatalogStats, NewSong, Song};
use super::{Database, Result, SongColumns};
use rusqlite::{params, Connection, ToSql};

/// Stored status for every migrated song.
const STATUS_APPROVED: &str = "approved";

/// Look up an artist id by exact name. None if absent.
pub fn find_artist_id(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let result = conn.query_row(
        "SELECT id FROM artists WHERE name = ?1",
        params![name],
        |row| row.get(0),
    );
    match result {
        Ok(id) => Ok(Some(id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Get or create an artist by name. Returns the artist id.
///
/// Insert-on-conflict-do-nothing followed by a re-select, so two concurrent
/// callers can never create two rows for the same name.
pub fn get_or_create_artist(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO artists (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        params![name],
    )?;
    let id = conn.query_row(
        "SELECT id FROM artists WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Get or create an album by (title, artist). Returns the album id.
pub fn get_or_create_album(conn: &Connection, title: &str, artist_id: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO albums (title, artist_id) VALUES (?1, ?2)
         ON CONFLICT(title, artist_id) DO NOTHING",
        params![title, artist_id],
    )?;
    let id = conn.query_row(
        "SELECT id FROM albums WHERE title = ?1 AND artist_id = ?2",
        params![title, artist_id],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// True iff a song with this (title, artist) natural key already exists.
pub fn song_exists(conn: &Connection, title: &str, artist_id: i64) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM songs WHERE title = ?1 AND artist_id = ?2)",
        params![title, artist_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Insert a song, writing only the optional columns present on this
/// database. Returns the song id.
pub fn insert_song(conn: &Connection, s: &NewSong, cols: &SongColumns) -> Result<i64> {
    let upload_date = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let mut columns: Vec<&str> = vec![
        "title",
        "artist_id",
        "album_id",
        "artist_name",
        "file_path",
        "duration",
        "file_size",
        "plays",
        "downloads",
        "lyrics",
    ];
    let mut values: Vec<&dyn ToSql> = vec![
        &s.title,
        &s.artist_id,
        &s.album_id,
        &s.artist_name,
        &s.file_path,
        &s.duration,
        &s.file_size,
        &s.plays,
        &s.downloads,
        &s.lyrics,
    ];

    if cols.cover_art {
        columns.push("cover_art");
        values.push(&s.cover_art);
    }
    if cols.status {
        columns.push("status");
        values.push(&STATUS_APPROVED);
    }
    if cols.is_featured {
        columns.push("is_featured");
        values.push(&s.is_featured);
    }
    if cols.is_explicit {
        columns.push("is_explicit");
        values.push(&s.is_explicit);
    }
    if cols.upload_date {
        columns.push("upload_date");
        values.push(&upload_date);
    }

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO songs ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    conn.execute(&sql, &values[..])?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Read a song by its natural key (core columns only).
    pub fn get_song(&self, title: &str, artist_id: i64) -> Result<Option<Song>> {
        let result = self.conn.query_row(
            "SELECT id, title, artist_id, album_id, duration, plays, downloads, file_path
             FROM songs WHERE title = ?1 AND artist_id = ?2",
            params![title, artist_id],
            |row| {
                Ok(Song {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    artist_id: row.get(2)?,
                    album_id: row.get(3)?,
                    duration: row.get(4)?,
                    plays: row.get(5)?,
                    downloads: row.get(6)?,
                    file_path: row.get(7)?,
                })
            },
        );
        match result {
            Ok(song) => Ok(Some(song)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read an artist by exact name.
    pub fn get_artist_by_name(&self, name: &str) -> Result<Option<Artist>> {
        let result = self.conn.query_row(
            "SELECT id, name, bio, avatar, verified, total_plays, total_downloads
             FROM artists WHERE name = ?1",
            params![name],
            |row| {
                Ok(Artist {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    bio: row.get(2)?,
                    avatar: row.get(3)?,
                    verified: row.get(4)?,
                    total_plays: row.get(5)?,
                    total_downloads: row.get(6)?,
                })
            },
        );
        match result {
            Ok(artist) => Ok(Some(artist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// True iff an artist row with this id exists.
    pub fn artist_exists(&self, artist_id: i64) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM artists WHERE id = ?1)",
            params![artist_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// All distinct artist ids referenced by songs, in ascending order.
    pub fn distinct_song_artist_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT artist_id FROM songs
             WHERE artist_id IS NOT NULL ORDER BY artist_id",
        )?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Aggregate song data for one artist id: a representative name plus
    /// count and play/download sums.
    pub fn artist_song_summary(&self, artist_id: i64) -> Result<ArtistSynthesis> {
        let summary = self.conn.query_row(
            "SELECT
                (SELECT artist_name FROM songs
                 WHERE artist_id = ?1 AND artist_name IS NOT NULL LIMIT 1),
                COUNT(*),
                COALESCE(SUM(plays), 0),
                COALESCE(SUM(downloads), 0)
             FROM songs WHERE artist_id = ?1",
            params![artist_id],
            |row| {
                Ok(ArtistSynthesis {
                    artist_id,
                    name: row.get(0)?,
                    song_count: row.get(1)?,
                    total_plays: row.get(2)?,
                    total_downloads: row.get(3)?,
                })
            },
        )?;
        Ok(summary)
    }

    /// Insert an artist preserving an explicit id, so existing song FK
    /// references stay valid.
    pub fn insert_artist_with_id(
        &self,
        artist_id: i64,
        name: &str,
        total_plays: i64,
        total_downloads: i64,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO artists (id, name, total_plays, total_downloads)
             VALUES (?1, ?2, ?3, ?4)",
            params![artist_id, name, total_plays, total_downloads],
        )?;
        Ok(())
    }

    /// Get catalog statistics.
    pub fn stats(&self) -> Result<CatalogStats> {
        let artists: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM artists", [], |row| row.get(0))?;

        let albums: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM albums", [], |row| row.get(0))?;

        let (songs, total_plays, total_downloads, total_duration_hours) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(plays), 0), COALESCE(SUM(downloads), 0),
                    COALESCE(SUM(duration), 0) / 3600.0
             FROM songs",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            },
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT a.name, COUNT(s.id)
             FROM artists a JOIN songs s ON s.artist_id = a.id
             GROUP BY a.id ORDER BY COUNT(s.id) DESC, a.name LIMIT 20",
        )?;
        let top_artists: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(CatalogStats {
            artists,
            albums,
            songs,
            total_plays,
            total_downloads,
            total_duration_hours,
            top_artists,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_columns(db: &Database) -> SongColumns {
        SongColumns::probe(db).unwrap()
    }

    fn test_song(title: &str, artist_id: i64) -> NewSong {
        NewSong {
            title: title.to_string(),
            artist_id,
            artist_name: Some("Artist X".to_string()),
            file_path: Some("/uploads/songs/song-a.mp3".to_string()),
            duration: 150,
            plays: 10,
            downloads: 2,
            ..NewSong::default()
        }
    }

    #[test]
    fn test_get_or_create_artist_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let id1 = get_or_create_artist(&db.conn, "Artist X").unwrap();
        let id2 = get_or_create_artist(&db.conn, "Artist X").unwrap();
        assert_eq!(id1, id2);
        assert_eq!(db.stats().unwrap().artists, 1);
    }

    #[test]
    fn test_find_artist_id_absent() {
        let db = Database::open_in_memory().unwrap();
        assert!(find_artist_id(&db.conn, "Nobody").unwrap().is_none());

        let id = get_or_create_artist(&db.conn, "Somebody").unwrap();
        assert_eq!(find_artist_id(&db.conn, "Somebody").unwrap(), Some(id));
    }

    #[test]
    fn test_album_identity_is_per_artist() {
        // Same album title under two different artists is two distinct albums
        let db = Database::open_in_memory().unwrap();
        let a1 = get_or_create_artist(&db.conn, "Artist X").unwrap();
        let a2 = get_or_create_artist(&db.conn, "Artist Y").unwrap();

        let alb1 = get_or_create_album(&db.conn, "Greatest Hits", a1).unwrap();
        let alb2 = get_or_create_album(&db.conn, "Greatest Hits", a2).unwrap();
        let alb1_again = get_or_create_album(&db.conn, "Greatest Hits", a1).unwrap();

        assert_ne!(alb1, alb2);
        assert_eq!(alb1, alb1_again);
        assert_eq!(db.stats().unwrap().albums, 2);
    }

    #[test]
    fn test_insert_song_and_exists() {
        let db = Database::open_in_memory().unwrap();
        let artist_id = get_or_create_artist(&db.conn, "Artist X").unwrap();
        let cols = full_columns(&db);

        assert!(!song_exists(&db.conn, "Song A", artist_id).unwrap());
        insert_song(&db.conn, &test_song("Song A", artist_id), &cols).unwrap();
        assert!(song_exists(&db.conn, "Song A", artist_id).unwrap());

        let song = db.get_song("Song A", artist_id).unwrap().unwrap();
        assert_eq!(song.duration, 150);
        assert_eq!(song.plays, 10);
        assert_eq!(song.downloads, 2);

        // Migrated songs are always stored as approved
        let status: String = db
            .conn
            .query_row(
                "SELECT status FROM songs WHERE id = ?1",
                params![song.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(status, "approved");
    }

    #[test]
    fn test_insert_song_without_optional_columns() {
        let db = Database::open_in_memory().unwrap();
        let artist_id = get_or_create_artist(&db.conn, "Artist X").unwrap();

        for col in ["cover_art", "status", "is_featured", "is_explicit", "upload_date"] {
            db.conn
                .execute(&format!("ALTER TABLE songs DROP COLUMN {col}"), [])
                .unwrap();
        }

        let cols = full_columns(&db);
        assert_eq!(
            cols.missing(),
            vec!["cover_art", "status", "is_featured", "is_explicit", "upload_date"]
        );

        insert_song(&db.conn, &test_song("Song A", artist_id), &cols).unwrap();
        assert!(song_exists(&db.conn, "Song A", artist_id).unwrap());
    }

    #[test]
    fn test_table_and_column_probes() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.table_exists("songs").unwrap());
        assert!(!db.table_exists("nonexistent").unwrap());
        assert!(db.column_exists("songs", "cover_art").unwrap());
        assert!(!db.column_exists("songs", "bitrate").unwrap());
        // A missing table reads as "no columns", not an error
        assert!(!db.column_exists("nonexistent", "anything").unwrap());
    }

    #[test]
    fn test_probe_requires_songs_table() {
        let db = Database::open_in_memory().unwrap();
        db.conn.execute("DROP TABLE songs", []).unwrap();
        match SongColumns::probe(&db) {
            Err(super::super::DbError::SchemaIncomplete(table)) => assert_eq!(table, "songs"),
            other => panic!("expected SchemaIncomplete, got {other:?}"),
        }
    }

    #[test]
    fn test_insert_artist_with_id_preserves_id() {
        let db = Database::open_in_memory().unwrap();
        db.insert_artist_with_id(42, "Artist X", 100, 7).unwrap();

        assert!(db.artist_exists(42).unwrap());
        let artist = db.get_artist_by_name("Artist X").unwrap().unwrap();
        assert_eq!(artist.id, 42);
        assert_eq!(artist.total_plays, 100);
        assert_eq!(artist.total_downloads, 7);
    }

    #[test]
    fn test_artist_song_summary() {
        let db = Database::open_in_memory().unwrap();
        let cols = full_columns(&db);

        let mut s1 = test_song("Song A", 42);
        s1.plays = 10;
        s1.downloads = 2;
        let mut s2 = test_song("Song B", 42);
        s2.plays = 5;
        s2.downloads = 1;
        insert_song(&db.conn, &s1, &cols).unwrap();
        insert_song(&db.conn, &s2, &cols).unwrap();

        let summary = db.artist_song_summary(42).unwrap();
        assert_eq!(summary.name.as_deref(), Some("Artist X"));
        assert_eq!(summary.song_count, 2);
        assert_eq!(summary.total_plays, 15);
        assert_eq!(summary.total_downloads, 3);
    }

    #[test]
    fn test_stats_empty() {
        let db = Database::open_in_memory().unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.artists, 0);
        assert_eq!(stats.albums, 0);
        assert_eq!(stats.songs, 0);
    }
}
