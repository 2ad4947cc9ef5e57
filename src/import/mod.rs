use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use thiserror::Error;

use crate::db::models::NewSong;
use crate::db::{queries, Database, DbError, SongColumns};

/// Artist name used when a source record carries none.
pub const DEFAULT_ARTIST: &str = "Unknown Artist";

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON source: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

/// A flat song record from the legacy JSON dump.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SongRecord {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// "mm:ss" duration string
    pub duration: Option<String>,
    pub audio_file: Option<String>,
    pub cover_art: Option<String>,
    pub file_size: Option<i64>,
    pub plays: Option<i64>,
    pub downloads: Option<i64>,
    pub lyrics: Option<String>,
    #[serde(deserialize_with = "flag")]
    pub featured: bool,
    #[serde(deserialize_with = "flag")]
    pub explicit: bool,
}

/// Legacy dumps are inconsistent about flags: true/false, 0/1, "0"/"1".
fn flag<'de, D>(de: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    Ok(match Option::<Flag>::deserialize(de)? {
        None => false,
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(n)) => n != 0,
        Some(Flag::Str(s)) => s == "1" || s.eq_ignore_ascii_case("true"),
    })
}

/// One record that could not be migrated.
#[derive(Debug)]
pub struct RecordFailure {
    pub title: String,
    pub error: String,
}

/// Outcome of a migration run.
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub migrated: u64,
    pub skipped: u64,
    pub failed: Vec<RecordFailure>,
}

/// Read the full JSON source file into memory.
pub fn load_records(path: &Path) -> std::result::Result<Vec<SongRecord>, ImportError> {
    let raw = std::fs::read_to_string(path)?;
    let records = serde_json::from_str(&raw)?;
    Ok(records)
}

enum RecordOutcome {
    Migrated,
    Skipped,
    /// Scoped to this record; the batch continues.
    Failed(String),
}

/// Migrate flat song records into the normalized artist/album/song tables.
///
/// Records are processed strictly in input order, one transaction per
/// record. A record whose (title, artist) key already exists is counted as
/// skipped, and because the duplicate check runs before any creation a skip
/// writes nothing at all. Per-record failures are collected in the report;
/// only storage-level errors abort the run.
pub fn migrate(
    db: &Database,
    records: &[SongRecord],
    dry_run: bool,
) -> std::result::Result<MigrationReport, ImportError> {
    let cols = SongColumns::probe(db)?;
    if !cols.missing().is_empty() {
        log::warn!(
            "Optional song columns missing, fields will be skipped: {}",
            cols.missing().join(", ")
        );
    }

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) ({eta}) {msg}",
        )
        .unwrap()
        .progress_chars("#>-"),
    );
    pb.set_message("Migrating...");

    let mut report = MigrationReport::default();

    for record in records {
        let title = record.title.as_deref().unwrap_or("").trim().to_string();

        match migrate_record(db, record, &cols, dry_run) {
            Ok(RecordOutcome::Migrated) => {
                report.migrated += 1;
                log::info!("migrated \"{title}\"");
            }
            Ok(RecordOutcome::Skipped) => {
                report.skipped += 1;
                log::info!("skipped \"{title}\" (already in catalog)");
            }
            Ok(RecordOutcome::Failed(error)) => {
                log::warn!("failed \"{title}\": {error}");
                report.failed.push(RecordFailure { title, error });
            }
            Err(e) => {
                pb.abandon_with_message("aborted");
                return Err(e);
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message(format!(
        "Done: {} migrated, {} skipped, {} failed",
        report.migrated,
        report.skipped,
        report.failed.len()
    ));

    Ok(report)
}

fn migrate_record(
    db: &Database,
    record: &SongRecord,
    cols: &SongColumns,
    dry_run: bool,
) -> std::result::Result<RecordOutcome, ImportError> {
    let title = match record.title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return Ok(RecordOutcome::Failed("record has no title".to_string())),
    };

    let artist = match record.artist.as_deref().map(str::trim) {
        Some(a) if !a.is_empty() => a,
        _ => DEFAULT_ARTIST,
    };

    let tx = db
        .conn
        .unchecked_transaction()
        .map_err(DbError::from)?;

    // Duplicate check before any creation: a skipped record must not leave
    // behind a fresh artist or album row. No artist row means no song row
    // can exist for this key either.
    if let Some(artist_id) = queries::find_artist_id(&tx, artist)? {
        if queries::song_exists(&tx, title, artist_id)? {
            return Ok(RecordOutcome::Skipped);
        }
    }

    let artist_id = queries::get_or_create_artist(&tx, artist)?;

    let album_id = match record.album.as_deref().map(str::trim) {
        Some(a) if !a.is_empty() => Some(queries::get_or_create_album(&tx, a, artist_id)?),
        _ => None,
    };

    let song = NewSong {
        title: title.to_string(),
        artist_id,
        album_id,
        artist_name: Some(artist.to_string()),
        file_path: record.audio_file.clone(),
        cover_art: record.cover_art.clone(),
        duration: parse_duration(record.duration.as_deref()),
        file_size: record.file_size,
        plays: record.plays.unwrap_or(0),
        downloads: record.downloads.unwrap_or(0),
        lyrics: record.lyrics.clone(),
        is_featured: record.featured,
        is_explicit: record.explicit,
    };

    match queries::insert_song(&tx, &song, cols) {
        Ok(_) => {}
        Err(DbError::Sqlite(rusqlite::Error::SqliteFailure(e, msg)))
            if e.code == rusqlite::ffi::ErrorCode::ConstraintViolation =>
        {
            // Data problem with this one record (e.g. a concurrent writer
            // won the unique-key race); the rest of the batch proceeds.
            return Ok(RecordOutcome::Failed(
                msg.unwrap_or_else(|| "constraint violation".to_string()),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    if dry_run {
        tx.rollback().map_err(DbError::from)?;
    } else {
        tx.commit().map_err(DbError::from)?;
    }

    Ok(RecordOutcome::Migrated)
}

/// Parse a "mm:ss" duration string into whole seconds.
///
/// Anything other than exactly two colon-separated non-negative integers
/// yields 0, as does an absent value.
pub fn parse_duration(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else { return 0 };
    let mut parts = raw.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(s), None) => match (m.trim().parse::<i64>(), s.trim().parse::<i64>()) {
            (Ok(m), Ok(s)) if m >= 0 && s >= 0 => m * 60 + s,
            _ => 0,
        },
        _ => 0,
    }
}
