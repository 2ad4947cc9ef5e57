/// Data for inserting a song (import phase).
///
/// `status` is not carried here: migrated songs are always stored as
/// 'approved', which the insert enforces when the column exists.
#[derive(Debug, Default, Clone)]
pub struct NewSong {
    pub title: String,
    pub artist_id: i64,
    pub album_id: Option<i64>,

    /// Free-text artist name from the source record, kept alongside the FK.
    pub artist_name: Option<String>,

    pub file_path: Option<String>,
    pub cover_art: Option<String>,
    pub duration: i64,
    pub file_size: Option<i64>,
    pub plays: i64,
    pub downloads: i64,
    pub lyrics: Option<String>,
    pub is_featured: bool,
    pub is_explicit: bool,
}

/// A song row read from the database (core columns only).
#[derive(Debug, Clone)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist_id: i64,
    pub album_id: Option<i64>,
    pub duration: i64,
    pub plays: i64,
    pub downloads: i64,
    pub file_path: Option<String>,
}

/// An artist row read from the database.
#[derive(Debug, Clone)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub verified: bool,
    pub total_plays: i64,
    pub total_downloads: i64,
}

/// Aggregates derived from the songs table for one artist_id, used by the
/// reconcile pass to synthesize a missing artist row.
///
/// `name` is taken from any one song's free-text artist field; None when no
/// song for this id carries one (synthesis then fails for this id).
#[derive(Debug, Clone)]
pub struct ArtistSynthesis {
    pub artist_id: i64,
    pub name: Option<String>,
    pub song_count: i64,
    pub total_plays: i64,
    pub total_downloads: i64,
}

/// Catalog statistics.
#[derive(Debug)]
pub struct CatalogStats {
    pub artists: i64,
    pub albums: i64,
    pub songs: i64,
    pub total_plays: i64,
    pub total_downloads: i64,
    pub total_duration_hours: f64,
    pub top_artists: Vec<(String, i64)>,
}
