//! Artist reconciliation: backfill artist rows for ids that songs reference
//! but the artists table no longer has.
//!
//! Songs carry a denormalized free-text artist name alongside the numeric
//! id; that name plus play/download sums over the id's songs is enough to
//! synthesize the missing row, keeping the original id so song references
//! stay valid.

use anyhow::{Context, Result};

use crate::db::Database;

pub struct ReconcileReport {
    pub synced: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Restore one artist row per distinct song artist_id that lacks one.
///
/// A single artist's failure is logged and does not stop the pass.
pub fn reconcile_artists(db: &Database, dry_run: bool) -> Result<ReconcileReport> {
    let ids = db
        .distinct_song_artist_ids()
        .context("Failed to enumerate artist ids from songs")?;

    let mut report = ReconcileReport {
        synced: 0,
        skipped: 0,
        failed: 0,
    };

    if ids.is_empty() {
        log::info!("No songs in catalog, nothing to reconcile");
        return Ok(report);
    }

    println!("Checking {} distinct artist ids from songs", ids.len());

    for id in ids {
        if db.artist_exists(id).context("Artist lookup failed")? {
            report.skipped += 1;
            continue;
        }

        let summary = match db.artist_song_summary(id) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("artist {id}: failed to aggregate songs: {e}");
                report.failed += 1;
                continue;
            }
        };

        let name = match summary.name {
            Some(ref n) => n,
            None => {
                log::warn!("artist {id}: no song carries an artist name, cannot synthesize");
                report.failed += 1;
                continue;
            }
        };

        if dry_run {
            log::info!(
                "would synthesize artist {id} \"{name}\" ({} songs, {} plays, {} downloads)",
                summary.song_count,
                summary.total_plays,
                summary.total_downloads
            );
            report.synced += 1;
            continue;
        }

        match db.insert_artist_with_id(id, name, summary.total_plays, summary.total_downloads) {
            Ok(()) => {
                report.synced += 1;
                log::info!(
                    "synthesized artist {id} \"{name}\" ({} songs, {} plays, {} downloads)",
                    summary.song_count,
                    summary.total_plays,
                    summary.total_downloads
                );
            }
            Err(e) => {
                log::warn!("artist {id}: insert failed: {e}");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
