//! Match candidate repository.
//!
//! Candidates are written only in whole batches: every match attempt replaces
//! the previous batch for its group.

use rusqlite::{params, OptionalExtension};

use super::models::{MatchCandidate, NewMatchCandidate};
use super::{Database, DatabaseError};

/// Replaces every candidate of `group_id` with `candidates`, in one transaction.
///
/// Rank follows slice order, so the caller must pass them best first.
pub fn replace_for_group(
    db: &Database,
    group_id: i64,
    candidates: &[NewMatchCandidate],
) -> Result<(), DatabaseError> {
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM match_candidates WHERE group_id = ?1",
            params![group_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO match_candidates (group_id, rank, catalog_id, media_type, title,
                 year, poster_path, overview, confidence)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (rank, c) in candidates.iter().enumerate() {
                stmt.execute(params![
                    group_id,
                    rank as i64,
                    c.catalog_id,
                    c.media_type,
                    c.title,
                    c.year,
                    c.poster_path,
                    c.overview,
                    c.confidence,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    })
}

/// Lists the candidates of a group, best first.
pub fn list_for_group(
    db: &Database,
    group_id: i64,
) -> Result<Vec<MatchCandidate>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM match_candidates WHERE group_id = ?1 ORDER BY rank")?;
        let rows = stmt
            .query_map(params![group_id], MatchCandidate::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<MatchCandidate>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM match_candidates WHERE id = ?1",
                params![id],
                MatchCandidate::from_row,
            )
            .optional()?)
    })
}

/// Drops all candidates of a group.
pub fn delete_for_group(db: &Database, group_id: i64) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn.execute(
            "DELETE FROM match_candidates WHERE group_id = ?1",
            params![group_id],
        )?)
    })
}
