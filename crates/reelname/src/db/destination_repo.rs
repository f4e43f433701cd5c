//! Destination repository: CRUD operations for the `destinations` table.

use rusqlite::{params, OptionalExtension};

use super::models::{Destination, NewDestination};
use super::{now_rfc3339, Database, DatabaseError};

pub fn insert(db: &Database, dest: &NewDestination) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        let now = now_rfc3339();
        conn.execute(
            "INSERT INTO destinations (name, kind, base_path, ssh_host, ssh_port, ssh_user,
             ssh_key_path, ssh_key_passphrase, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                dest.name,
                dest.kind,
                dest.base_path,
                dest.ssh_host,
                dest.ssh_port,
                dest.ssh_user,
                dest.ssh_key_path,
                dest.ssh_key_passphrase,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<Destination>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM destinations WHERE id = ?1",
                params![id],
                Destination::from_row,
            )
            .optional()?)
    })
}

pub fn list(db: &Database) -> Result<Vec<Destination>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM destinations ORDER BY name, id")?;
        let rows = stmt
            .query_map([], Destination::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Overwrites every field of a destination. Returns `false` if it does not exist.
///
/// Destinations carry no status, so a full overwrite is safe here; callers that
/// may race with transfers go through the scheduler.
pub fn update(db: &Database, id: i64, dest: &NewDestination) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE destinations SET name=?2, kind=?3, base_path=?4, ssh_host=?5, ssh_port=?6,
             ssh_user=?7, ssh_key_path=?8, ssh_key_passphrase=?9, updated_at=?10
             WHERE id=?1",
            params![
                id,
                dest.name,
                dest.kind,
                dest.base_path,
                dest.ssh_host,
                dest.ssh_port,
                dest.ssh_user,
                dest.ssh_key_path,
                dest.ssh_key_passphrase,
                now_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    })
}

/// Deletes a destination. File and group references to it become NULL.
pub fn delete(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM destinations WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    })
}
