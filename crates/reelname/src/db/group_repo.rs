//! Group repository: CRUD operations for the `groups` table.

use rusqlite::{params, OptionalExtension};

use super::models::{Group, GroupStatus, NewGroup};
use super::update::GroupUpdate;
use super::{now_rfc3339, Database, DatabaseError};

/// Inserts a new group in `scanned` status and returns its id.
pub fn insert(db: &Database, group: &NewGroup) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        let now = now_rfc3339();
        conn.execute(
            "INSERT INTO groups (status, media_type, folder_path, folder_name, total_file_count,
             total_file_size, parsed_title, parsed_year, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                GroupStatus::Scanned,
                group.media_type,
                group.folder_path,
                group.folder_name,
                group.total_file_count,
                group.total_file_size,
                group.parsed_title,
                group.parsed_year,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Finds a group by its ID.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<Group>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM groups WHERE id = ?1",
                params![id],
                Group::from_row,
            )
            .optional()?)
    })
}

/// Like [`find_by_id`], but a missing row is an error.
pub fn get(db: &Database, id: i64) -> Result<Group, DatabaseError> {
    find_by_id(db, id)?.ok_or(DatabaseError::NotFound {
        entity: "group",
        id,
    })
}

/// Finds the group imported from `folder_path`, the re-scan key.
pub fn find_by_folder_path(
    db: &Database,
    folder_path: &str,
) -> Result<Option<Group>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM groups WHERE folder_path = ?1",
                params![folder_path],
                Group::from_row,
            )
            .optional()?)
    })
}

/// Lists all groups in the given status, oldest first.
pub fn list_by_status(db: &Database, status: GroupStatus) -> Result<Vec<Group>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM groups WHERE status = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map(params![status], Group::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Lists every group, oldest first.
pub fn list_all(db: &Database) -> Result<Vec<Group>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM groups ORDER BY id")?;
        let rows = stmt
            .query_map([], Group::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Applies a partial update. Returns `false` if no row with `id` exists.
pub fn update(db: &Database, id: i64, update: &GroupUpdate) -> Result<bool, DatabaseError> {
    if update.is_empty() {
        return Ok(exists(db, id)?);
    }
    db.with_conn(|conn| Ok(update.apply(conn, id)? > 0))
}

/// Moves the group to `to` only if its current status is one of `from`.
///
/// Returns whether the row changed. This is the compare-and-set used for status
/// transitions that can race with other writers.
pub fn transition_status(
    db: &Database,
    id: i64,
    from: &[GroupStatus],
    to: GroupStatus,
) -> Result<bool, DatabaseError> {
    if from.is_empty() {
        return Ok(false);
    }
    db.with_conn(|conn| {
        let placeholders: Vec<String> = (0..from.len()).map(|i| format!("?{}", i + 4)).collect();
        let sql = format!(
            "UPDATE groups SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status IN ({})",
            placeholders.join(", ")
        );
        let now = now_rfc3339();
        let mut values: Vec<&dyn rusqlite::types::ToSql> = Vec::with_capacity(from.len() + 3);
        values.push(&to);
        values.push(&now);
        values.push(&id);
        for status in from {
            values.push(status);
        }
        let changed = conn.execute(&sql, values.as_slice())?;
        Ok(changed > 0)
    })
}

/// Deletes a group. Its files and candidates go with it.
pub fn delete(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM groups WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    })
}

fn exists(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM groups WHERE id = ?1",
            params![id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MediaType;

    fn new_group(path: &str) -> NewGroup {
        NewGroup {
            folder_path: path.to_string(),
            folder_name: path.rsplit('/').next().unwrap_or(path).to_string(),
            media_type: MediaType::Tv,
            parsed_title: Some("Show Name".to_string()),
            parsed_year: Some(2020),
            total_file_count: 3,
            total_file_size: 3_000,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = Database::open_in_memory().unwrap();
        let id = insert(&db, &new_group("/media/Show.Name.2020")).unwrap();

        let group = find_by_id(&db, id).unwrap().unwrap();
        assert_eq!(group.status, GroupStatus::Scanned);
        assert_eq!(group.media_type, MediaType::Tv);
        assert_eq!(group.parsed_title.as_deref(), Some("Show Name"));
        assert!(group.match_confidence.is_none());

        let by_path = find_by_folder_path(&db, "/media/Show.Name.2020")
            .unwrap()
            .unwrap();
        assert_eq!(by_path.id, id);
    }

    #[test]
    fn test_find_missing() {
        let db = Database::open_in_memory().unwrap();
        assert!(find_by_id(&db, 99).unwrap().is_none());
        assert!(matches!(
            get(&db, 99),
            Err(DatabaseError::NotFound { entity: "group", id: 99 })
        ));
    }

    #[test]
    fn test_list_by_status() {
        let db = Database::open_in_memory().unwrap();
        let a = insert(&db, &new_group("/media/a")).unwrap();
        let b = insert(&db, &new_group("/media/b")).unwrap();
        update(
            &db,
            b,
            &GroupUpdate {
                status: Some(GroupStatus::Skipped),
                ..Default::default()
            },
        )
        .unwrap();

        let scanned = list_by_status(&db, GroupStatus::Scanned).unwrap();
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].id, a);
        assert_eq!(list_all(&db).unwrap().len(), 2);
    }

    #[test]
    fn test_partial_update_leaves_other_columns() {
        let db = Database::open_in_memory().unwrap();
        let id = insert(&db, &new_group("/media/a")).unwrap();

        let changed = update(
            &db,
            id,
            &GroupUpdate {
                status: Some(GroupStatus::Matched),
                catalog_id: Some(Some(42)),
                match_confidence: Some(Some(0.97)),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(changed);

        let group = get(&db, id).unwrap();
        assert_eq!(group.status, GroupStatus::Matched);
        assert_eq!(group.catalog_id, Some(42));
        assert_eq!(group.parsed_year, Some(2020));

        update(
            &db,
            id,
            &GroupUpdate {
                catalog_id: Some(None),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(get(&db, id).unwrap().catalog_id, None);
    }

    #[test]
    fn test_update_missing_row() {
        let db = Database::open_in_memory().unwrap();
        let changed = update(
            &db,
            7,
            &GroupUpdate {
                status: Some(GroupStatus::Matched),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!changed);
        assert!(!update(&db, 7, &GroupUpdate::default()).unwrap());
    }

    #[test]
    fn test_invalid_update_is_not_written() {
        let db = Database::open_in_memory().unwrap();
        let id = insert(&db, &new_group("/media/a")).unwrap();
        let result = update(
            &db,
            id,
            &GroupUpdate {
                status: Some(GroupStatus::Matched),
                match_confidence: Some(Some(1.5)),
                ..Default::default()
            },
        );
        assert!(result.is_err());
        assert_eq!(get(&db, id).unwrap().status, GroupStatus::Scanned);
    }

    #[test]
    fn test_transition_status() {
        let db = Database::open_in_memory().unwrap();
        let id = insert(&db, &new_group("/media/a")).unwrap();

        assert!(!transition_status(
            &db,
            id,
            &[GroupStatus::Confirmed],
            GroupStatus::Transferring
        )
        .unwrap());
        assert_eq!(get(&db, id).unwrap().status, GroupStatus::Scanned);

        assert!(transition_status(
            &db,
            id,
            &[GroupStatus::Scanned, GroupStatus::Ambiguous],
            GroupStatus::Matched
        )
        .unwrap());
        assert_eq!(get(&db, id).unwrap().status, GroupStatus::Matched);
    }

    #[test]
    fn test_delete() {
        let db = Database::open_in_memory().unwrap();
        let id = insert(&db, &new_group("/media/a")).unwrap();
        assert!(delete(&db, id).unwrap());
        assert!(!delete(&db, id).unwrap());
        assert!(find_by_id(&db, id).unwrap().is_none());
    }
}
