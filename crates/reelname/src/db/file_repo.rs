//! File repository: CRUD operations for the `files` table.

use rusqlite::{params, OptionalExtension};

use super::models::{GroupStatus, MediaFile, NewFile};
use super::update::FileUpdate;
use super::{now_rfc3339, Database, DatabaseError};

/// Inserts a new file in `scanned` status and returns its id.
pub fn insert(db: &Database, file: &NewFile) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        let now = now_rfc3339();
        conn.execute(
            "INSERT INTO files (group_id, status, media_type, file_category, extra_type,
             source_path, file_name, file_size, file_extension, parsed_season, parsed_episode,
             parsed_quality, parsed_codec, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
            params![
                file.group_id,
                GroupStatus::Scanned,
                file.media_type,
                file.file_category,
                file.extra_type,
                file.source_path,
                file.file_name,
                file.file_size,
                file.file_extension,
                file.parsed_season,
                file.parsed_episode,
                file.parsed_quality,
                file.parsed_codec,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Finds a file by its ID.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<MediaFile>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM files WHERE id = ?1",
                params![id],
                MediaFile::from_row,
            )
            .optional()?)
    })
}

/// Like [`find_by_id`], but a missing row is an error.
pub fn get(db: &Database, id: i64) -> Result<MediaFile, DatabaseError> {
    find_by_id(db, id)?.ok_or(DatabaseError::NotFound { entity: "file", id })
}

/// Finds a file by source path, the re-scan key.
pub fn find_by_source_path(
    db: &Database,
    source_path: &str,
) -> Result<Option<MediaFile>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM files WHERE source_path = ?1",
                params![source_path],
                MediaFile::from_row,
            )
            .optional()?)
    })
}

/// Lists the files of a group in insertion order.
pub fn list_for_group(db: &Database, group_id: i64) -> Result<Vec<MediaFile>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM files WHERE group_id = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map(params![group_id], MediaFile::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Lists the files of a group that are in `status`.
pub fn list_for_group_with_status(
    db: &Database,
    group_id: i64,
    status: GroupStatus,
) -> Result<Vec<MediaFile>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare("SELECT * FROM files WHERE group_id = ?1 AND status = ?2 ORDER BY id")?;
        let rows = stmt
            .query_map(params![group_id, status], MediaFile::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Applies a partial update to one file. Returns `false` if no row with `id` exists.
pub fn update(db: &Database, id: i64, update: &FileUpdate) -> Result<bool, DatabaseError> {
    if update.is_empty() {
        return Ok(find_by_id(db, id)?.is_some());
    }
    db.with_conn(|conn| Ok(update.apply(conn, id)? > 0))
}

/// Applies the same partial update to every file in a group, in one transaction.
///
/// When `only_status` is given, files in other statuses are left alone. Returns
/// the number of files changed.
pub fn update_for_group(
    db: &Database,
    group_id: i64,
    only_status: Option<&[GroupStatus]>,
    update: &FileUpdate,
) -> Result<usize, DatabaseError> {
    update.validate()?;
    if update.is_empty() {
        return Ok(0);
    }
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        let ids: Vec<(i64, GroupStatus)> = {
            let mut stmt = tx.prepare("SELECT id, status FROM files WHERE group_id = ?1")?;
            let rows = stmt
                .query_map(params![group_id], |r| Ok((r.get(0)?, r.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut changed = 0;
        for (id, status) in ids {
            if let Some(allowed) = only_status {
                if !allowed.contains(&status) {
                    continue;
                }
            }
            changed += update.apply(&tx, id)?;
        }
        tx.commit()?;
        Ok(changed)
    })
}

/// Counts the files of a group that are in `status`.
pub fn count_by_status(
    db: &Database,
    group_id: i64,
    status: GroupStatus,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM files WHERE group_id = ?1 AND status = ?2",
            params![group_id, status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Deletes a file row. The file on disk is untouched.
pub fn delete(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM files WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{group_repo, FileCategory, MediaType, NewGroup};

    fn seed_group(db: &Database) -> i64 {
        group_repo::insert(
            db,
            &NewGroup {
                folder_path: "/media/Show".to_string(),
                folder_name: "Show".to_string(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn new_file(group_id: i64, name: &str, episode: i64) -> NewFile {
        NewFile {
            group_id: Some(group_id),
            media_type: MediaType::Tv,
            file_category: FileCategory::Episode,
            source_path: format!("/media/Show/{}", name),
            file_name: name.to_string(),
            file_size: 1_000,
            file_extension: "mkv".to_string(),
            parsed_season: Some(1),
            parsed_episode: Some(episode),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = Database::open_in_memory().unwrap();
        let group_id = seed_group(&db);
        let id = insert(&db, &new_file(group_id, "e01.mkv", 1)).unwrap();

        let file = get(&db, id).unwrap();
        assert_eq!(file.group_id, Some(group_id));
        assert_eq!(file.status, GroupStatus::Scanned);
        assert_eq!(file.parsed_episode, Some(1));
        assert!(file.transfer_progress.is_none());
        assert!(file.wants_episode_title());

        let by_path = find_by_source_path(&db, "/media/Show/e01.mkv")
            .unwrap()
            .unwrap();
        assert_eq!(by_path.id, id);
    }

    #[test]
    fn test_source_path_is_unique() {
        let db = Database::open_in_memory().unwrap();
        let group_id = seed_group(&db);
        insert(&db, &new_file(group_id, "e01.mkv", 1)).unwrap();
        assert!(insert(&db, &new_file(group_id, "e01.mkv", 1)).is_err());
    }

    #[test]
    fn test_update_for_group_with_status_filter() {
        let db = Database::open_in_memory().unwrap();
        let group_id = seed_group(&db);
        let a = insert(&db, &new_file(group_id, "e01.mkv", 1)).unwrap();
        let b = insert(&db, &new_file(group_id, "e02.mkv", 2)).unwrap();
        update(
            &db,
            b,
            &FileUpdate {
                status: Some(GroupStatus::Skipped),
                ..Default::default()
            },
        )
        .unwrap();

        let changed = update_for_group(
            &db,
            group_id,
            Some(&[GroupStatus::Scanned]),
            &FileUpdate {
                status: Some(GroupStatus::Matched),
                catalog_id: Some(Some(7)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(get(&db, a).unwrap().status, GroupStatus::Matched);
        assert_eq!(get(&db, b).unwrap().status, GroupStatus::Skipped);
        assert_eq!(get(&db, b).unwrap().catalog_id, None);

        assert_eq!(count_by_status(&db, group_id, GroupStatus::Matched).unwrap(), 1);
        assert_eq!(
            list_for_group_with_status(&db, group_id, GroupStatus::Skipped)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_update_for_group_rejects_invalid_progress() {
        let db = Database::open_in_memory().unwrap();
        let group_id = seed_group(&db);
        insert(&db, &new_file(group_id, "e01.mkv", 1)).unwrap();
        assert!(update_for_group(&db, group_id, None, &FileUpdate::progress(2.0)).is_err());
    }

    #[test]
    fn test_files_cascade_with_group() {
        let db = Database::open_in_memory().unwrap();
        let group_id = seed_group(&db);
        let id = insert(&db, &new_file(group_id, "e01.mkv", 1)).unwrap();
        group_repo::delete(&db, group_id).unwrap();
        assert!(find_by_id(&db, id).unwrap().is_none());
    }

    #[test]
    fn test_list_for_group_order() {
        let db = Database::open_in_memory().unwrap();
        let group_id = seed_group(&db);
        insert(&db, &new_file(group_id, "e02.mkv", 2)).unwrap();
        insert(&db, &new_file(group_id, "e01.mkv", 1)).unwrap();
        let names: Vec<String> = list_for_group(&db, group_id)
            .unwrap()
            .into_iter()
            .map(|f| f.file_name)
            .collect();
        assert_eq!(names, vec!["e02.mkv", "e01.mkv"]);
    }
}
