//! Typed partial updates.
//!
//! Each struct carries one `Option` per mutable column; `None` leaves the column
//! untouched and, for nullable columns, `Some(None)` writes NULL. Only the columns
//! named here can ever be written through an update, and every update is a single
//! `UPDATE <table> SET ... WHERE id = ?` statement.

use rusqlite::types::ToSql;
use rusqlite::Connection;

use super::models::{ExtraType, FileCategory, GroupStatus, MediaType};
use super::{now_rfc3339, DatabaseError};

/// Partial update for a row in `groups`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupUpdate {
    pub status: Option<GroupStatus>,
    pub media_type: Option<MediaType>,
    pub folder_name: Option<String>,
    pub total_file_count: Option<i64>,
    pub total_file_size: Option<i64>,
    pub parsed_title: Option<Option<String>>,
    pub parsed_year: Option<Option<i64>>,
    pub catalog_id: Option<Option<i64>>,
    pub catalog_title: Option<Option<String>>,
    pub catalog_year: Option<Option<i64>>,
    pub poster_path: Option<Option<String>>,
    pub match_confidence: Option<Option<f64>>,
    pub destination_id: Option<Option<i64>>,
}

/// Partial update for a row in `files`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileUpdate {
    pub group_id: Option<Option<i64>>,
    pub status: Option<GroupStatus>,
    pub media_type: Option<MediaType>,
    pub file_category: Option<FileCategory>,
    pub extra_type: Option<Option<ExtraType>>,
    pub file_size: Option<i64>,
    pub parsed_season: Option<Option<i64>>,
    pub parsed_episode: Option<Option<i64>>,
    pub parsed_quality: Option<Option<String>>,
    pub parsed_codec: Option<Option<String>>,
    pub catalog_id: Option<Option<i64>>,
    pub catalog_title: Option<Option<String>>,
    pub catalog_year: Option<Option<i64>>,
    pub poster_path: Option<Option<String>>,
    pub episode_title: Option<Option<String>>,
    pub match_confidence: Option<Option<f64>>,
    pub destination_id: Option<Option<i64>>,
    pub destination_path: Option<Option<String>>,
    pub transfer_progress: Option<Option<f64>>,
    pub transfer_error: Option<Option<String>>,
}

/// Collects `column = ?N` assignments for one statement.
struct Assignments {
    columns: Vec<&'static str>,
    values: Vec<Box<dyn ToSql>>,
}

impl Assignments {
    fn new() -> Self {
        Self {
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    fn push<T: ToSql + 'static>(&mut self, column: &'static str, value: Option<T>) {
        if let Some(v) = value {
            self.columns.push(column);
            self.values.push(Box::new(v));
        }
    }

    fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Builds the statement, appending `updated_at` and the `WHERE` clause.
    fn into_statement(mut self, table: &str) -> (String, Vec<Box<dyn ToSql>>) {
        self.columns.push("updated_at");
        self.values.push(Box::new(now_rfc3339()));

        let sets: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            sets.join(", "),
            self.columns.len() + 1
        );
        (sql, self.values)
    }
}

fn check_unit_interval(field: &'static str, value: Option<Option<f64>>) -> Result<(), DatabaseError> {
    if let Some(Some(v)) = value {
        if !(0.0..=1.0).contains(&v) {
            return Err(DatabaseError::InvalidUpdate {
                field,
                reason: format!("{} is outside [0, 1]", v),
            });
        }
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: Option<i64>) -> Result<(), DatabaseError> {
    if let Some(v) = value {
        if v < 0 {
            return Err(DatabaseError::InvalidUpdate {
                field,
                reason: format!("{} is negative", v),
            });
        }
    }
    Ok(())
}

/// Runs a built update for one row and returns the number of rows changed.
fn execute(
    conn: &Connection,
    table: &str,
    id: i64,
    assignments: Assignments,
) -> Result<usize, DatabaseError> {
    let (sql, mut values) = assignments.into_statement(table);
    values.push(Box::new(id));
    let params: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
    Ok(conn.execute(&sql, params.as_slice())?)
}

impl GroupUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), DatabaseError> {
        check_unit_interval("match_confidence", self.match_confidence)?;
        check_non_negative("total_file_count", self.total_file_count)?;
        check_non_negative("total_file_size", self.total_file_size)?;
        if let Some(ref name) = self.folder_name {
            if name.trim().is_empty() {
                return Err(DatabaseError::InvalidUpdate {
                    field: "folder_name",
                    reason: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    fn assignments(&self) -> Assignments {
        let mut a = Assignments::new();
        a.push("status", self.status);
        a.push("media_type", self.media_type);
        a.push("folder_name", self.folder_name.clone());
        a.push("total_file_count", self.total_file_count);
        a.push("total_file_size", self.total_file_size);
        a.push("parsed_title", self.parsed_title.clone());
        a.push("parsed_year", self.parsed_year);
        a.push("catalog_id", self.catalog_id);
        a.push("catalog_title", self.catalog_title.clone());
        a.push("catalog_year", self.catalog_year);
        a.push("poster_path", self.poster_path.clone());
        a.push("match_confidence", self.match_confidence);
        a.push("destination_id", self.destination_id);
        a
    }

    /// Validates and writes this update to the group row `id`.
    pub(crate) fn apply(&self, conn: &Connection, id: i64) -> Result<usize, DatabaseError> {
        self.validate()?;
        let assignments = self.assignments();
        if assignments.is_empty() {
            return Ok(0);
        }
        execute(conn, "groups", id, assignments)
    }
}

impl FileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), DatabaseError> {
        check_unit_interval("match_confidence", self.match_confidence)?;
        check_unit_interval("transfer_progress", self.transfer_progress)?;
        check_non_negative("file_size", self.file_size)?;
        Ok(())
    }

    fn assignments(&self) -> Assignments {
        let mut a = Assignments::new();
        a.push("group_id", self.group_id);
        a.push("status", self.status);
        a.push("media_type", self.media_type);
        a.push("file_category", self.file_category);
        a.push("extra_type", self.extra_type);
        a.push("file_size", self.file_size);
        a.push("parsed_season", self.parsed_season);
        a.push("parsed_episode", self.parsed_episode);
        a.push("parsed_quality", self.parsed_quality.clone());
        a.push("parsed_codec", self.parsed_codec.clone());
        a.push("catalog_id", self.catalog_id);
        a.push("catalog_title", self.catalog_title.clone());
        a.push("catalog_year", self.catalog_year);
        a.push("poster_path", self.poster_path.clone());
        a.push("episode_title", self.episode_title.clone());
        a.push("match_confidence", self.match_confidence);
        a.push("destination_id", self.destination_id);
        a.push("destination_path", self.destination_path.clone());
        a.push("transfer_progress", self.transfer_progress);
        a.push("transfer_error", self.transfer_error.clone());
        a
    }

    /// Validates and writes this update to the file row `id`.
    pub(crate) fn apply(&self, conn: &Connection, id: i64) -> Result<usize, DatabaseError> {
        self.validate()?;
        let assignments = self.assignments();
        if assignments.is_empty() {
            return Ok(0);
        }
        execute(conn, "files", id, assignments)
    }

    /// Progress-only update for a transfer chunk.
    pub fn progress(progress: f64) -> Self {
        Self {
            transfer_progress: Some(Some(progress)),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_updates() {
        assert!(GroupUpdate::default().is_empty());
        assert!(FileUpdate::default().is_empty());
        assert!(!FileUpdate::progress(0.5).is_empty());
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let update = GroupUpdate {
            match_confidence: Some(Some(1.2)),
            ..Default::default()
        };
        let err = update.validate().unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::InvalidUpdate {
                field: "match_confidence",
                ..
            }
        ));
    }

    #[test]
    fn test_progress_out_of_range_rejected() {
        assert!(FileUpdate::progress(-0.1).validate().is_err());
        assert!(FileUpdate::progress(1.0).validate().is_ok());
        assert!(FileUpdate::progress(0.0).validate().is_ok());
    }

    #[test]
    fn test_clearing_nullable_is_valid() {
        let update = GroupUpdate {
            match_confidence: Some(None),
            catalog_id: Some(None),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
        assert_eq!(update.assignments().columns, vec!["catalog_id", "match_confidence"]);
    }

    #[test]
    fn test_statement_shape() {
        let update = FileUpdate {
            status: Some(GroupStatus::Transferring),
            transfer_progress: Some(Some(0.0)),
            transfer_error: Some(None),
            ..Default::default()
        };
        let (sql, values) = update.assignments().into_statement("files");
        assert_eq!(
            sql,
            "UPDATE files SET status = ?1, transfer_progress = ?2, transfer_error = ?3, \
             updated_at = ?4 WHERE id = ?5"
        );
        assert_eq!(values.len(), 4);
    }
}
