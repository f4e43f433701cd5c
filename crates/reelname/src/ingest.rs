//! Import of scanner and parser output into the store.
//!
//! Folder walking and filename parsing happen upstream; this module only takes
//! their joined output and records it as groups and files, idempotently.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::db::{
    file_repo, group_repo, Database, ExtraType, FileCategory, FileUpdate, GroupStatus,
    GroupUpdate, MediaType, NewFile, NewGroup,
};
use crate::error::IngestError;
use crate::sanitize::hash_path;

/// Parser output for a folder name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFolder {
    pub title: Option<String>,
    pub year: Option<i64>,
}

/// Parser output for a file name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFile {
    pub title: Option<String>,
    pub year: Option<i64>,
    pub season: Option<i64>,
    pub episode: Option<i64>,
    pub quality: Option<String>,
    pub codec: Option<String>,
    #[serde(default)]
    pub media_type: MediaType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedFile {
    pub source_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_extension: String,
    /// Season implied by the folder layout, e.g. a `Season 2` directory.
    pub detected_season: Option<i64>,
    #[serde(default)]
    pub file_category: FileCategory,
    pub extra_type: Option<ExtraType>,
    #[serde(default)]
    pub parsed: ParsedFile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedFolder {
    pub folder_path: String,
    pub folder_name: String,
    #[serde(default)]
    pub parsed: ParsedFolder,
    #[serde(default)]
    pub files: Vec<ScannedFile>,
}

impl ScannedFolder {
    /// Media type implied by the folder's contents: several episodes make a
    /// show, a single movie file makes a movie, anything else is unknown.
    pub fn inferred_media_type(&self) -> MediaType {
        let has_episodes = self
            .files
            .iter()
            .any(|f| matches!(f.file_category, FileCategory::Episode | FileCategory::Special));
        if has_episodes && self.files.len() > 1 {
            MediaType::Tv
        } else if self.files.len() == 1 && self.files[0].file_category == FileCategory::Movie {
            MediaType::Movie
        } else {
            MediaType::Unknown
        }
    }

    fn total_size(&self) -> i64 {
        self.files.iter().map(|f| f.file_size.max(0)).sum()
    }
}

/// Counts from one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub groups: usize,
    pub files: usize,
}

/// Records scanned folders as groups and their files.
///
/// A folder whose path already has a group reuses it: aggregates are
/// refreshed and the group goes back to `scanned`, unless it is mid-transfer.
/// A file whose source path is already known is re-linked, not duplicated.
///
/// Fails up front, before writing anything, if the list is empty or a folder
/// does not exist on disk.
pub fn import_scan(db: &Database, folders: &[ScannedFolder]) -> Result<ImportSummary, IngestError> {
    if folders.is_empty() {
        return Err(IngestError::InvalidScanPath(PathBuf::new()));
    }
    if let Some(missing) = folders.iter().find(|f| !Path::new(&f.folder_path).is_dir()) {
        return Err(IngestError::InvalidScanPath(PathBuf::from(&missing.folder_path)));
    }

    let mut summary = ImportSummary::default();
    for folder in folders {
        let group_id = upsert_group(db, folder)?;
        summary.groups += 1;
        for file in &folder.files {
            upsert_file(db, group_id, file)?;
            summary.files += 1;
        }
    }

    info!(
        "Imported {} groups with {} files",
        summary.groups, summary.files
    );
    Ok(summary)
}

fn upsert_group(db: &Database, folder: &ScannedFolder) -> Result<i64, IngestError> {
    let media_type = folder.inferred_media_type();
    let total_file_count = folder.files.len() as i64;
    let total_file_size = folder.total_size();

    let Some(existing) = group_repo::find_by_folder_path(db, &folder.folder_path)? else {
        let id = group_repo::insert(
            db,
            &NewGroup {
                folder_path: folder.folder_path.clone(),
                folder_name: folder.folder_name.clone(),
                media_type,
                parsed_title: folder.parsed.title.clone(),
                parsed_year: folder.parsed.year,
                total_file_count,
                total_file_size,
            },
        )?;
        debug!("New group {} for '{}'", id, folder.folder_name);
        return Ok(id);
    };

    let status = if existing.status == GroupStatus::Transferring {
        warn!(
            "Group {} is transferring, keeping its status on rescan",
            existing.id
        );
        None
    } else {
        Some(GroupStatus::Scanned)
    };
    group_repo::update(
        db,
        existing.id,
        &GroupUpdate {
            status,
            folder_name: Some(folder.folder_name.clone()),
            total_file_count: Some(total_file_count),
            total_file_size: Some(total_file_size),
            parsed_title: Some(folder.parsed.title.clone()),
            parsed_year: Some(folder.parsed.year),
            ..Default::default()
        },
    )?;
    debug!("Refreshed group {} for '{}'", existing.id, folder.folder_name);
    Ok(existing.id)
}

fn upsert_file(db: &Database, group_id: i64, file: &ScannedFile) -> Result<i64, IngestError> {
    let season = file.detected_season.or(file.parsed.season);

    if let Some(existing) = file_repo::find_by_source_path(db, &file.source_path)? {
        file_repo::update(
            db,
            existing.id,
            &FileUpdate {
                group_id: Some(Some(group_id)),
                file_size: Some(file.file_size.max(0)),
                parsed_season: Some(season),
                parsed_episode: Some(file.parsed.episode),
                ..Default::default()
            },
        )?;
        debug!(
            "Re-linked file {} ({}) to group {}",
            existing.id,
            hash_path(Path::new(&file.source_path)),
            group_id
        );
        return Ok(existing.id);
    }

    let id = file_repo::insert(
        db,
        &NewFile {
            group_id: Some(group_id),
            media_type: file.parsed.media_type,
            file_category: file.file_category,
            extra_type: file.extra_type,
            source_path: file.source_path.clone(),
            file_name: file.file_name.clone(),
            file_size: file.file_size.max(0),
            file_extension: file.file_extension.clone(),
            parsed_season: season,
            parsed_episode: file.parsed.episode,
            parsed_quality: file.parsed.quality.clone(),
            parsed_codec: file.parsed.codec.clone(),
        },
    )?;
    Ok(id)
}
