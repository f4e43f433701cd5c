//! Row types for the four persisted entities and the text enums stored in them.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display`, `FromStr` and the rusqlite conversions for an
/// enum persisted as lowercase text.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("invalid {} '{}'", stringify!($name), other)),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                text.parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

/// Lifecycle status shared by groups and files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    #[default]
    Scanned,
    Matched,
    Ambiguous,
    Confirmed,
    Transferring,
    Completed,
    Failed,
    Skipped,
}

text_enum!(GroupStatus {
    Scanned => "scanned",
    Matched => "matched",
    Ambiguous => "ambiguous",
    Confirmed => "confirmed",
    Transferring => "transferring",
    Completed => "completed",
    Failed => "failed",
    Skipped => "skipped",
});

impl GroupStatus {
    /// Whether a file in this status has finished transferring, one way or the other.
    pub fn is_terminal_transfer(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Movie,
    Tv,
    #[default]
    Unknown,
}

text_enum!(MediaType {
    Movie => "movie",
    Tv => "tv",
    Unknown => "unknown",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    #[default]
    Episode,
    Movie,
    Special,
    Extra,
}

text_enum!(FileCategory {
    Episode => "episode",
    Movie => "movie",
    Special => "special",
    Extra => "extra",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraType {
    BehindTheScenes,
    DeletedScenes,
    Featurettes,
    Interviews,
    Scenes,
    Shorts,
    Trailers,
    Other,
}

text_enum!(ExtraType {
    BehindTheScenes => "behind_the_scenes",
    DeletedScenes => "deleted_scenes",
    Featurettes => "featurettes",
    Interviews => "interviews",
    Scenes => "scenes",
    Shorts => "shorts",
    Trailers => "trailers",
    Other => "other",
});

/// Where a destination lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    #[default]
    Local,
    Ssh,
}

text_enum!(DestinationKind {
    Local => "local",
    Ssh => "ssh",
});

/// One scanned media folder, the unit of catalog matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: i64,
    pub status: GroupStatus,
    pub media_type: MediaType,
    pub folder_path: String,
    pub folder_name: String,
    pub total_file_count: i64,
    pub total_file_size: i64,
    pub parsed_title: Option<String>,
    pub parsed_year: Option<i64>,
    pub catalog_id: Option<i64>,
    pub catalog_title: Option<String>,
    pub catalog_year: Option<i64>,
    pub poster_path: Option<String>,
    pub match_confidence: Option<f64>,
    pub destination_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Group {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            status: row.get("status")?,
            media_type: row.get("media_type")?,
            folder_path: row.get("folder_path")?,
            folder_name: row.get("folder_name")?,
            total_file_count: row.get("total_file_count")?,
            total_file_size: row.get("total_file_size")?,
            parsed_title: row.get("parsed_title")?,
            parsed_year: row.get("parsed_year")?,
            catalog_id: row.get("catalog_id")?,
            catalog_title: row.get("catalog_title")?,
            catalog_year: row.get("catalog_year")?,
            poster_path: row.get("poster_path")?,
            match_confidence: row.get("match_confidence")?,
            destination_id: row.get("destination_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// One media file inside a group, the unit of transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub id: i64,
    pub group_id: Option<i64>,
    pub status: GroupStatus,
    pub media_type: MediaType,
    pub file_category: FileCategory,
    pub extra_type: Option<ExtraType>,
    pub source_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_extension: String,
    pub parsed_season: Option<i64>,
    pub parsed_episode: Option<i64>,
    pub parsed_quality: Option<String>,
    pub parsed_codec: Option<String>,
    pub catalog_id: Option<i64>,
    pub catalog_title: Option<String>,
    pub catalog_year: Option<i64>,
    pub poster_path: Option<String>,
    pub episode_title: Option<String>,
    pub match_confidence: Option<f64>,
    pub destination_id: Option<i64>,
    pub destination_path: Option<String>,
    pub transfer_progress: Option<f64>,
    pub transfer_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl MediaFile {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            group_id: row.get("group_id")?,
            status: row.get("status")?,
            media_type: row.get("media_type")?,
            file_category: row.get("file_category")?,
            extra_type: row.get("extra_type")?,
            source_path: row.get("source_path")?,
            file_name: row.get("file_name")?,
            file_size: row.get("file_size")?,
            file_extension: row.get("file_extension")?,
            parsed_season: row.get("parsed_season")?,
            parsed_episode: row.get("parsed_episode")?,
            parsed_quality: row.get("parsed_quality")?,
            parsed_codec: row.get("parsed_codec")?,
            catalog_id: row.get("catalog_id")?,
            catalog_title: row.get("catalog_title")?,
            catalog_year: row.get("catalog_year")?,
            poster_path: row.get("poster_path")?,
            episode_title: row.get("episode_title")?,
            match_confidence: row.get("match_confidence")?,
            destination_id: row.get("destination_id")?,
            destination_path: row.get("destination_path")?,
            transfer_progress: row.get("transfer_progress")?,
            transfer_error: row.get("transfer_error")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Whether the episode-title backfill applies to this file.
    pub fn wants_episode_title(&self) -> bool {
        self.file_category != FileCategory::Extra
            && self.parsed_season.is_some()
            && self.parsed_episode.is_some()
    }
}

/// A ranked catalog search hit stored for a group. Rank 0 is the best match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub id: i64,
    pub group_id: i64,
    pub rank: i64,
    pub catalog_id: i64,
    pub media_type: MediaType,
    pub title: String,
    pub year: Option<i64>,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
    pub confidence: f64,
}

impl MatchCandidate {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            group_id: row.get("group_id")?,
            rank: row.get("rank")?,
            catalog_id: row.get("catalog_id")?,
            media_type: row.get("media_type")?,
            title: row.get("title")?,
            year: row.get("year")?,
            poster_path: row.get("poster_path")?,
            overview: row.get("overview")?,
            confidence: row.get("confidence")?,
        })
    }
}

/// A named transfer target.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: i64,
    pub name: String,
    pub kind: DestinationKind,
    /// Local base directory, or base directory on the remote host.
    pub base_path: String,
    pub ssh_host: Option<String>,
    pub ssh_port: Option<u16>,
    pub ssh_user: Option<String>,
    pub ssh_key_path: Option<String>,
    #[serde(skip_serializing)]
    pub ssh_key_passphrase: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("base_path", &self.base_path)
            .field("ssh_host", &self.ssh_host)
            .field("ssh_port", &self.ssh_port)
            .field("ssh_user", &self.ssh_user)
            .field("ssh_key_path", &self.ssh_key_path)
            .field(
                "ssh_key_passphrase",
                &self.ssh_key_passphrase.as_ref().map(|_| "****"),
            )
            .finish()
    }
}

impl Destination {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            kind: row.get("kind")?,
            base_path: row.get("base_path")?,
            ssh_host: row.get("ssh_host")?,
            ssh_port: row.get("ssh_port")?,
            ssh_user: row.get("ssh_user")?,
            ssh_key_path: row.get("ssh_key_path")?,
            ssh_key_passphrase: row.get("ssh_key_passphrase")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Insert payload for a group.
#[derive(Debug, Clone, Default)]
pub struct NewGroup {
    pub folder_path: String,
    pub folder_name: String,
    pub media_type: MediaType,
    pub parsed_title: Option<String>,
    pub parsed_year: Option<i64>,
    pub total_file_count: i64,
    pub total_file_size: i64,
}

/// Insert payload for a file.
#[derive(Debug, Clone, Default)]
pub struct NewFile {
    pub group_id: Option<i64>,
    pub media_type: MediaType,
    pub file_category: FileCategory,
    pub extra_type: Option<ExtraType>,
    pub source_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_extension: String,
    pub parsed_season: Option<i64>,
    pub parsed_episode: Option<i64>,
    pub parsed_quality: Option<String>,
    pub parsed_codec: Option<String>,
}

/// Insert payload for a candidate; rank comes from its position in the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMatchCandidate {
    pub catalog_id: i64,
    pub media_type: MediaType,
    pub title: String,
    pub year: Option<i64>,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
    pub confidence: f64,
}

/// Insert payload for a destination.
#[derive(Debug, Clone, Default)]
pub struct NewDestination {
    pub name: String,
    pub kind: DestinationKind,
    pub base_path: String,
    pub ssh_host: Option<String>,
    pub ssh_port: Option<u16>,
    pub ssh_user: Option<String>,
    pub ssh_key_path: Option<String>,
    pub ssh_key_passphrase: Option<String>,
}

impl NewDestination {
    /// A local destination rooted at `base_path`.
    pub fn local(name: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DestinationKind::Local,
            base_path: base_path.into(),
            ..Default::default()
        }
    }
}
