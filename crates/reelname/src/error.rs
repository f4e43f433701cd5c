use std::path::PathBuf;
use thiserror::Error;

use crate::db::{DatabaseError, GroupStatus};

#[derive(Error, Debug)]
pub enum ReelnameError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Match error: {0}")]
    Match(#[from] MatchError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Failed to resolve secret: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

/// Errors from the metadata catalog.
///
/// A lookup that finds nothing is not an error: searches return an empty list and
/// episode lookups return `None`.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("No catalog API key configured")]
    NoCredential,

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Catalog returned HTTP {status}")]
    Http { status: u16 },

    #[error("Failed to parse catalog response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            CatalogError::Parse(e.without_url().to_string())
        } else {
            CatalogError::Unavailable(e.without_url().to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum MatchError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Cannot move group from '{from}' to '{to}'")]
    InvalidTransition { from: GroupStatus, to: GroupStatus },

    #[error("Candidate {candidate_id} does not belong to group {group_id}")]
    CandidateMismatch { group_id: i64, candidate_id: i64 },
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("{kind} {id} not found")]
    EntityNotFound { kind: &'static str, id: i64 },

    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    #[error("Destination {0} is referenced by a queued or running transfer")]
    DestinationInUse(i64),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl TransferError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TransferError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid scan path '{}'", .0.display())]
    InvalidScanPath(PathBuf),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub type Result<T> = std::result::Result<T, ReelnameError>;
