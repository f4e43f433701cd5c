pub mod catalog;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod matcher;
pub mod naming;
pub mod sanitize;
pub mod secrets;
pub mod transfer;

pub use catalog::{Catalog, CatalogResult, RateLimiter, TmdbClient};
pub use config::{load_config, load_config_from_str, EngineConfig, NamingConfig, NamingPreset};
pub use db::Database;
pub use engine::Engine;
pub use error::{
    CatalogError, ConfigError, IngestError, MatchError, ReelnameError, Result, TransferError,
};
pub use ingest::{import_scan, ImportSummary, ScannedFile, ScannedFolder};
pub use logging::{init_logging, LogFormat};
pub use matcher::{MatchOutcome, MatchSummary, Matcher};
pub use naming::{PathResolver, TemplateResolver};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use transfer::{
    TransferContext, TransferEvent, TransferObserver, TransferProgressBroadcaster,
    TransferScheduler,
};
