//! Top-level wiring of store, catalog, matcher and transfer queue.

use std::sync::Arc;

use log::warn;
use tokio::sync::broadcast;

use crate::catalog::{Catalog, TmdbClient};
use crate::config::{validate_config, EngineConfig};
use crate::db::Database;
use crate::error::{CatalogError, ConfigError, ReelnameError, Result};
use crate::ingest::{import_scan, ImportSummary, ScannedFolder};
use crate::matcher::{MatchOutcome, MatchSummary, Matcher};
use crate::transfer::{TransferContext, TransferEvent, TransferProgressBroadcaster, TransferScheduler};

/// One configured engine instance.
///
/// Holds a single catalog client so every matcher shares its rate limit.
pub struct Engine {
    config: EngineConfig,
    db: Database,
    catalog: Option<Arc<dyn Catalog>>,
    scheduler: TransferScheduler,
    progress: TransferProgressBroadcaster,
}

impl Engine {
    /// Opens the configured database (running migrations) and builds the engine.
    pub fn open(config: EngineConfig) -> Result<Self> {
        validate_config(&config)?;
        let path = config
            .resolved_database_path()
            .ok_or_else(|| ConfigError::Validation {
                message: "databasePath is unset and no home directory was found".to_string(),
            })?;
        let db = Database::open(&path)?;
        Self::with_database(config, db)
    }

    /// Builds the engine on an already opened database.
    ///
    /// A missing catalog credential is not an error here; only matching needs
    /// it, and [`Engine::matcher`] refuses to run without one.
    pub fn with_database(config: EngineConfig, db: Database) -> Result<Self> {
        validate_config(&config)?;

        let catalog: Option<Arc<dyn Catalog>> = match TmdbClient::from_config(&config.catalog) {
            Ok(client) => Some(Arc::new(client)),
            Err(ReelnameError::Catalog(CatalogError::NoCredential)) => {
                warn!("No catalog API key configured, matching is disabled");
                None
            }
            Err(e) => return Err(e),
        };

        let progress = TransferProgressBroadcaster::default();
        let ctx = TransferContext::new(db.clone(), config.naming.clone(), config.transfer)
            .with_observer(Arc::new(progress.clone()));
        let scheduler = TransferScheduler::new(ctx, config.max_concurrent_transfers);

        Ok(Self {
            config,
            db,
            catalog,
            scheduler,
            progress,
        })
    }

    /// Replaces the catalog, e.g. with a different provider.
    pub fn with_catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn scheduler(&self) -> &TransferScheduler {
        &self.scheduler
    }

    /// Stream of transfer progress events.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<TransferEvent> {
        self.progress.subscribe()
    }

    /// A matcher over the shared catalog client.
    ///
    /// Fails with [`CatalogError::NoCredential`] when no API key is configured.
    pub fn matcher(&self) -> Result<Matcher> {
        let catalog = self
            .catalog
            .clone()
            .ok_or(CatalogError::NoCredential)?;
        Ok(Matcher::new(
            self.db.clone(),
            catalog,
            self.config.auto_match_threshold,
        ))
    }

    pub fn import_scan(&self, folders: &[ScannedFolder]) -> Result<ImportSummary> {
        Ok(import_scan(&self.db, folders)?)
    }

    pub async fn match_group(&self, group_id: i64) -> Result<MatchOutcome> {
        Ok(self.matcher()?.match_group_by_id(group_id).await?)
    }

    pub async fn match_all_groups(&self) -> Result<MatchSummary> {
        Ok(self.matcher()?.match_all_groups().await?)
    }

    /// See [`TransferScheduler::queue_transfers`].
    pub fn queue_transfers(&self, file_ids: &[i64], destination_id: i64) -> usize {
        self.scheduler.queue_transfers(file_ids, destination_id)
    }

    /// See [`TransferScheduler::queue_group_transfers`].
    pub fn queue_group_transfers(&self, group_ids: &[i64], destination_id: i64) -> Result<usize> {
        Ok(self
            .scheduler
            .queue_group_transfers(group_ids, destination_id)?)
    }

    pub fn delete_destination(&self, destination_id: i64) -> Result<()> {
        Ok(self.scheduler.delete_destination(destination_id)?)
    }

    /// Resolves once the transfer queue is drained.
    pub async fn wait_idle(&self) {
        self.scheduler.wait_idle().await;
    }
}
