//! Test harness for isolated test execution.
//!
//! The `TestHarness` struct provides a complete isolated environment for testing
//! the engine, including:
//! - Temporary library (scan input) and destination directories
//! - A file-backed database inside the temp directory
//! - Engine construction wired to a `FakeCatalog`

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use reelname::catalog::{Catalog, CatalogResult};
use reelname::config::EngineConfig;
use reelname::db::{destination_repo, Database, MediaType, NewDestination};
use reelname::error::CatalogError;
use reelname::Engine;

use super::builders::FolderBuilder;

/// In-memory catalog with scripted answers.
///
/// Queries are matched case-insensitively on the exact title. Unknown queries
/// return no results.
#[derive(Default)]
pub struct FakeCatalog {
    results: Mutex<HashMap<String, Vec<CatalogResult>>>,
    episodes: Mutex<HashMap<(i64, i64, i64), String>>,
    unavailable: Mutex<HashSet<String>>,
    search_calls: AtomicUsize,
    episode_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `query` with `results`, in this order.
    pub fn with_results(self, query: &str, results: Vec<CatalogResult>) -> Self {
        self.results
            .lock()
            .unwrap()
            .insert(query.to_lowercase(), results);
        self
    }

    pub fn with_episode(self, show_id: i64, season: i64, episode: i64, title: &str) -> Self {
        self.episodes
            .lock()
            .unwrap()
            .insert((show_id, season, episode), title.to_string());
        self
    }

    /// Makes searches for `query` fail as if the service were down.
    pub fn unavailable_for(self, query: &str) -> Self {
        self.unavailable
            .lock()
            .unwrap()
            .insert(query.to_lowercase());
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn episode_calls(&self) -> usize {
        self.episode_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn search(
        &self,
        query: &str,
        _media_type: MediaType,
        _year: Option<i64>,
    ) -> Result<Vec<CatalogResult>, CatalogError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let key = query.to_lowercase();
        if self.unavailable.lock().unwrap().contains(&key) {
            return Err(CatalogError::Unavailable("connection refused".to_string()));
        }
        Ok(self
            .results
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    async fn episode_title(
        &self,
        show_id: i64,
        season: i64,
        episode: i64,
    ) -> Result<Option<String>, CatalogError> {
        self.episode_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .episodes
            .lock()
            .unwrap()
            .get(&(show_id, season, episode))
            .cloned())
    }
}

/// A show search hit.
pub fn tv_result(id: i64, name: &str, year: i64, popularity: f64) -> CatalogResult {
    CatalogResult {
        id,
        name: Some(name.to_string()),
        first_air_date: Some(format!("{}-01-15", year)),
        poster_path: Some(format!("/poster{}.jpg", id)),
        popularity: Some(popularity),
        media_type: Some("tv".to_string()),
        ..Default::default()
    }
}

/// A movie search hit.
pub fn movie_result(id: i64, title: &str, year: i64, popularity: f64) -> CatalogResult {
    CatalogResult {
        id,
        title: Some(title.to_string()),
        release_date: Some(format!("{}-06-01", year)),
        popularity: Some(popularity),
        media_type: Some("movie".to_string()),
        ..Default::default()
    }
}

/// Test harness providing isolated execution environment for integration tests.
pub struct TestHarness {
    /// Temporary directory containing library/destination/data subdirectories.
    temp_dir: TempDir,
    /// Scanned media lives here.
    pub library_dir: PathBuf,
    /// Base path of the local destination.
    pub dest_dir: PathBuf,
    /// Database file path.
    pub db_path: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let library_dir = base.join("library");
        let dest_dir = base.join("dest");
        let db_path = base.join("data").join("reelname.db");

        std::fs::create_dir_all(&library_dir).expect("Failed to create library dir");
        std::fs::create_dir_all(&dest_dir).expect("Failed to create dest dir");

        Self {
            temp_dir,
            library_dir,
            dest_dir,
            db_path,
        }
    }

    /// Get the base temp directory path.
    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Starts a scanned folder under the library directory.
    pub fn folder(&self, name: &str) -> FolderBuilder {
        FolderBuilder::new(self.library_dir.join(name), name)
    }

    /// Opens the harness database.
    pub fn open_database(&self) -> Database {
        Database::open(&self.db_path).expect("Failed to open database")
    }

    /// Registers the harness destination directory as a local destination.
    pub fn add_local_destination(&self, db: &Database) -> i64 {
        destination_repo::insert(
            db,
            &NewDestination::local("library", self.dest_dir.to_string_lossy()),
        )
        .expect("Failed to insert destination")
    }

    /// Builds an engine on the harness database with `catalog` in place of TMDB.
    pub fn engine(&self, mut config: EngineConfig, catalog: Arc<FakeCatalog>) -> Engine {
        config.database_path = Some(self.db_path.to_string_lossy().into_owned());
        Engine::open(config)
            .expect("Failed to open engine")
            .with_catalog(catalog)
    }

    /// Reads a file under the destination directory.
    pub fn read_dest(&self, relative: &str) -> Vec<u8> {
        std::fs::read(self.dest_dir.join(relative))
            .unwrap_or_else(|e| panic!("Failed to read dest file {}: {}", relative, e))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
