//! Metadata catalog access.
//!
//! The matcher talks to the catalog only through the [`Catalog`] trait, so tests
//! and alternative providers can stand in for [`TmdbClient`].

use async_trait::async_trait;

use crate::db::MediaType;
use crate::error::CatalogError;

pub mod models;
pub mod rate_limit;
pub mod tmdb;

pub use models::CatalogResult;
pub use rate_limit::RateLimiter;
pub use tmdb::TmdbClient;

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Searches by title. `MediaType::Unknown` searches movies and shows together
    /// and returns only those two kinds. Every returned result has its media type
    /// set.
    async fn search(
        &self,
        query: &str,
        media_type: MediaType,
        year: Option<i64>,
    ) -> Result<Vec<CatalogResult>, CatalogError>;

    /// Title of one episode of a show, `None` if the catalog has no such episode.
    async fn episode_title(
        &self,
        show_id: i64,
        season: i64,
        episode: i64,
    ) -> Result<Option<String>, CatalogError>;
}
