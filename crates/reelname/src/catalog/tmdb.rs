//! TMDB v3 client.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use super::models::{CatalogResult, EpisodeResponse, SearchResponse};
use super::rate_limit::RateLimiter;
use super::Catalog;
use crate::config::CatalogConfig;
use crate::db::MediaType;
use crate::error::{CatalogError, ReelnameError};
use crate::sanitize::redact_api_key;

/// Rate-limited TMDB client. Every request, search or detail, takes one slot
/// from the shared limiter.
pub struct TmdbClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    limiter: RateLimiter,
}

impl TmdbClient {
    pub fn new(
        api_key: SecretString,
        config: &CatalogConfig,
    ) -> Result<Self, CatalogError> {
        if api_key.expose_secret().is_empty() {
            return Err(CatalogError::NoCredential);
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::new(config.rate_limit.quota, config.rate_limit.window()),
        })
    }

    /// Builds a client from config, resolving the API key.
    ///
    /// No configured key is [`CatalogError::NoCredential`]; a key source that
    /// cannot be read is a configuration error.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, ReelnameError> {
        let api_key = config
            .resolve_api_key()?
            .ok_or(CatalogError::NoCredential)?;
        Ok(Self::new(api_key, config)?)
    }

    async fn send(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response, CatalogError> {
        self.limiter.acquire().await;

        let request = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&[("api_key", self.api_key.expose_secret())])
            .query(params)
            .build()?;
        debug!("GET {}", redact_api_key(request.url().as_str()));

        Ok(self.http.execute(request).await?)
    }

    /// Any non-2xx status, 404 included, is an error.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let response = self.send(path, params).await?;
        ensure_success(path, response.status())?;
        Ok(response.json::<T>().await?)
    }

    /// Like [`Self::get_json`], but a 404 means the resource does not exist.
    async fn get_json_if_found<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, CatalogError> {
        let response = self.send(path, params).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Catalog has nothing at {}", path);
            return Ok(None);
        }
        ensure_success(path, response.status())?;
        Ok(Some(response.json::<T>().await?))
    }

    async fn search_path(
        &self,
        path: &str,
        query: &str,
        year_param: &str,
        year: Option<i64>,
    ) -> Result<Vec<CatalogResult>, CatalogError> {
        let mut params = vec![
            ("query", query.to_string()),
            ("include_adult", "false".to_string()),
        ];
        if let Some(y) = year {
            params.push((year_param, y.to_string()));
        }
        let body: SearchResponse = self.get_json(path, &params).await?;
        Ok(body.results)
    }
}

fn ensure_success(path: &str, status: StatusCode) -> Result<(), CatalogError> {
    if status.is_success() {
        return Ok(());
    }
    warn!("Catalog request to {} failed with {}", path, status);
    Err(CatalogError::Http {
        status: status.as_u16(),
    })
}

#[async_trait]
impl Catalog for TmdbClient {
    async fn search(
        &self,
        query: &str,
        media_type: MediaType,
        year: Option<i64>,
    ) -> Result<Vec<CatalogResult>, CatalogError> {
        let results = match media_type {
            MediaType::Movie => {
                let mut results = self.search_path("/search/movie", query, "year", year).await?;
                for r in &mut results {
                    r.media_type = Some(MediaType::Movie.as_str().to_string());
                }
                results
            }
            MediaType::Tv => {
                let mut results = self
                    .search_path("/search/tv", query, "first_air_date_year", year)
                    .await?;
                for r in &mut results {
                    r.media_type = Some(MediaType::Tv.as_str().to_string());
                }
                results
            }
            MediaType::Unknown => self
                .search_path("/search/multi", query, "year", year)
                .await?
                .into_iter()
                .filter(|r| r.resolved_media_type() != MediaType::Unknown)
                .collect(),
        };
        debug!("Catalog search '{}' ({}) -> {} results", query, media_type, results.len());
        Ok(results)
    }

    async fn episode_title(
        &self,
        show_id: i64,
        season: i64,
        episode: i64,
    ) -> Result<Option<String>, CatalogError> {
        let path = format!("/tv/{}/season/{}/episode/{}", show_id, season, episode);
        let body: Option<EpisodeResponse> = self.get_json_if_found(&path, &[]).await?;
        Ok(body.and_then(|e| e.name).filter(|n| !n.is_empty()))
    }
}
