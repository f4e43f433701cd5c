use serde::{Deserialize, Serialize};

use crate::db::MediaType;

/// One search hit as returned by the catalog.
///
/// Movies carry `title`/`release_date`, shows carry `name`/`first_air_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CatalogResult {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub media_type: Option<String>,
}

impl CatalogResult {
    /// Title for movies, name for shows.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Unknown")
    }

    /// Year taken from the first four characters of the release or air date.
    pub fn year(&self) -> Option<i64> {
        let date = self
            .release_date
            .as_deref()
            .or(self.first_air_date.as_deref())?;
        date.get(..4)?.parse().ok()
    }

    pub fn resolved_media_type(&self) -> MediaType {
        self.media_type
            .as_deref()
            .and_then(|m| m.parse().ok())
            .unwrap_or(MediaType::Unknown)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<CatalogResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EpisodeResponse {
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_fields() {
        let result: CatalogResult = serde_json::from_str(
            r#"{"id": 603, "title": "The Matrix", "release_date": "1999-03-30",
                "popularity": 80.5, "media_type": "movie"}"#,
        )
        .unwrap();
        assert_eq!(result.display_title(), "The Matrix");
        assert_eq!(result.year(), Some(1999));
        assert_eq!(result.resolved_media_type(), MediaType::Movie);
    }

    #[test]
    fn test_show_fields() {
        let result: CatalogResult = serde_json::from_str(
            r#"{"id": 1399, "name": "Show Name", "first_air_date": "2020-01-05"}"#,
        )
        .unwrap();
        assert_eq!(result.display_title(), "Show Name");
        assert_eq!(result.year(), Some(2020));
        assert_eq!(result.resolved_media_type(), MediaType::Unknown);
    }

    #[test]
    fn test_missing_and_short_dates() {
        let mut result = CatalogResult {
            id: 1,
            ..Default::default()
        };
        assert_eq!(result.display_title(), "Unknown");
        assert_eq!(result.year(), None);
        result.release_date = Some("19".to_string());
        assert_eq!(result.year(), None);
        result.release_date = Some(String::new());
        assert_eq!(result.year(), None);
    }
}
