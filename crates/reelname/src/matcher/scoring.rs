//! Confidence scoring of catalog results against parsed folder metadata.
//!
//! A score is a weighted sum of four parts: title similarity (0.60), year
//! proximity (0.25), media type agreement (0.10) and catalog popularity (0.05).

use strsim::normalized_levenshtein;

use crate::catalog::CatalogResult;
use crate::db::MediaType;

pub const TITLE_WEIGHT: f64 = 0.60;
pub const POPULARITY_WEIGHT: f64 = 0.05;

/// Minimum lead the best candidate needs over the runner-up to auto-match.
pub const AUTO_MATCH_GAP: f64 = 0.15;

/// Only this many search results are scored and stored.
pub const MAX_CANDIDATES: usize = 10;

/// Absorbs float noise in threshold and gap comparisons, so 0.85 - 0.70 counts
/// as a gap of 0.15.
const EPSILON: f64 = 1e-9;

/// What the folder parser extracted, the side every result is scored against.
#[derive(Debug, Clone, Copy)]
pub struct ParsedQuery<'a> {
    pub title: &'a str,
    pub year: Option<i64>,
    pub media_type: MediaType,
}

/// `1 - levenshtein / max_len` on trimmed, lowercased strings. Empty input scores 0.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(&a, &b)
}

pub fn year_score(parsed: Option<i64>, candidate: Option<i64>) -> f64 {
    match (parsed, candidate) {
        (Some(p), Some(c)) => match (p - c).unsigned_abs() {
            0 => 0.25,
            1 => 0.15,
            2 => 0.05,
            _ => 0.0,
        },
        (None, _) => 0.10,
        (Some(_), None) => 0.0,
    }
}

pub fn media_type_score(parsed: MediaType, candidate: MediaType) -> f64 {
    match parsed {
        MediaType::Unknown => 0.05,
        known if known == candidate => 0.10,
        _ => 0.0,
    }
}

pub fn popularity_score(popularity: Option<f64>) -> f64 {
    let popularity = popularity.unwrap_or(0.0).max(0.0);
    (popularity / 100.0).min(1.0) * POPULARITY_WEIGHT
}

/// Confidence in `[0, 1]` that `result` is what `query` describes.
pub fn confidence(query: &ParsedQuery<'_>, result: &CatalogResult) -> f64 {
    let score = title_similarity(query.title, result.display_title()) * TITLE_WEIGHT
        + year_score(query.year, result.year())
        + media_type_score(query.media_type, result.resolved_media_type())
        + popularity_score(result.popularity);
    score.clamp(0.0, 1.0)
}

/// Scores up to [`MAX_CANDIDATES`] results and sorts them best first.
///
/// The sort is stable, so equal scores keep catalog order.
pub fn rank(query: &ParsedQuery<'_>, results: Vec<CatalogResult>) -> Vec<(CatalogResult, f64)> {
    let mut scored: Vec<(CatalogResult, f64)> = results
        .into_iter()
        .take(MAX_CANDIDATES)
        .map(|r| {
            let score = confidence(query, &r);
            (r, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
}

/// Gap between the best and second-best score; 1.0 with a single candidate.
pub fn score_gap(top: f64, second: Option<f64>) -> f64 {
    second.map_or(1.0, |s| top - s)
}

/// The auto-match rule: the best score clears `threshold` and leads the
/// runner-up by at least [`AUTO_MATCH_GAP`].
pub fn should_auto_match(top: f64, second: Option<f64>, threshold: f64) -> bool {
    top + EPSILON >= threshold && score_gap(top, second) + EPSILON >= AUTO_MATCH_GAP
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, year: Option<i64>, media: &str, popularity: f64) -> CatalogResult {
        CatalogResult {
            id: 1,
            name: Some(title.to_string()),
            first_air_date: year.map(|y| format!("{}-01-01", y)),
            popularity: Some(popularity),
            media_type: Some(media.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_title_similarity_bounds() {
        assert_eq!(title_similarity("Show Name", "show name"), 1.0);
        assert_eq!(title_similarity("  Show Name ", "SHOW NAME"), 1.0);
        assert_eq!(title_similarity("abc", "xyz"), 0.0);
        assert_eq!(title_similarity("", "abc"), 0.0);
        assert_eq!(title_similarity("abc", "   "), 0.0);
        let partial = title_similarity("Show Name", "Show Game");
        assert!(partial > 0.85 && partial < 0.9);
    }

    #[test]
    fn test_year_score_table() {
        assert_eq!(year_score(Some(2020), Some(2020)), 0.25);
        assert_eq!(year_score(Some(2020), Some(2021)), 0.15);
        assert_eq!(year_score(Some(2020), Some(2018)), 0.05);
        assert_eq!(year_score(Some(2020), Some(2016)), 0.0);
        assert_eq!(year_score(None, Some(2020)), 0.10);
        assert_eq!(year_score(None, None), 0.10);
        assert_eq!(year_score(Some(2020), None), 0.0);
    }

    #[test]
    fn test_media_type_score_table() {
        assert_eq!(media_type_score(MediaType::Tv, MediaType::Tv), 0.10);
        assert_eq!(media_type_score(MediaType::Tv, MediaType::Movie), 0.0);
        assert_eq!(media_type_score(MediaType::Unknown, MediaType::Movie), 0.05);
    }

    #[test]
    fn test_popularity_is_capped() {
        assert_eq!(popularity_score(None), 0.0);
        assert!((popularity_score(Some(50.0)) - 0.025).abs() < 1e-12);
        assert_eq!(popularity_score(Some(5_000.0)), POPULARITY_WEIGHT);
    }

    #[test]
    fn test_show_name_scenario_scores() {
        let query = ParsedQuery {
            title: "Show Name",
            year: Some(2020),
            media_type: MediaType::Tv,
        };
        let exact = confidence(&query, &result("Show Name", Some(2020), "tv", 50.0));
        let remake = confidence(&query, &result("Show Name", Some(2023), "tv", 90.0));
        assert!((exact - 0.975).abs() < 1e-9, "{}", exact);
        assert!((remake - 0.745).abs() < 1e-9, "{}", remake);
        assert!(should_auto_match(exact, Some(remake), 0.85));
    }

    #[test]
    fn test_confidence_stays_in_unit_interval() {
        let query = ParsedQuery {
            title: "Show Name",
            year: None,
            media_type: MediaType::Unknown,
        };
        for r in [
            result("Show Name", Some(2020), "tv", 1e9),
            result("", None, "person", -5.0),
            result("zzzzzzzzzzzzzzzzzz", Some(1900), "movie", 0.0),
        ] {
            let c = confidence(&query, &r);
            assert!((0.0..=1.0).contains(&c), "{}", c);
        }
    }

    #[test]
    fn test_auto_match_boundaries() {
        assert!(should_auto_match(0.85, Some(0.70), 0.85));
        assert!(!should_auto_match(0.85, Some(0.71), 0.85));
        assert!(!should_auto_match(0.84, None, 0.85));
        assert!(should_auto_match(0.85, None, 0.85));
        // A perfect score next to a near-duplicate still needs review.
        assert!(!should_auto_match(1.0, Some(0.86), 0.85));
    }

    #[test]
    fn test_rank_sorts_and_truncates() {
        let query = ParsedQuery {
            title: "Show Name",
            year: Some(2020),
            media_type: MediaType::Tv,
        };
        let mut results: Vec<CatalogResult> = (0..15)
            .map(|i| {
                let mut r = result("Other Title", Some(2000), "tv", 0.0);
                r.id = i;
                r
            })
            .collect();
        results[12] = result("Show Name", Some(2020), "tv", 0.0);

        let ranked = rank(&query, results);
        assert_eq!(ranked.len(), MAX_CANDIDATES);
        // The exact match was beyond the first ten results and is not scored.
        assert!(ranked.iter().all(|(r, _)| r.display_title() == "Other Title"));
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    }
}
