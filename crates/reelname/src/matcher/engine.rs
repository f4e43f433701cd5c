use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;

use super::scoring::{self, ParsedQuery};
use crate::catalog::Catalog;
use crate::db::{
    candidate_repo, file_repo, group_repo, Database, FileUpdate, Group, GroupStatus,
    GroupUpdate, MatchCandidate, MediaType, NewMatchCandidate,
};
use crate::error::MatchError;

/// Stored candidate overviews are cut to this many characters.
pub const OVERVIEW_SNIPPET_CHARS: usize = 500;

fn overview_snippet(overview: &str) -> String {
    overview.chars().take(OVERVIEW_SNIPPET_CHARS).collect()
}

/// Result of one match attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum MatchOutcome {
    /// The best candidate was applied to the group and its files.
    Matched { catalog_id: i64, confidence: f64 },
    /// The group needs manual review. `confidence` is the best score, if any.
    Ambiguous { confidence: Option<f64> },
}

/// Aggregate counts from [`Matcher::match_all_groups`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub matched: usize,
    pub ambiguous: usize,
}

/// Catalog identity copied onto a group and its files when a match is applied.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChosenMatch {
    pub catalog_id: i64,
    pub media_type: MediaType,
    pub title: String,
    pub year: Option<i64>,
    pub poster_path: Option<String>,
    pub confidence: f64,
}

impl From<&NewMatchCandidate> for ChosenMatch {
    fn from(c: &NewMatchCandidate) -> Self {
        Self {
            catalog_id: c.catalog_id,
            media_type: c.media_type,
            title: c.title.clone(),
            year: c.year,
            poster_path: c.poster_path.clone(),
            confidence: c.confidence,
        }
    }
}

impl From<&MatchCandidate> for ChosenMatch {
    fn from(c: &MatchCandidate) -> Self {
        Self {
            catalog_id: c.catalog_id,
            media_type: c.media_type,
            title: c.title.clone(),
            year: c.year,
            poster_path: c.poster_path.clone(),
            confidence: c.confidence,
        }
    }
}

/// Statuses a group may be (re)matched from.
pub(crate) const MATCHABLE: &[GroupStatus] =
    &[GroupStatus::Scanned, GroupStatus::Matched, GroupStatus::Ambiguous];

/// Matches groups against the catalog and records the outcome.
#[derive(Clone)]
pub struct Matcher {
    pub(crate) db: Database,
    pub(crate) catalog: Arc<dyn Catalog>,
    threshold: f64,
}

impl Matcher {
    pub fn new(db: Database, catalog: Arc<dyn Catalog>, threshold: f64) -> Self {
        Self {
            db,
            catalog,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Runs one match attempt for the group with `group_id`.
    pub async fn match_group_by_id(&self, group_id: i64) -> Result<MatchOutcome, MatchError> {
        let group = group_repo::get(&self.db, group_id)?;
        self.match_group(&group).await
    }

    /// Searches the catalog for `group`, stores the ranked candidates and either
    /// applies the best one or marks the group ambiguous.
    pub async fn match_group(&self, group: &Group) -> Result<MatchOutcome, MatchError> {
        if !MATCHABLE.contains(&group.status) {
            return Err(MatchError::InvalidTransition {
                from: group.status,
                to: GroupStatus::Matched,
            });
        }

        let Some(title) = group
            .parsed_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            debug!("Group {} has no parsed title, needs review", group.id);
            group_repo::update(
                &self.db,
                group.id,
                &GroupUpdate {
                    status: Some(GroupStatus::Ambiguous),
                    match_confidence: Some(None),
                    ..Default::default()
                },
            )?;
            return Ok(MatchOutcome::Ambiguous { confidence: None });
        };

        let results = self
            .catalog
            .search(title, group.media_type, group.parsed_year)
            .await?;

        if results.is_empty() {
            info!("No catalog results for group {} ('{}')", group.id, title);
            group_repo::update(
                &self.db,
                group.id,
                &GroupUpdate {
                    status: Some(GroupStatus::Ambiguous),
                    ..Default::default()
                },
            )?;
            return Ok(MatchOutcome::Ambiguous {
                confidence: group.match_confidence,
            });
        }

        let query = ParsedQuery {
            title,
            year: group.parsed_year,
            media_type: group.media_type,
        };
        let ranked = scoring::rank(&query, results);

        let candidates: Vec<NewMatchCandidate> = ranked
            .iter()
            .map(|(r, score)| NewMatchCandidate {
                catalog_id: r.id,
                media_type: r.resolved_media_type(),
                title: r.display_title().to_string(),
                year: r.year(),
                poster_path: r.poster_path.clone(),
                overview: r.overview.as_deref().map(overview_snippet),
                confidence: *score,
            })
            .collect();
        candidate_repo::replace_for_group(&self.db, group.id, &candidates)?;

        let top = candidates[0].confidence;
        let second = candidates.get(1).map(|c| c.confidence);
        let gap = scoring::score_gap(top, second);

        if !scoring::should_auto_match(top, second, self.threshold) {
            debug!(
                "Group {} is ambiguous (top={:.3}, gap={:.3})",
                group.id, top, gap
            );
            group_repo::update(
                &self.db,
                group.id,
                &GroupUpdate {
                    status: Some(GroupStatus::Ambiguous),
                    match_confidence: Some(Some(top)),
                    ..Default::default()
                },
            )?;
            return Ok(MatchOutcome::Ambiguous {
                confidence: Some(top),
            });
        }

        let chosen = ChosenMatch::from(&candidates[0]);
        info!(
            "Auto-matched group {} to '{}' (catalog id {}, confidence={:.3}, gap={:.3})",
            group.id, chosen.title, chosen.catalog_id, top, gap
        );
        self.apply_match(group.id, &chosen).await?;

        Ok(MatchOutcome::Matched {
            catalog_id: chosen.catalog_id,
            confidence: top,
        })
    }

    /// Matches every group that is currently `scanned`.
    ///
    /// A failure on one group is logged and counted as ambiguous; it never stops
    /// the batch. Only failing to list the groups is an error.
    pub async fn match_all_groups(&self) -> Result<MatchSummary, MatchError> {
        let groups = group_repo::list_by_status(&self.db, GroupStatus::Scanned)?;
        info!("Matching {} scanned groups", groups.len());

        let mut summary = MatchSummary::default();
        for group in &groups {
            match self.match_group(group).await {
                Ok(MatchOutcome::Matched { .. }) => summary.matched += 1,
                Ok(MatchOutcome::Ambiguous { .. }) => summary.ambiguous += 1,
                Err(e) => {
                    warn!("Matching group {} failed: {}", group.id, e);
                    summary.ambiguous += 1;
                    if let Err(e) = group_repo::transition_status(
                        &self.db,
                        group.id,
                        &[GroupStatus::Scanned],
                        GroupStatus::Ambiguous,
                    ) {
                        warn!("Could not mark group {} ambiguous: {}", group.id, e);
                    }
                }
            }
        }

        info!(
            "Matching finished: {} matched, {} ambiguous",
            summary.matched, summary.ambiguous
        );
        Ok(summary)
    }

    /// Writes `chosen` to the group and all of its files with status `matched`,
    /// then backfills episode titles for shows.
    pub(crate) async fn apply_match(
        &self,
        group_id: i64,
        chosen: &ChosenMatch,
    ) -> Result<(), MatchError> {
        group_repo::update(
            &self.db,
            group_id,
            &GroupUpdate {
                status: Some(GroupStatus::Matched),
                media_type: Some(chosen.media_type),
                catalog_id: Some(Some(chosen.catalog_id)),
                catalog_title: Some(Some(chosen.title.clone())),
                catalog_year: Some(chosen.year),
                poster_path: Some(chosen.poster_path.clone()),
                match_confidence: Some(Some(chosen.confidence)),
                ..Default::default()
            },
        )?;

        file_repo::update_for_group(
            &self.db,
            group_id,
            None,
            &FileUpdate {
                status: Some(GroupStatus::Matched),
                media_type: Some(chosen.media_type),
                catalog_id: Some(Some(chosen.catalog_id)),
                catalog_title: Some(Some(chosen.title.clone())),
                catalog_year: Some(chosen.year),
                poster_path: Some(chosen.poster_path.clone()),
                match_confidence: Some(Some(chosen.confidence)),
                ..Default::default()
            },
        )?;

        if chosen.media_type == MediaType::Tv {
            self.backfill_episode_titles(group_id, chosen.catalog_id)
                .await;
        }
        Ok(())
    }

    /// Fetches and stores the episode title of every non-extra file with a
    /// season and episode. Returns how many titles were stored.
    ///
    /// Errors are logged per file and never undo the match.
    pub async fn backfill_episode_titles(&self, group_id: i64, show_id: i64) -> usize {
        let files = match file_repo::list_for_group(&self.db, group_id) {
            Ok(files) => files,
            Err(e) => {
                warn!("Episode backfill for group {} skipped: {}", group_id, e);
                return 0;
            }
        };

        let mut stored = 0;
        for file in files.iter().filter(|f| f.wants_episode_title()) {
            let (Some(season), Some(episode)) = (file.parsed_season, file.parsed_episode) else {
                continue;
            };
            match self.catalog.episode_title(show_id, season, episode).await {
                Ok(Some(title)) => {
                    let update = FileUpdate {
                        episode_title: Some(Some(title)),
                        ..Default::default()
                    };
                    match file_repo::update(&self.db, file.id, &update) {
                        Ok(_) => stored += 1,
                        Err(e) => warn!("Storing episode title for file {} failed: {}", file.id, e),
                    }
                }
                Ok(None) => debug!(
                    "No catalog episode S{:02}E{:02} for show {}",
                    season, episode, show_id
                ),
                Err(e) => warn!(
                    "Episode lookup S{:02}E{:02} for file {} failed: {}",
                    season, episode, file.id, e
                ),
            }
        }
        stored
    }
}
