//! Manual review actions on groups.
//!
//! Confirm, skip and reset only touch the store. Applying a stored candidate also
//! runs the episode backfill, so it lives on [`Matcher`].

use log::info;

use super::engine::{ChosenMatch, Matcher, MATCHABLE};
use crate::db::{
    candidate_repo, file_repo, group_repo, Database, FileUpdate, GroupStatus, GroupUpdate,
};
use crate::error::MatchError;

/// File statuses that follow their group into `confirmed` or `skipped`.
const FOLLOWERS: &[GroupStatus] = &[
    GroupStatus::Scanned,
    GroupStatus::Matched,
    GroupStatus::Ambiguous,
    GroupStatus::Confirmed,
];

/// Moves a group, and each file of it, from `from` to `to`.
fn transition(
    db: &Database,
    group_id: i64,
    from: &[GroupStatus],
    to: GroupStatus,
) -> Result<(), MatchError> {
    if !group_repo::transition_status(db, group_id, from, to)? {
        let group = group_repo::get(db, group_id)?;
        return Err(MatchError::InvalidTransition {
            from: group.status,
            to,
        });
    }

    let changed = file_repo::update_for_group(
        db,
        group_id,
        Some(FOLLOWERS),
        &FileUpdate {
            status: Some(to),
            ..Default::default()
        },
    )?;
    info!("Group {} is now {} ({} files)", group_id, to, changed);
    Ok(())
}

/// Accepts the group's current match for transfer.
pub fn confirm_group(db: &Database, group_id: i64) -> Result<(), MatchError> {
    transition(
        db,
        group_id,
        &[GroupStatus::Matched, GroupStatus::Ambiguous],
        GroupStatus::Confirmed,
    )
}

/// Excludes the group from matching and transfer.
///
/// Every status except `transferring` may be skipped; a group in flight has to
/// finish first.
pub fn skip_group(db: &Database, group_id: i64) -> Result<(), MatchError> {
    transition(
        db,
        group_id,
        &[
            GroupStatus::Scanned,
            GroupStatus::Matched,
            GroupStatus::Ambiguous,
            GroupStatus::Confirmed,
            GroupStatus::Completed,
            GroupStatus::Failed,
            GroupStatus::Skipped,
        ],
        GroupStatus::Skipped,
    )
}

/// Returns the group to `scanned` for a fresh match attempt.
///
/// Clears the match on the group and its files and drops the stored candidates.
pub fn reset_group(db: &Database, group_id: i64) -> Result<(), MatchError> {
    let group = group_repo::get(db, group_id)?;
    if group.status == GroupStatus::Transferring {
        return Err(MatchError::InvalidTransition {
            from: group.status,
            to: GroupStatus::Scanned,
        });
    }

    group_repo::update(
        db,
        group_id,
        &GroupUpdate {
            status: Some(GroupStatus::Scanned),
            catalog_id: Some(None),
            catalog_title: Some(None),
            catalog_year: Some(None),
            poster_path: Some(None),
            match_confidence: Some(None),
            ..Default::default()
        },
    )?;
    file_repo::update_for_group(
        db,
        group_id,
        None,
        &FileUpdate {
            status: Some(GroupStatus::Scanned),
            catalog_id: Some(None),
            catalog_title: Some(None),
            catalog_year: Some(None),
            poster_path: Some(None),
            episode_title: Some(None),
            match_confidence: Some(None),
            ..Default::default()
        },
    )?;
    let dropped = candidate_repo::delete_for_group(db, group_id)?;
    info!(
        "Group {} reset for rematch ({} candidates dropped)",
        group_id, dropped
    );
    Ok(())
}

impl Matcher {
    /// Applies a stored candidate chosen by the user, exactly like an auto-match.
    pub async fn apply_candidate(
        &self,
        group_id: i64,
        candidate_id: i64,
    ) -> Result<(), MatchError> {
        let group = group_repo::get(&self.db, group_id)?;
        if !MATCHABLE.contains(&group.status) {
            return Err(MatchError::InvalidTransition {
                from: group.status,
                to: GroupStatus::Matched,
            });
        }

        let candidate = candidate_repo::find_by_id(&self.db, candidate_id)?
            .filter(|c| c.group_id == group_id)
            .ok_or(MatchError::CandidateMismatch {
                group_id,
                candidate_id,
            })?;

        info!(
            "Group {} manually matched to '{}' (catalog id {})",
            group_id, candidate.title, candidate.catalog_id
        );
        self.apply_match(group_id, &ChosenMatch::from(&candidate))
            .await
    }
}
