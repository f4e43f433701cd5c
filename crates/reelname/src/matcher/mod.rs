//! Catalog matching: scoring, the match engine and manual review actions.

pub mod engine;
pub mod review;
pub mod scoring;

pub use engine::{MatchOutcome, MatchSummary, Matcher};
pub use review::{confirm_group, reset_group, skip_group};
pub use scoring::{confidence, should_auto_match, title_similarity, ParsedQuery};
