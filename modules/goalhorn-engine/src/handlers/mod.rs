//! Job handlers.
//!
//! Each handler receives its job's arguments plus `BotDeps`, performs I/O,
//! and returns follow-up jobs for the scheduler. "Intentionally not posting"
//! is a first-class outcome (`SkipReason`), distinct from an error: errors
//! bubble to the scheduler's retry machinery, skips end the job quietly.

pub(crate) mod goal;
pub(crate) mod goalie;
pub mod milestones;
pub(crate) mod penalty;
pub(crate) mod period;
pub(crate) mod watch;

use std::time::Duration;

use anyhow::{Context, Result};

use goalhorn_store::KeyValue;

/// Why a handler chose not to post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The event is no longer in the feed.
    EventVanished,
    /// The feed never filled in the scorer.
    NoScorer,
    /// Another worker holds the claim for this post.
    AlreadyClaimed,
    /// Retraction suspected but no review marker found — don't guess.
    NoEvidence,
    /// Reconciliation found nothing to correct.
    Unchanged,
    /// The goalie-change guard called this detection noise.
    FalsePositive,
    /// Required data absent and the post would be meaningless without it.
    MissingData,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::EventVanished => "event_vanished",
            SkipReason::NoScorer => "no_scorer",
            SkipReason::AlreadyClaimed => "already_claimed",
            SkipReason::NoEvidence => "no_evidence",
            SkipReason::Unchanged => "unchanged",
            SkipReason::FalsePositive => "false_positive",
            SkipReason::MissingData => "missing_data",
        };
        write!(f, "{s}")
    }
}

/// Take a short-TTL claim so exactly one racing worker proceeds. The loser
/// gets `false` and should discard its work silently.
pub(crate) async fn acquire_claim(
    store: &dyn KeyValue,
    key: &str,
    ttl: Duration,
) -> Result<bool> {
    store
        .set_if_absent(key, "1", ttl)
        .await
        .with_context(|| format!("claim {key}"))
}
