//! Goal revision reconciliation.
//!
//! Scheduled once per announced goal, ten minutes after the post. The feed
//! revises scoring plays (credit changes) and occasionally retracts them
//! outright (coach's challenge, league review). Each outcome gets a reply
//! threaded beneath the original announcement; "unchanged" stays silent.

use std::time::Duration as StdDuration;

use anyhow::Result;
use tracing::info;

use goalhorn_common::format::UNKNOWN_PLAYER;
use goalhorn_common::types::{EventKind, GameSnapshot, GoalAttribution};

use crate::deps::BotDeps;
use crate::handlers::goal::goal_key;
use crate::handlers::{acquire_claim, SkipReason};
use crate::jobs::ScheduledJob;
use crate::publisher::PostDraft;

/// Delay between the goal post and the reconciliation pass.
pub const RECONCILE_DELAY_SECONDS: i64 = 600;

/// A retracted goal's covering review sits in the same period within this
/// many seconds of the original goal time.
const RETRACTION_WINDOW_SECONDS: u32 = 180;

/// Single-fire guard for correction posts.
const RECONCILE_CLAIM_TTL: StdDuration = StdDuration::from_secs(48 * 60 * 60);

/// Outcome of re-examining an announced goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Unchanged,
    Revised(GoalAttribution),
    /// Gone from the feed. Carries the covering review ruling when one was
    /// found nearby; `None` means not enough evidence to post anything.
    Retracted(Option<ChallengeRuling>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeRuling {
    pub challenger: Challenger,
    pub reason: ReviewReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Challenger {
    HomeTeam,
    VisitingTeam,
    League,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewReason {
    GoalInterference,
    Offside,
    MissedStoppage,
    PuckOverNet,
    Other,
}

/// Classify a stoppage reason code from the fixed challenge-code table.
/// Codes look like "chlg-hm-goal-interference"; anything that isn't a
/// challenge or league review classifies as `None`.
pub fn classify_challenge(code: &str) -> Option<ChallengeRuling> {
    let (challenger, rest) = if let Some(rest) = code.strip_prefix("chlg-hm-") {
        (Challenger::HomeTeam, rest)
    } else if let Some(rest) = code.strip_prefix("chlg-vis-") {
        (Challenger::VisitingTeam, rest)
    } else if let Some(rest) = code.strip_prefix("chlg-league-") {
        (Challenger::League, rest)
    } else if code == "video-review" {
        return Some(ChallengeRuling {
            challenger: Challenger::League,
            reason: ReviewReason::Other,
        });
    } else {
        return None;
    };

    let reason = match rest {
        "goal-interference" => ReviewReason::GoalInterference,
        "off-side" => ReviewReason::Offside,
        "missed-stoppage" => ReviewReason::MissedStoppage,
        "puck-over-net" => ReviewReason::PuckOverNet,
        _ => ReviewReason::Other,
    };

    Some(ChallengeRuling { challenger, reason })
}

/// Pure evaluation against a fresh snapshot. I/O-free so the whole state
/// machine is testable from snapshot fixtures.
pub fn evaluate(
    snapshot: &GameSnapshot,
    event_id: i64,
    original: &GoalAttribution,
    period_number: u32,
    elapsed_seconds: u32,
) -> Reconciliation {
    match snapshot
        .find_play(event_id)
        .filter(|p| p.kind == EventKind::Goal)
    {
        Some(play) => match play.attribution() {
            Some(current) if current != *original => Reconciliation::Revised(current),
            // A goal that lost its scorer mid-review is indistinguishable
            // from feed noise; wait for the feed to make up its mind.
            _ => Reconciliation::Unchanged,
        },
        None => {
            let ruling = snapshot
                .plays
                .iter()
                .filter(|p| p.kind == EventKind::Stoppage && p.period.number == period_number)
                .filter(|p| {
                    p.elapsed_seconds()
                        .is_some_and(|t| t.abs_diff(elapsed_seconds) <= RETRACTION_WINDOW_SECONDS)
                })
                .find_map(|p| {
                    p.details
                        .reason
                        .as_deref()
                        .and_then(classify_challenge)
                        .or_else(|| {
                            p.details
                                .secondary_reason
                                .as_deref()
                                .and_then(classify_challenge)
                        })
                });
            Reconciliation::Retracted(ruling)
        }
    }
}

pub async fn handle_reconcile(
    game_id: i64,
    event_id: i64,
    original: &GoalAttribution,
    period_number: u32,
    elapsed_seconds: u32,
    deps: &BotDeps,
) -> Result<Vec<ScheduledJob>> {
    let snapshot = deps.feed.snapshot(game_id).await?;

    let outcome = evaluate(&snapshot, event_id, original, period_number, elapsed_seconds);

    let draft = match &outcome {
        Reconciliation::Unchanged => {
            info!(game_id, event_id, skip = %SkipReason::Unchanged, "Goal stands as announced");
            return Ok(vec![]);
        }
        Reconciliation::Revised(current) => compose_revision(&snapshot, event_id, current),
        Reconciliation::Retracted(Some(ruling)) => compose_retraction(&snapshot, event_id, ruling),
        Reconciliation::Retracted(None) => {
            info!(
                game_id,
                event_id,
                skip = %SkipReason::NoEvidence,
                "Goal vanished but no review marker found, staying silent"
            );
            return Ok(vec![]);
        }
    };

    // The claim sits between evaluation and publish: scheduling this
    // reconciler twice must not produce two correction posts.
    if !acquire_claim(
        deps.store.as_ref(),
        &format!("reconciled:{game_id}:{event_id}"),
        RECONCILE_CLAIM_TTL,
    )
    .await?
    {
        info!(game_id, event_id, skip = %SkipReason::AlreadyClaimed, "Correction already posted");
        return Ok(vec![]);
    }

    deps.publisher.publish(&draft).await?;
    Ok(vec![])
}

fn compose_revision(
    snapshot: &GameSnapshot,
    event_id: i64,
    current: &GoalAttribution,
) -> PostDraft {
    let name = |id: i64| {
        snapshot
            .player_name(id)
            .unwrap_or_else(|| UNKNOWN_PLAYER.to_string())
    };

    let assists = match (current.assist1, current.assist2) {
        (Some(a1), Some(a2)) => format!(" Assists: {}, {}.", name(a1), name(a2)),
        (Some(a1), None) => format!(" Assist: {}.", name(a1)),
        _ => " Unassisted.".to_string(),
    };

    PostDraft::new(format!(
        "📝 Scoring change on that goal: now credited to {}.{assists}",
        name(current.scorer)
    ))
    .with_logical_key(format!("scoring-change:{}:{event_id}", snapshot.game_id))
    .with_parent(goal_key(snapshot.game_id, event_id))
}

fn compose_retraction(
    snapshot: &GameSnapshot,
    event_id: i64,
    ruling: &ChallengeRuling,
) -> PostDraft {
    let cause = ruling_text(ruling, snapshot);
    PostDraft::new(format!(
        "❌ Goal Overturned. The goal has been disallowed following {cause}.\n\n{}",
        snapshot.score_line()
    ))
    .with_logical_key(format!("goal-overturned:{}:{event_id}", snapshot.game_id))
    .with_parent(goal_key(snapshot.game_id, event_id))
}

fn ruling_text(ruling: &ChallengeRuling, snapshot: &GameSnapshot) -> String {
    let challenger = match ruling.challenger {
        Challenger::HomeTeam => format!("the {}", snapshot.home.name),
        Challenger::VisitingTeam => format!("the {}", snapshot.away.name),
        Challenger::League => "the league".to_string(),
    };
    match ruling.reason {
        ReviewReason::GoalInterference => {
            format!("a successful goaltender interference challenge by {challenger}")
        }
        ReviewReason::Offside => format!("a successful off-side challenge by {challenger}"),
        ReviewReason::MissedStoppage => {
            format!("a successful missed-stoppage challenge by {challenger}")
        }
        ReviewReason::PuckOverNet => {
            format!("video review ({challenger}): the puck was out of play")
        }
        ReviewReason::Other => format!("a video review initiated by {challenger}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goalhorn_common::types::EventDetails;

    use crate::testing::{base_snapshot, goal_play, play};

    fn original() -> GoalAttribution {
        GoalAttribution {
            scorer: 8471685,
            assist1: Some(8471215),
            assist2: None,
        }
    }

    #[test]
    fn unchanged_when_attribution_matches() {
        let mut snap = base_snapshot();
        snap.plays.push(goal_play(240, Some(8471685)));
        snap.plays[0].details.assist1_player_id = Some(8471215);

        let outcome = evaluate(&snap, 240, &original(), 2, 258);
        assert_eq!(outcome, Reconciliation::Unchanged);
    }

    #[test]
    fn revised_when_scorer_differs() {
        let mut snap = base_snapshot();
        snap.plays.push(goal_play(240, Some(8476459)));

        match evaluate(&snap, 240, &original(), 2, 258) {
            Reconciliation::Revised(current) => assert_eq!(current.scorer, 8476459),
            other => panic!("expected revision, got {other:?}"),
        }
    }

    #[test]
    fn revised_when_assists_change() {
        let mut snap = base_snapshot();
        snap.plays.push(goal_play(240, Some(8471685)));
        snap.plays[0].details.assist1_player_id = Some(8480000);

        assert!(matches!(
            evaluate(&snap, 240, &original(), 2, 258),
            Reconciliation::Revised(_)
        ));
    }

    #[test]
    fn retracted_with_nearby_challenge_marker() {
        let mut snap = base_snapshot();
        // Goal 240 absent. A challenge stoppage 80 seconds later in the
        // same period.
        let mut stoppage = play(250, EventKind::Stoppage);
        stoppage.time_in_period = "05:38".to_string();
        stoppage.details = EventDetails {
            reason: Some("chlg-hm-goal-interference".to_string()),
            ..Default::default()
        };
        snap.plays.push(stoppage);

        match evaluate(&snap, 240, &original(), 2, 258) {
            Reconciliation::Retracted(Some(ruling)) => {
                assert_eq!(ruling.challenger, Challenger::HomeTeam);
                assert_eq!(ruling.reason, ReviewReason::GoalInterference);
            }
            other => panic!("expected retraction with ruling, got {other:?}"),
        }
    }

    #[test]
    fn retraction_ignores_markers_outside_the_window() {
        let mut snap = base_snapshot();
        // Right reason, wrong half of the period.
        let mut stoppage = play(250, EventKind::Stoppage);
        stoppage.time_in_period = "15:00".to_string();
        stoppage.details = EventDetails {
            reason: Some("chlg-hm-goal-interference".to_string()),
            ..Default::default()
        };
        snap.plays.push(stoppage);

        // And a marker in a different period.
        let mut other_period = play(251, EventKind::Stoppage);
        other_period.period.number = 1;
        other_period.time_in_period = "04:30".to_string();
        other_period.details = EventDetails {
            reason: Some("chlg-vis-off-side".to_string()),
            ..Default::default()
        };
        snap.plays.push(other_period);

        assert_eq!(
            evaluate(&snap, 240, &original(), 2, 258),
            Reconciliation::Retracted(None)
        );
    }

    #[test]
    fn challenge_code_table() {
        assert_eq!(
            classify_challenge("chlg-hm-goal-interference"),
            Some(ChallengeRuling {
                challenger: Challenger::HomeTeam,
                reason: ReviewReason::GoalInterference
            })
        );
        assert_eq!(
            classify_challenge("chlg-vis-off-side"),
            Some(ChallengeRuling {
                challenger: Challenger::VisitingTeam,
                reason: ReviewReason::Offside
            })
        );
        assert_eq!(
            classify_challenge("chlg-league-missed-stoppage"),
            Some(ChallengeRuling {
                challenger: Challenger::League,
                reason: ReviewReason::MissedStoppage
            })
        );
        assert_eq!(
            classify_challenge("video-review"),
            Some(ChallengeRuling {
                challenger: Challenger::League,
                reason: ReviewReason::Other
            })
        );
        // Ordinary stoppages never classify.
        assert_eq!(classify_challenge("icing"), None);
        assert_eq!(classify_challenge("goalie-stopped"), None);
    }
}
