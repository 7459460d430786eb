//! Goal announcement.
//!
//! Runs ~90s after detection so the feed has filled in attribution. If the
//! scorer still hasn't landed, the job re-enqueues itself a bounded number
//! of times before giving up — a goal post with no scorer is meaningless.

use anyhow::Result;
use chrono::Duration;
use tracing::{info, warn};

use bluesky_client::ExternalEmbed;
use goalhorn_common::format::UNKNOWN_PLAYER;
use goalhorn_common::types::{EventKind, GameSnapshot, MilestoneCredit, PlayEvent};

use crate::deps::BotDeps;
use crate::handlers::{milestones, SkipReason};
use crate::jobs::{Job, ScheduledJob};
use crate::publisher::PostDraft;
use crate::reconciler::RECONCILE_DELAY_SECONDS;

/// Attempts to wait out a missing scorer before dropping the announcement.
pub const MAX_ANNOUNCE_ATTEMPTS: u32 = 5;

/// Wait between scorer re-checks.
pub const SCORER_WAIT_SECONDS: i64 = 30;

/// Wait between highlight-clip polls; the clip trails the goal by minutes.
pub const HIGHLIGHT_WAIT_SECONDS: i64 = 60;

/// Highlight polls before giving up.
pub const MAX_HIGHLIGHT_ATTEMPTS: u32 = 5;

pub fn goal_key(game_id: i64, event_id: i64) -> String {
    format!("goal:{game_id}:{event_id}")
}

pub async fn handle_announce_goal(
    game_id: i64,
    event_id: i64,
    attempt: u32,
    deps: &BotDeps,
) -> Result<Vec<ScheduledJob>> {
    let snapshot = deps.feed.snapshot(game_id).await?;

    let Some(event) = snapshot.find_play(event_id).filter(|p| p.kind == EventKind::Goal) else {
        info!(
            game_id,
            event_id,
            skip = %SkipReason::EventVanished,
            "Goal disappeared before announcement"
        );
        return Ok(vec![]);
    };
    let event = event.clone();

    let Some(original) = event.attribution() else {
        let next_attempt = attempt + 1;
        if next_attempt < MAX_ANNOUNCE_ATTEMPTS {
            info!(game_id, event_id, attempt = next_attempt, "Scorer not in feed yet, waiting");
            return Ok(vec![ScheduledJob::after(
                Job::AnnounceGoal {
                    game_id,
                    event_id,
                    attempt: next_attempt,
                },
                Duration::seconds(SCORER_WAIT_SECONDS),
            )]);
        }
        warn!(
            game_id,
            event_id,
            skip = %SkipReason::NoScorer,
            "Scorer never populated, dropping announcement"
        );
        return Ok(vec![]);
    };

    let our_goal = event.details.event_owner_team_id == Some(deps.config.team_id);
    let draft = compose_goal_post(&snapshot, &event, our_goal, &deps.config.team_name);
    deps.publisher.publish(&draft).await?;

    let mut follow_ups = vec![ScheduledJob::after(
        Job::ReconcileGoal {
            game_id,
            event_id,
            original,
            period_number: event.period.number,
            elapsed_seconds: event.elapsed_seconds().unwrap_or(0),
        },
        Duration::seconds(RECONCILE_DELAY_SECONDS),
    )];

    if our_goal {
        follow_ups.push(ScheduledJob::after(
            Job::FetchHighlight {
                game_id,
                event_id,
                attempt: 0,
            },
            Duration::seconds(HIGHLIGHT_WAIT_SECONDS),
        ));
        announce_milestones(&event, deps).await?;
    }

    Ok(follow_ups)
}

fn compose_goal_post(
    snapshot: &GameSnapshot,
    event: &PlayEvent,
    our_goal: bool,
    team_name: &str,
) -> PostDraft {
    let scorer = event
        .details
        .scoring_player_id
        .and_then(|id| snapshot.player_name(id))
        .unwrap_or_else(|| UNKNOWN_PLAYER.to_string());

    let period = goalhorn_common::format::period_name(&event.period);
    let time = &event.time_in_period;

    // Prefer the score captured on the play itself; the live team score may
    // have moved on by the time this job runs.
    let score_line = match (event.details.away_score, event.details.home_score) {
        (Some(away), Some(home)) => format!(
            "{} {} - {} {}",
            snapshot.away.abbrev, away, snapshot.home.abbrev, home
        ),
        _ => snapshot.score_line(),
    };

    let text = if our_goal {
        let assists = assists_line(snapshot, event);
        format!(
            "🎉 {} GOOOOOOOAL! 🎉\n\n{scorer} scores in {period} ({time}).{assists}\n\n{score_line}",
            team_name.to_uppercase()
        )
    } else {
        let opponent = event
            .details
            .event_owner_team_id
            .and_then(|id| snapshot.team(id))
            .map(|t| t.name.clone())
            .unwrap_or_else(|| "Opponent".to_string());
        format!("🚨 {opponent} goal. {scorer} scores in {period} ({time}).\n\n{score_line}")
    };

    PostDraft::new(text).with_logical_key(goal_key(snapshot.game_id, event.event_id))
}

fn assists_line(snapshot: &GameSnapshot, event: &PlayEvent) -> String {
    let name = |id: i64| {
        snapshot
            .player_name(id)
            .unwrap_or_else(|| UNKNOWN_PLAYER.to_string())
    };
    match (
        event.details.assist1_player_id,
        event.details.assist2_player_id,
    ) {
        (Some(a1), Some(a2)) => format!(" Assists: {}, {}.", name(a1), name(a2)),
        (Some(a1), None) => format!(" Assist: {}.", name(a1)),
        _ => " Unassisted.".to_string(),
    }
}

/// Check every credited skater for career milestones. Feed hiccups degrade
/// to a skipped check; publish failures bubble up.
async fn announce_milestones(event: &PlayEvent, deps: &BotDeps) -> Result<()> {
    let mut credits = Vec::new();
    if let Some(scorer) = event.details.scoring_player_id {
        credits.push((scorer, true));
    }
    for assist in [
        event.details.assist1_player_id,
        event.details.assist2_player_id,
    ]
    .into_iter()
    .flatten()
    {
        credits.push((assist, false));
    }

    for (player_id, scored) in credits {
        let detail = match deps.feed.player(player_id).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!(player_id, error = %e, "Career totals unavailable, skipping milestone check");
                continue;
            }
        };

        for milestone in milestones::skater_milestones(&detail.career, scored) {
            let text = milestones::milestone_text(&detail.name, &milestone);
            let key = format!("milestone:{}:{}:{}", player_id, milestone.credit, milestone.total);
            deps.publisher
                .publish(&PostDraft::new(text).with_logical_key(key))
                .await?;
        }

        // Milestone watch fires once, as a total steps onto the window edge.
        let watches = [
            (
                MilestoneCredit::Goal,
                detail.career.goals,
                deps.config.upcoming_goal_window,
            ),
            (
                MilestoneCredit::Point,
                detail.career.points,
                deps.config.upcoming_point_window,
            ),
        ];
        for (credit, total, window) in watches {
            if !scored && credit == MilestoneCredit::Goal {
                continue;
            }
            if let Some(approaching) = milestones::entering_watch_window(credit, total, window) {
                let text = milestones::approaching_text(&detail.name, &approaching);
                let key = format!(
                    "milestone-watch:{}:{}:{}",
                    player_id, approaching.credit, approaching.threshold
                );
                deps.publisher
                    .publish(&PostDraft::new(text).with_logical_key(key))
                    .await?;
            }
        }
    }

    Ok(())
}

/// Poll for the goal's highlight clip; re-enqueue until it appears or the
/// attempt cap is hit.
pub async fn handle_fetch_highlight(
    game_id: i64,
    event_id: i64,
    attempt: u32,
    deps: &BotDeps,
) -> Result<Vec<ScheduledJob>> {
    let snapshot = deps.feed.snapshot(game_id).await?;
    let Some(event) = snapshot.find_play(event_id).filter(|p| p.kind == EventKind::Goal) else {
        info!(game_id, event_id, skip = %SkipReason::EventVanished, "Goal gone, dropping highlight poll");
        return Ok(vec![]);
    };

    let highlights = deps.feed.goal_highlights(game_id).await?;
    let clip = highlights.iter().find(|h| {
        h.period_number == event.period.number && h.time_in_period == event.time_in_period
    });

    match clip.and_then(|h| h.clip_url.clone()) {
        Some(url) => {
            let scorer = event
                .details
                .scoring_player_id
                .and_then(|id| snapshot.player_name(id))
                .unwrap_or_else(|| UNKNOWN_PLAYER.to_string());
            let draft = PostDraft::new("🎥 Highlight of the goal:")
                .with_logical_key(format!("highlight:{game_id}:{event_id}"))
                .with_parent(goal_key(game_id, event_id))
                .with_media(ExternalEmbed {
                    uri: url,
                    title: format!("{scorer} scores"),
                    description: snapshot.score_line(),
                });
            deps.publisher.publish(&draft).await?;
            Ok(vec![])
        }
        None => {
            let next_attempt = attempt + 1;
            if next_attempt < MAX_HIGHLIGHT_ATTEMPTS {
                info!(game_id, event_id, attempt = next_attempt, "Highlight not ready, polling again");
                Ok(vec![ScheduledJob::after(
                    Job::FetchHighlight {
                        game_id,
                        event_id,
                        attempt: next_attempt,
                    },
                    Duration::seconds(HIGHLIGHT_WAIT_SECONDS),
                )])
            } else {
                info!(game_id, event_id, "Highlight never appeared, giving up");
                Ok(vec![])
            }
        }
    }
}
