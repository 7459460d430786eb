//! The self-perpetuating game watcher and the schedule scan that arms it.

use std::time::Duration as StdDuration;

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::{info, warn};

use goalhorn_common::format::local_start_time;
use goalhorn_common::types::EventKind;

use crate::dedup::Deduplicator;
use crate::deps::BotDeps;
use crate::handlers::acquire_claim;
use crate::jobs::{Job, ScheduledJob};
use crate::publisher::PostDraft;
use crate::router;

/// Poll cadence during a live game.
pub const POLL_INTERVAL_SECONDS: i64 = 30;

/// Polling starts this long before the official start time.
pub const PREGAME_LEAD_MINUTES: i64 = 15;

/// Schedule re-scan cadence.
const SCAN_INTERVAL_HOURS: i64 = 6;

/// One "armed" marker per game so repeated scans don't stack poll loops.
const ARM_TTL: StdDuration = StdDuration::from_secs(48 * 60 * 60);

/// One poll cycle: fetch → dedup → route → re-enqueue until game over.
///
/// Feed or store trouble aborts this cycle and leaves it to the next poll —
/// a 30-second gap is invisible, a duplicate post is not.
pub async fn handle_poll(game_id: i64, deps: &BotDeps) -> Result<Vec<ScheduledJob>> {
    let poll_again = ScheduledJob::after(
        Job::PollGame { game_id },
        Duration::seconds(POLL_INTERVAL_SECONDS),
    );

    let snapshot = match deps.feed.snapshot(game_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(game_id, error = %e, "Snapshot fetch failed, retrying next poll");
            return Ok(vec![poll_again]);
        }
    };

    let dedup = Deduplicator::new(deps.store.clone());
    let new_events = match dedup.filter_new(&snapshot).await {
        Ok(events) => events,
        Err(e) => {
            warn!(game_id, error = %e, "Dedup unavailable, aborting poll cycle");
            return Ok(vec![poll_again]);
        }
    };

    let mut jobs = Vec::new();
    for event in &new_events {
        jobs.extend(router::dispatch_for(game_id, event));
    }

    if snapshot.game_over() {
        info!(game_id, "Game over, poll loop ends");
        // Belt and braces: a feed can flip to a terminal state without ever
        // emitting a game-end play. The final handler's claim dedups the
        // two paths.
        let saw_game_end = new_events.iter().any(|e| e.kind == EventKind::GameEnd);
        if !saw_game_end {
            jobs.push(ScheduledJob::after(
                Job::AnnounceFinal { game_id },
                Duration::seconds(router::GAME_END_DELAY_SECONDS),
            ));
        }
    } else {
        jobs.push(poll_again);
    }

    Ok(jobs)
}

/// Read the club schedule and arm polling for upcoming games: the first
/// poll lands 15 minutes before puck drop (or immediately if that's past).
pub async fn handle_schedule_scan(deps: &BotDeps) -> Result<Vec<ScheduledJob>> {
    let games = deps.feed.schedule_week(&deps.config.team_abbrev).await?;

    // Standings flavor for the game-day post; fine to go without.
    let standing = match deps.feed.standings().await {
        Ok(standings) => standings
            .into_iter()
            .find(|row| row.team_abbrev == deps.config.team_abbrev),
        Err(e) => {
            warn!(error = %e, "Standings unavailable for game-day post");
            None
        }
    };

    let mut jobs = vec![ScheduledJob::after(
        Job::ScheduleScan,
        Duration::hours(SCAN_INTERVAL_HOURS),
    )];

    let now = Utc::now();
    for game in games {
        if game.state.is_terminal() {
            continue;
        }
        if game.start_time_utc - now > Duration::hours(24) {
            continue;
        }

        let armed = acquire_claim(
            deps.store.as_ref(),
            &format!("armed:{}", game.game_id),
            ARM_TTL,
        )
        .await?;
        if !armed {
            continue;
        }

        let first_poll = (game.start_time_utc - Duration::minutes(PREGAME_LEAD_MINUTES)).max(now);
        info!(
            game_id = game.game_id,
            away = game.away_abbrev.as_str(),
            home = game.home_abbrev.as_str(),
            first_poll = %first_poll,
            "Game armed for polling"
        );
        jobs.push(ScheduledJob::at(
            Job::PollGame {
                game_id: game.game_id,
            },
            first_poll,
        ));

        // Game-day post. Non-critical: a publish failure here shouldn't
        // re-run the scan (the arm marker is already taken).
        let standing_line = standing
            .as_ref()
            .map(|row| {
                format!(
                    "\n\n{} enter at {} points through {} games.",
                    deps.config.team_name, row.points, row.games_played
                )
            })
            .unwrap_or_default();
        let text = format!(
            "🏒 Game day! {} @ {} — puck drop at {}.{standing_line}",
            game.away_abbrev,
            game.home_abbrev,
            local_start_time(game.start_time_utc, deps.config.utc_offset),
        );
        let draft =
            PostDraft::new(text).with_logical_key(format!("gameday:{}", game.game_id));
        if let Err(e) = deps.publisher.publish(&draft).await {
            warn!(game_id = game.game_id, error = %e, "Game-day post failed");
        }
    }

    Ok(jobs)
}
