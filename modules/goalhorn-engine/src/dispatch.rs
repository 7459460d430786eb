//! Job → handler dispatch.

use anyhow::Result;
use tracing::debug;

use crate::deps::BotDeps;
use crate::handlers::{goal, goalie, penalty, period, watch};
use crate::jobs::{Job, ScheduledJob};
use crate::reconciler;

/// Run one job to completion, returning follow-up jobs for the scheduler.
pub async fn dispatch(scheduled: &ScheduledJob, deps: &BotDeps) -> Result<Vec<ScheduledJob>> {
    debug!(job = scheduled.job.variant_name(), "Dispatching job");
    match &scheduled.job {
        Job::ScheduleScan => watch::handle_schedule_scan(deps).await,

        Job::PollGame { game_id } => watch::handle_poll(*game_id, deps).await,

        Job::AnnounceGoal {
            game_id,
            event_id,
            attempt,
        } => goal::handle_announce_goal(*game_id, *event_id, *attempt, deps).await,

        Job::AnnouncePenalty { game_id, event_id } => {
            penalty::handle_announce_penalty(*game_id, *event_id, deps).await
        }

        Job::CheckGoalieChange { game_id, event_id } => {
            goalie::handle_goalie_check(*game_id, *event_id, deps).await
        }

        Job::AnnouncePeriodStart { game_id, event_id } => {
            period::handle_period_start(*game_id, *event_id, deps).await
        }

        Job::PeriodSummary {
            game_id,
            period_number,
            stage,
        } => period::handle_period_summary(*game_id, *period_number, *stage, deps).await,

        Job::AnnounceFinal { game_id } => period::handle_announce_final(*game_id, deps).await,

        Job::ReconcileGoal {
            game_id,
            event_id,
            original,
            period_number,
            elapsed_seconds,
        } => {
            reconciler::handle_reconcile(
                *game_id,
                *event_id,
                original,
                *period_number,
                *elapsed_seconds,
                deps,
            )
            .await
        }

        Job::FetchHighlight {
            game_id,
            event_id,
            attempt,
        } => goal::handle_fetch_highlight(*game_id, *event_id, *attempt, deps).await,
    }
}
