//! Job types for the scheduler dispatch loop.
//!
//! Every unit of deferred work is a `Job` variant. Handlers are idempotent or
//! self-checking — delivery is at-least-once, and several variants re-enqueue
//! themselves on purpose (the game poll, highlight polling).

use chrono::{DateTime, Duration, Utc};
use goalhorn_common::types::GoalAttribution;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Job {
    /// Scan the club schedule and arm polling for the next game.
    ScheduleScan,

    /// One poll cycle: fetch snapshot, dedup, route, re-enqueue until the
    /// game is over.
    PollGame { game_id: i64 },

    /// Announce a goal. `attempt` counts waits for the feed to fill in the
    /// scorer.
    AnnounceGoal {
        game_id: i64,
        event_id: i64,
        attempt: u32,
    },

    AnnouncePenalty { game_id: i64, event_id: i64 },

    /// Shot-on-goal trigger: check whether the goaltender changed.
    CheckGoalieChange { game_id: i64, event_id: i64 },

    AnnouncePeriodStart { game_id: i64, event_id: i64 },

    /// One stage of the end-of-period stats thread.
    PeriodSummary {
        game_id: i64,
        period_number: u32,
        stage: SummaryStage,
    },

    AnnounceFinal { game_id: i64 },

    /// Re-examine a previously announced goal for revision or retraction.
    ReconcileGoal {
        game_id: i64,
        event_id: i64,
        original: GoalAttribution,
        period_number: u32,
        elapsed_seconds: u32,
    },

    /// Poll for a goal's highlight clip until it appears (bounded).
    FetchHighlight {
        game_id: i64,
        event_id: i64,
        attempt: u32,
    },
}

impl Job {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Job::ScheduleScan => "schedule_scan",
            Job::PollGame { .. } => "poll_game",
            Job::AnnounceGoal { .. } => "announce_goal",
            Job::AnnouncePenalty { .. } => "announce_penalty",
            Job::CheckGoalieChange { .. } => "check_goalie_change",
            Job::AnnouncePeriodStart { .. } => "announce_period_start",
            Job::PeriodSummary { .. } => "period_summary",
            Job::AnnounceFinal { .. } => "announce_final",
            Job::ReconcileGoal { .. } => "reconcile_goal",
            Job::FetchHighlight { .. } => "fetch_highlight",
        }
    }
}

/// The three posts of the period-stats thread, each a reply to the previous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStage {
    TimeOnIce,
    Shots,
    TeamSplits,
}

/// A job plus when it becomes ready. `attempt` counts scheduler-level error
/// retries, not handler-level re-polls (those live inside the job payload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub job: Job,
    pub run_at: DateTime<Utc>,
    pub attempt: u32,
}

impl ScheduledJob {
    pub fn now(job: Job) -> Self {
        Self {
            job,
            run_at: Utc::now(),
            attempt: 0,
        }
    }

    pub fn after(job: Job, delay: Duration) -> Self {
        Self {
            job,
            run_at: Utc::now() + delay,
            attempt: 0,
        }
    }

    pub fn at(job: Job, run_at: DateTime<Utc>) -> Self {
        Self {
            job,
            run_at,
            attempt: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_round_trip_through_json() {
        let job = Job::ReconcileGoal {
            game_id: 2024020500,
            event_id: 240,
            original: GoalAttribution {
                scorer: 8471685,
                assist1: Some(8471215),
                assist2: None,
            },
            period_number: 2,
            elapsed_seconds: 258,
        };
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
        assert_eq!(job.variant_name(), "reconcile_goal");
    }

    #[test]
    fn after_sets_future_ready_time() {
        let before = Utc::now();
        let scheduled = ScheduledJob::after(Job::ScheduleScan, Duration::seconds(90));
        assert!(scheduled.run_at >= before + Duration::seconds(89));
        assert_eq!(scheduled.attempt, 0);
    }
}
