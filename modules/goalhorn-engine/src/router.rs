//! Event → job routing.
//!
//! A pure table from event kind to (job, delay). The delays encode how long
//! the upstream feed needs before an event's payload is trustworthy; tuning
//! them never touches post formatting.

use chrono::Duration;

use goalhorn_common::types::{EventKind, PlayEvent};

use crate::jobs::{Job, ScheduledJob, SummaryStage};

/// Scorer/assist attribution and shot totals lag the goal call by a minute
/// or more.
pub const GOAL_DELAY_SECONDS: i64 = 90;

/// Penalty details settle faster than goals.
pub const PENALTY_DELAY_SECONDS: i64 = 30;

/// Shots are only a trigger for goalie-change detection; near-immediate.
pub const SHOT_DELAY_SECONDS: i64 = 5;

/// Box-score aggregation needs a beat after the horn before stats posts.
pub const PERIOD_END_DELAY_SECONDS: i64 = 180;

/// Gap between the chained period-summary posts so each parent exists
/// before its reply publishes.
pub const SUMMARY_STEP_SECONDS: i64 = 15;

/// Final-score post waits out last-second scoring corrections.
pub const GAME_END_DELAY_SECONDS: i64 = 90;

/// Jobs to schedule for a freshly detected event. Unknown event kinds get
/// no handler and are dropped here.
pub fn dispatch_for(game_id: i64, event: &PlayEvent) -> Vec<ScheduledJob> {
    let event_id = event.event_id;
    match event.kind {
        EventKind::Goal => vec![ScheduledJob::after(
            Job::AnnounceGoal {
                game_id,
                event_id,
                attempt: 0,
            },
            Duration::seconds(GOAL_DELAY_SECONDS),
        )],

        EventKind::Penalty => vec![ScheduledJob::after(
            Job::AnnouncePenalty { game_id, event_id },
            Duration::seconds(PENALTY_DELAY_SECONDS),
        )],

        EventKind::ShotOnGoal => vec![ScheduledJob::after(
            Job::CheckGoalieChange { game_id, event_id },
            Duration::seconds(SHOT_DELAY_SECONDS),
        )],

        EventKind::PeriodStart => vec![ScheduledJob::now(Job::AnnouncePeriodStart {
            game_id,
            event_id,
        })],

        // The stats thread: three posts at strictly increasing ready times,
        // each threaded beneath the one before it.
        EventKind::PeriodEnd => {
            let period_number = event.period.number;
            [
                SummaryStage::TimeOnIce,
                SummaryStage::Shots,
                SummaryStage::TeamSplits,
            ]
            .into_iter()
            .enumerate()
            .map(|(i, stage)| {
                ScheduledJob::after(
                    Job::PeriodSummary {
                        game_id,
                        period_number,
                        stage,
                    },
                    Duration::seconds(PERIOD_END_DELAY_SECONDS + SUMMARY_STEP_SECONDS * i as i64),
                )
            })
            .collect()
        }

        EventKind::GameEnd => vec![ScheduledJob::after(
            Job::AnnounceFinal { game_id },
            Duration::seconds(GAME_END_DELAY_SECONDS),
        )],

        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{play, snapshot_with_plays};
    use chrono::Utc;

    #[test]
    fn goal_routes_with_long_delay() {
        let snap = snapshot_with_plays(vec![play(240, EventKind::Goal)]);
        let jobs = dispatch_for(snap.game_id, &snap.plays[0]);
        assert_eq!(jobs.len(), 1);
        assert!(matches!(
            jobs[0].job,
            Job::AnnounceGoal {
                event_id: 240,
                attempt: 0,
                ..
            }
        ));
        let delay = jobs[0].run_at - Utc::now();
        assert!(delay.num_seconds() >= GOAL_DELAY_SECONDS - 2);
    }

    #[test]
    fn shot_triggers_goalie_check_almost_immediately() {
        let snap = snapshot_with_plays(vec![play(301, EventKind::ShotOnGoal)]);
        let jobs = dispatch_for(snap.game_id, &snap.plays[0]);
        assert!(matches!(
            jobs[0].job,
            Job::CheckGoalieChange { event_id: 301, .. }
        ));
        assert!((jobs[0].run_at - Utc::now()).num_seconds() <= SHOT_DELAY_SECONDS);
    }

    #[test]
    fn period_end_schedules_three_stage_chain() {
        let snap = snapshot_with_plays(vec![play(400, EventKind::PeriodEnd)]);
        let jobs = dispatch_for(snap.game_id, &snap.plays[0]);
        assert_eq!(jobs.len(), 3);

        // Strictly increasing ready times.
        assert!(jobs[0].run_at < jobs[1].run_at);
        assert!(jobs[1].run_at < jobs[2].run_at);

        let stages: Vec<SummaryStage> = jobs
            .iter()
            .map(|j| match j.job {
                Job::PeriodSummary { stage, .. } => stage,
                _ => panic!("expected period summary"),
            })
            .collect();
        assert_eq!(
            stages,
            vec![
                SummaryStage::TimeOnIce,
                SummaryStage::Shots,
                SummaryStage::TeamSplits
            ]
        );
    }

    #[test]
    fn unhandled_kinds_are_dropped() {
        for kind in [
            EventKind::Faceoff,
            EventKind::Hit,
            EventKind::Stoppage,
            EventKind::Giveaway,
            EventKind::Other,
        ] {
            let snap = snapshot_with_plays(vec![play(1, kind)]);
            assert!(dispatch_for(snap.game_id, &snap.plays[0]).is_empty());
        }
    }
}
