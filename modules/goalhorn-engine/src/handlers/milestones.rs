//! Career milestone evaluation.
//!
//! Stateless threshold checks over externally-fetched career totals. Totals
//! are read from the player landing feed, which updates live, so a freshly
//! credited goal is already included in the number we test.

use goalhorn_common::types::{CareerTotals, MilestoneCredit};

pub const GOAL_MILESTONES: &[u32] = &[1, 50, 100, 200, 300, 400, 500, 600, 700, 800];
pub const ASSIST_MILESTONES: &[u32] = &[1, 100, 250, 500, 750, 1000];
pub const POINT_MILESTONES: &[u32] = &[1, 100, 250, 500, 750, 1000, 1500];
pub const WIN_MILESTONES: &[u32] = &[1, 50, 100, 150, 200, 300, 400, 500];
pub const SHUTOUT_MILESTONES: &[u32] = &[1, 10, 25, 50, 75, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone {
    pub credit: MilestoneCredit,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Approaching {
    pub credit: MilestoneCredit,
    pub threshold: u32,
    pub needed: u32,
}

fn milestone_set(credit: MilestoneCredit) -> &'static [u32] {
    match credit {
        MilestoneCredit::Goal => GOAL_MILESTONES,
        MilestoneCredit::Assist => ASSIST_MILESTONES,
        MilestoneCredit::Point => POINT_MILESTONES,
        MilestoneCredit::Win => WIN_MILESTONES,
        MilestoneCredit::Shutout => SHUTOUT_MILESTONES,
    }
}

/// Did this total just land on a threshold?
pub fn milestone_reached(credit: MilestoneCredit, total: u32) -> Option<Milestone> {
    milestone_set(credit)
        .contains(&total)
        .then_some(Milestone { credit, total })
}

/// Milestones for a skater credited on a goal. `scored` distinguishes the
/// goal scorer from assist credits.
///
/// Tie-break: a first career goal is always a first career point too — that
/// coincidence announces once, goal-flavored, with the point suppressed.
pub fn skater_milestones(career: &CareerTotals, scored: bool) -> Vec<Milestone> {
    let mut milestones = Vec::new();

    if scored {
        let goal = milestone_reached(MilestoneCredit::Goal, career.goals);
        let point = milestone_reached(MilestoneCredit::Point, career.points);
        if let Some(goal) = goal {
            milestones.push(goal);
        }
        if let Some(point) = point {
            let first_career_coincidence =
                goal.is_some() && career.goals == 1 && career.points == 1;
            if !first_career_coincidence {
                milestones.push(point);
            }
        }
    } else {
        if let Some(assist) = milestone_reached(MilestoneCredit::Assist, career.assists) {
            milestones.push(assist);
        }
        if let Some(point) = milestone_reached(MilestoneCredit::Point, career.points) {
            milestones.push(point);
        }
    }

    milestones
}

/// Milestones for the winning goaltender.
pub fn goalie_milestones(career: &CareerTotals, shutout: bool) -> Vec<Milestone> {
    let mut milestones = Vec::new();
    if let Some(win) = milestone_reached(MilestoneCredit::Win, career.wins) {
        milestones.push(win);
    }
    if shutout {
        if let Some(so) = milestone_reached(MilestoneCredit::Shutout, career.shutouts) {
            milestones.push(so);
        }
    }
    milestones
}

/// Fires exactly once, when a total steps into the watch window of its next
/// threshold. Windows are product-tuned constants, not derived.
pub fn entering_watch_window(
    credit: MilestoneCredit,
    total: u32,
    window: u32,
) -> Option<Approaching> {
    let threshold = *milestone_set(credit).iter().find(|&&t| t > total)?;
    let needed = threshold - total;
    // Totals move by one, so "just entered the window" means exactly at its
    // edge.
    (needed == window).then_some(Approaching {
        credit,
        threshold,
        needed,
    })
}

pub fn milestone_text(player_name: &str, milestone: &Milestone) -> String {
    match milestone.total {
        1 => format!(
            "🎊 First career {} for {player_name}! The first of many.",
            milestone.credit
        ),
        total => format!(
            "🎊 Milestone! That's career {} No. {total} for {player_name}.",
            milestone.credit
        ),
    }
}

pub fn approaching_text(player_name: &str, approaching: &Approaching) -> String {
    format!(
        "👀 Milestone watch: {player_name} is {} {}{} away from career {} No. {}.",
        approaching.needed,
        approaching.credit,
        if approaching.needed == 1 { "" } else { "s" },
        approaching.credit,
        approaching.threshold,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn career(goals: u32, assists: u32, points: u32) -> CareerTotals {
        CareerTotals {
            games_played: 500,
            goals,
            assists,
            points,
            wins: 0,
            shutouts: 0,
        }
    }

    #[test]
    fn threshold_membership_exact() {
        assert!(milestone_reached(MilestoneCredit::Goal, 100).is_some());
        assert!(milestone_reached(MilestoneCredit::Goal, 99).is_none());
        assert!(milestone_reached(MilestoneCredit::Goal, 101).is_none());
        assert!(milestone_reached(MilestoneCredit::Point, 500).is_some());
        assert!(milestone_reached(MilestoneCredit::Shutout, 25).is_some());
    }

    #[test]
    fn scorer_hits_goal_and_point_thresholds_independently() {
        // 100th goal, 437th point: only the goal milestone.
        let milestones = skater_milestones(&career(100, 337, 437), true);
        assert_eq!(
            milestones,
            vec![Milestone {
                credit: MilestoneCredit::Goal,
                total: 100
            }]
        );

        // 73rd goal, 250th point: only the point milestone.
        let milestones = skater_milestones(&career(73, 177, 250), true);
        assert_eq!(
            milestones,
            vec![Milestone {
                credit: MilestoneCredit::Point,
                total: 250
            }]
        );
    }

    #[test]
    fn first_goal_first_point_announces_once_goal_flavored() {
        let milestones = skater_milestones(&career(1, 0, 1), true);
        assert_eq!(milestones.len(), 1);
        assert_eq!(milestones[0].credit, MilestoneCredit::Goal);
        assert_eq!(milestones[0].total, 1);
    }

    #[test]
    fn hundredth_goal_with_first_point_is_not_the_coincidence_case() {
        // Contrived, but the suppression must only cover the first-career
        // pair, not any goal+point double-hit.
        let milestones = skater_milestones(&career(100, 900, 1000), true);
        assert_eq!(milestones.len(), 2);
    }

    #[test]
    fn first_assist_is_also_first_point_both_announced() {
        // The coincidence rule is goal-specific; an assist that brings up
        // first point announces assist and point.
        let milestones = skater_milestones(&career(0, 1, 1), false);
        assert_eq!(milestones.len(), 2);
        assert_eq!(milestones[0].credit, MilestoneCredit::Assist);
        assert_eq!(milestones[1].credit, MilestoneCredit::Point);
    }

    #[test]
    fn goalie_shutout_only_counts_on_shutout_nights() {
        let totals = CareerTotals {
            games_played: 400,
            goals: 0,
            assists: 0,
            points: 0,
            wins: 200,
            shutouts: 25,
        };
        assert_eq!(goalie_milestones(&totals, false).len(), 1);
        assert_eq!(goalie_milestones(&totals, true).len(), 2);
    }

    #[test]
    fn watch_window_fires_exactly_at_the_edge() {
        // 97 → 3 away from 100 with window 3: fires.
        assert_eq!(
            entering_watch_window(MilestoneCredit::Goal, 97, 3),
            Some(Approaching {
                credit: MilestoneCredit::Goal,
                threshold: 100,
                needed: 3
            })
        );
        // 98 → inside the window but not at the edge: already announced.
        assert_eq!(entering_watch_window(MilestoneCredit::Goal, 98, 3), None);
        // 96 → outside the window.
        assert_eq!(entering_watch_window(MilestoneCredit::Goal, 96, 3), None);
    }

    #[test]
    fn watch_window_past_last_threshold_is_silent() {
        assert_eq!(entering_watch_window(MilestoneCredit::Goal, 900, 3), None);
    }

    #[test]
    fn milestone_text_first_vs_numbered() {
        let first = Milestone {
            credit: MilestoneCredit::Goal,
            total: 1,
        };
        assert!(milestone_text("Luke Hughes", &first).contains("First career goal"));

        let numbered = Milestone {
            credit: MilestoneCredit::Point,
            total: 500,
        };
        assert!(milestone_text("Nico Hischier", &numbered).contains("point No. 500"));
    }
}
