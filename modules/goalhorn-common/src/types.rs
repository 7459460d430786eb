use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Game lifecycle ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Future,
    Pregame,
    Live,
    /// Final minutes of a close game — still live for our purposes.
    Critical,
    Final,
    /// Final and fully settled upstream.
    Off,
}

impl GameState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameState::Final | GameState::Off)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    Regulation,
    Overtime,
    Shootout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDescriptor {
    pub number: u32,
    pub period_type: PeriodType,
}

// --- Play events ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Goal,
    Penalty,
    ShotOnGoal,
    PeriodStart,
    PeriodEnd,
    GameEnd,
    Stoppage,
    Faceoff,
    Hit,
    BlockedShot,
    MissedShot,
    Giveaway,
    Takeaway,
    DelayedPenalty,
    /// Anything the feed emits that we don't act on. Kept so decoding never
    /// fails on new upstream event types.
    Other,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::Goal => "goal",
            EventKind::Penalty => "penalty",
            EventKind::ShotOnGoal => "shot-on-goal",
            EventKind::PeriodStart => "period-start",
            EventKind::PeriodEnd => "period-end",
            EventKind::GameEnd => "game-end",
            EventKind::Stoppage => "stoppage",
            EventKind::Faceoff => "faceoff",
            EventKind::Hit => "hit",
            EventKind::BlockedShot => "blocked-shot",
            EventKind::MissedShot => "missed-shot",
            EventKind::Giveaway => "giveaway",
            EventKind::Takeaway => "takeaway",
            EventKind::DelayedPenalty => "delayed-penalty",
            EventKind::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// Type-specific payload. The feed fills these in lazily — every field is
/// optional and may appear on a later poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    pub event_owner_team_id: Option<i64>,

    // Goals
    pub scoring_player_id: Option<i64>,
    pub assist1_player_id: Option<i64>,
    pub assist2_player_id: Option<i64>,
    pub away_score: Option<u32>,
    pub home_score: Option<u32>,

    // Shots
    pub shooting_player_id: Option<i64>,
    pub goalie_in_net_id: Option<i64>,

    // Penalties
    pub committed_by_player_id: Option<i64>,
    pub drawn_by_player_id: Option<i64>,
    pub penalty_desc_key: Option<String>,
    pub penalty_type_code: Option<String>,
    pub penalty_duration: Option<u32>,

    // Stoppages — carries challenge/review reason codes.
    pub reason: Option<String>,
    pub secondary_reason: Option<String>,
}

/// A discrete occurrence within a game. Event ids are game-scoped, never
/// reused, but the payload can be revised (or the whole event retracted) by
/// a later snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub event_id: i64,
    pub kind: EventKind,
    pub period: PeriodDescriptor,
    /// Elapsed time within the period, "MM:SS".
    pub time_in_period: String,
    pub details: EventDetails,
}

impl PlayEvent {
    /// Scoring attribution as currently reported, if a scorer is present.
    pub fn attribution(&self) -> Option<GoalAttribution> {
        self.details.scoring_player_id.map(|scorer| GoalAttribution {
            scorer,
            assist1: self.details.assist1_player_id,
            assist2: self.details.assist2_player_id,
        })
    }

    /// Elapsed seconds within the period, if the timestamp parses.
    pub fn elapsed_seconds(&self) -> Option<u32> {
        let (m, s) = self.time_in_period.split_once(':')?;
        let m: u32 = m.parse().ok()?;
        let s: u32 = s.parse().ok()?;
        Some(m * 60 + s)
    }
}

/// Who gets credit for a goal. Captured at announcement time and compared
/// against the feed later to detect scoring changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalAttribution {
    pub scorer: i64,
    pub assist1: Option<i64>,
    pub assist2: Option<i64>,
}

// --- Snapshot ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamState {
    pub id: i64,
    pub abbrev: String,
    pub name: String,
    pub score: u32,
    pub sog: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub player_id: i64,
    pub team_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub sweater_number: Option<u32>,
    pub position: Option<String>,
}

/// One fetched, immutable copy of a game's play-by-play and score state.
/// Created fresh per poll, discarded after routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub game_id: i64,
    pub state: GameState,
    pub away: TeamState,
    pub home: TeamState,
    pub period: Option<PeriodDescriptor>,
    pub plays: Vec<PlayEvent>,
    pub roster: Vec<RosterPlayer>,
}

impl GameSnapshot {
    /// True once the feed reports a terminal state or a game-end play.
    pub fn game_over(&self) -> bool {
        self.state.is_terminal() || self.plays.iter().any(|p| p.kind == EventKind::GameEnd)
    }

    pub fn find_play(&self, event_id: i64) -> Option<&PlayEvent> {
        self.plays.iter().find(|p| p.event_id == event_id)
    }

    /// "First Last" for a rostered player, if present in this snapshot.
    pub fn player_name(&self, player_id: i64) -> Option<String> {
        self.roster
            .iter()
            .find(|p| p.player_id == player_id)
            .map(|p| format!("{} {}", p.first_name, p.last_name))
    }

    pub fn team(&self, team_id: i64) -> Option<&TeamState> {
        if self.away.id == team_id {
            Some(&self.away)
        } else if self.home.id == team_id {
            Some(&self.home)
        } else {
            None
        }
    }

    /// The team defending against `team_id`.
    pub fn opponent(&self, team_id: i64) -> Option<&TeamState> {
        if self.away.id == team_id {
            Some(&self.home)
        } else if self.home.id == team_id {
            Some(&self.away)
        } else {
            None
        }
    }

    /// "AWY 0 - HOM 1"
    pub fn score_line(&self) -> String {
        format!(
            "{} {} - {} {}",
            self.away.abbrev, self.away.score, self.home.abbrev, self.home.score
        )
    }
}

// --- Career / boxscore / schedule ---

/// Cumulative regular-season career totals for a player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareerTotals {
    pub games_played: u32,
    pub goals: u32,
    pub assists: u32,
    pub points: u32,
    pub wins: u32,
    pub shutouts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneCredit {
    Goal,
    Assist,
    Point,
    Win,
    Shutout,
}

impl std::fmt::Display for MilestoneCredit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MilestoneCredit::Goal => write!(f, "goal"),
            MilestoneCredit::Assist => write!(f, "assist"),
            MilestoneCredit::Point => write!(f, "point"),
            MilestoneCredit::Win => write!(f, "win"),
            MilestoneCredit::Shutout => write!(f, "shutout"),
        }
    }
}

/// One skater's line from the boxscore, for period summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkaterLine {
    pub player_id: i64,
    pub name: String,
    pub toi_seconds: u32,
    pub sog: u32,
    pub hits: u32,
}

/// One goaltender's line from the boxscore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalieLine {
    pub player_id: i64,
    pub name: String,
    pub toi_seconds: u32,
    pub saves: u32,
    pub goals_against: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamGameTotals {
    pub sog: u32,
    pub hits: u32,
    pub blocks: u32,
    pub pim: u32,
}

/// Boxscore-derived stats for both sides, fetched for period summaries and
/// the final wrap-up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    pub away_skaters: Vec<SkaterLine>,
    pub home_skaters: Vec<SkaterLine>,
    pub away_goalies: Vec<GoalieLine>,
    pub home_goalies: Vec<GoalieLine>,
    pub away_totals: TeamGameTotals,
    pub home_totals: TeamGameTotals,
}

impl GameStats {
    /// The goaltender of record for a side: the one with the most ice time.
    pub fn goalie_of_record(&self, home: bool) -> Option<&GoalieLine> {
        let goalies = if home {
            &self.home_goalies
        } else {
            &self.away_goalies
        };
        goalies.iter().max_by_key(|g| g.toi_seconds)
    }
}

/// One game from the club schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledGame {
    pub game_id: i64,
    pub start_time_utc: DateTime<Utc>,
    pub away_abbrev: String,
    pub home_abbrev: String,
    pub state: GameState,
}

/// One row of the league standings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingLine {
    pub team_abbrev: String,
    pub games_played: u32,
    pub wins: u32,
    pub points: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal_event(event_id: i64, scorer: Option<i64>) -> PlayEvent {
        PlayEvent {
            event_id,
            kind: EventKind::Goal,
            period: PeriodDescriptor {
                number: 1,
                period_type: PeriodType::Regulation,
            },
            time_in_period: "05:31".to_string(),
            details: EventDetails {
                scoring_player_id: scorer,
                ..Default::default()
            },
        }
    }

    #[test]
    fn attribution_requires_scorer() {
        assert!(goal_event(1, None).attribution().is_none());
        let attr = goal_event(1, Some(8471685)).attribution().unwrap();
        assert_eq!(attr.scorer, 8471685);
        assert_eq!(attr.assist1, None);
    }

    #[test]
    fn elapsed_seconds_parses_clock() {
        assert_eq!(goal_event(1, None).elapsed_seconds(), Some(331));
        let mut e = goal_event(1, None);
        e.time_in_period = "bogus".to_string();
        assert_eq!(e.elapsed_seconds(), None);
    }

    #[test]
    fn game_over_on_terminal_state_or_game_end_play() {
        let mut snap = GameSnapshot {
            game_id: 2024020500,
            state: GameState::Live,
            away: TeamState {
                id: 1,
                abbrev: "NJD".into(),
                name: "Devils".into(),
                score: 0,
                sog: 10,
            },
            home: TeamState {
                id: 6,
                abbrev: "BOS".into(),
                name: "Bruins".into(),
                score: 1,
                sog: 12,
            },
            period: None,
            plays: vec![],
            roster: vec![],
        };
        assert!(!snap.game_over());

        snap.state = GameState::Final;
        assert!(snap.game_over());

        snap.state = GameState::Live;
        snap.plays.push(PlayEvent {
            event_id: 900,
            kind: EventKind::GameEnd,
            period: PeriodDescriptor {
                number: 3,
                period_type: PeriodType::Regulation,
            },
            time_in_period: "20:00".to_string(),
            details: EventDetails::default(),
        });
        assert!(snap.game_over());
    }

    #[test]
    fn score_line_is_away_first() {
        let snap = GameSnapshot {
            game_id: 1,
            state: GameState::Live,
            away: TeamState {
                id: 1,
                abbrev: "NJD".into(),
                name: "Devils".into(),
                score: 0,
                sog: 0,
            },
            home: TeamState {
                id: 6,
                abbrev: "BOS".into(),
                name: "Bruins".into(),
                score: 1,
                sog: 0,
            },
            period: None,
            plays: vec![],
            roster: vec![],
        };
        assert_eq!(snap.score_line(), "NJD 0 - BOS 1");
    }
}
