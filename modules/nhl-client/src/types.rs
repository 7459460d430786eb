//! Wire shapes for the league's gamecenter endpoints.
//!
//! The feed is eventually consistent: nested objects appear and fill in over
//! successive polls. Every field that has ever been observed missing is an
//! `Option`; decoding only fails when the envelope itself is malformed.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use goalhorn_common::types::{
    EventDetails, EventKind, GameSnapshot, GameState, PeriodDescriptor, PeriodType, PlayEvent,
    RosterPlayer, ScheduledGame, StandingLine, TeamState,
};

// ---------------------------------------------------------------------------
// Shared fragments
// ---------------------------------------------------------------------------

/// The feed wraps display strings as `{ "default": "...", "fr": "..." }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Localized {
    #[serde(default)]
    pub default: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePeriodDescriptor {
    pub number: u32,
    pub period_type: Option<String>,
}

impl WirePeriodDescriptor {
    pub fn into_common(self) -> PeriodDescriptor {
        let period_type = match self.period_type.as_deref() {
            Some("OT") => PeriodType::Overtime,
            Some("SO") => PeriodType::Shootout,
            _ => PeriodType::Regulation,
        };
        PeriodDescriptor {
            number: self.number,
            period_type,
        }
    }
}

pub fn parse_game_state(code: &str) -> GameState {
    match code {
        "FUT" => GameState::Future,
        "PRE" => GameState::Pregame,
        "LIVE" => GameState::Live,
        "CRIT" => GameState::Critical,
        "FINAL" => GameState::Final,
        "OFF" => GameState::Off,
        other => {
            tracing::warn!(code = other, "Unknown game state, treating as live");
            GameState::Live
        }
    }
}

pub fn parse_event_kind(desc_key: &str) -> EventKind {
    match desc_key {
        "goal" => EventKind::Goal,
        "penalty" => EventKind::Penalty,
        "shot-on-goal" => EventKind::ShotOnGoal,
        "period-start" => EventKind::PeriodStart,
        "period-end" => EventKind::PeriodEnd,
        "game-end" => EventKind::GameEnd,
        "stoppage" => EventKind::Stoppage,
        "faceoff" => EventKind::Faceoff,
        "hit" => EventKind::Hit,
        "blocked-shot" => EventKind::BlockedShot,
        "missed-shot" => EventKind::MissedShot,
        "giveaway" => EventKind::Giveaway,
        "takeaway" => EventKind::Takeaway,
        "delayed-penalty" => EventKind::DelayedPenalty,
        _ => EventKind::Other,
    }
}

fn parse_mmss(raw: &str) -> Option<u32> {
    let (m, s) = raw.split_once(':')?;
    Some(m.parse::<u32>().ok()? * 60 + s.parse::<u32>().ok()?)
}

// ---------------------------------------------------------------------------
// Play-by-play
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayByPlayResponse {
    pub id: i64,
    pub game_state: String,
    pub away_team: WireTeam,
    pub home_team: WireTeam,
    pub period_descriptor: Option<WirePeriodDescriptor>,
    #[serde(default)]
    pub plays: Vec<WirePlay>,
    #[serde(default)]
    pub roster_spots: Vec<WireRosterSpot>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTeam {
    pub id: i64,
    pub abbrev: String,
    pub common_name: Option<Localized>,
    pub score: Option<u32>,
    pub sog: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePlay {
    pub event_id: i64,
    pub type_desc_key: String,
    pub period_descriptor: Option<WirePeriodDescriptor>,
    pub time_in_period: Option<String>,
    pub details: Option<WirePlayDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePlayDetails {
    pub event_owner_team_id: Option<i64>,
    pub scoring_player_id: Option<i64>,
    pub assist1_player_id: Option<i64>,
    pub assist2_player_id: Option<i64>,
    pub away_score: Option<u32>,
    pub home_score: Option<u32>,
    pub shooting_player_id: Option<i64>,
    pub goalie_in_net_id: Option<i64>,
    pub committed_by_player_id: Option<i64>,
    pub drawn_by_player_id: Option<i64>,
    pub desc_key: Option<String>,
    pub type_code: Option<String>,
    pub duration: Option<u32>,
    pub reason: Option<String>,
    pub secondary_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRosterSpot {
    pub team_id: i64,
    pub player_id: i64,
    pub first_name: Option<Localized>,
    pub last_name: Option<Localized>,
    pub sweater_number: Option<u32>,
    pub position_code: Option<String>,
}

impl PlayByPlayResponse {
    pub fn into_snapshot(self) -> GameSnapshot {
        let current_period = self.period_descriptor.map(|p| p.into_common());
        let fallback = current_period.unwrap_or(PeriodDescriptor {
            number: 1,
            period_type: PeriodType::Regulation,
        });

        let plays = self
            .plays
            .into_iter()
            .map(|p| p.into_common(fallback))
            .collect();

        let roster = self
            .roster_spots
            .into_iter()
            .map(|r| RosterPlayer {
                player_id: r.player_id,
                team_id: r.team_id,
                first_name: r.first_name.map(|n| n.default).unwrap_or_default(),
                last_name: r.last_name.map(|n| n.default).unwrap_or_default(),
                sweater_number: r.sweater_number,
                position: r.position_code,
            })
            .collect();

        GameSnapshot {
            game_id: self.id,
            state: parse_game_state(&self.game_state),
            away: self.away_team.into_common(),
            home: self.home_team.into_common(),
            period: current_period,
            plays,
            roster,
        }
    }
}

impl WireTeam {
    fn into_common(self) -> TeamState {
        TeamState {
            id: self.id,
            name: self
                .common_name
                .map(|n| n.default)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| self.abbrev.clone()),
            abbrev: self.abbrev,
            score: self.score.unwrap_or(0),
            sog: self.sog.unwrap_or(0),
        }
    }
}

impl WirePlay {
    fn into_common(self, fallback_period: PeriodDescriptor) -> PlayEvent {
        let d = self.details.unwrap_or_default();
        PlayEvent {
            event_id: self.event_id,
            kind: parse_event_kind(&self.type_desc_key),
            period: self
                .period_descriptor
                .map(|p| p.into_common())
                .unwrap_or(fallback_period),
            time_in_period: self.time_in_period.unwrap_or_else(|| "00:00".to_string()),
            details: EventDetails {
                event_owner_team_id: d.event_owner_team_id,
                scoring_player_id: d.scoring_player_id,
                assist1_player_id: d.assist1_player_id,
                assist2_player_id: d.assist2_player_id,
                away_score: d.away_score,
                home_score: d.home_score,
                shooting_player_id: d.shooting_player_id,
                goalie_in_net_id: d.goalie_in_net_id,
                committed_by_player_id: d.committed_by_player_id,
                drawn_by_player_id: d.drawn_by_player_id,
                penalty_desc_key: d.desc_key,
                penalty_type_code: d.type_code,
                penalty_duration: d.duration,
                reason: d.reason,
                secondary_reason: d.secondary_reason,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Boxscore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxscoreResponse {
    pub player_by_game_stats: Option<WirePlayerByGameStats>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePlayerByGameStats {
    pub away_team: WireTeamPlayers,
    pub home_team: WireTeamPlayers,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTeamPlayers {
    #[serde(default)]
    pub forwards: Vec<WireSkaterStats>,
    #[serde(default)]
    pub defense: Vec<WireSkaterStats>,
    #[serde(default)]
    pub goalies: Vec<WireGoalieStats>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSkaterStats {
    pub player_id: i64,
    pub name: Option<Localized>,
    pub toi: Option<String>,
    pub sog: Option<u32>,
    pub hits: Option<u32>,
    pub blocked_shots: Option<u32>,
    pub pim: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGoalieStats {
    pub player_id: i64,
    pub name: Option<Localized>,
    pub toi: Option<String>,
    pub saves: Option<u32>,
    pub goals_against: Option<u32>,
}

impl WireTeamPlayers {
    pub fn skater_lines(&self) -> Vec<goalhorn_common::types::SkaterLine> {
        self.forwards
            .iter()
            .chain(self.defense.iter())
            .map(|s| goalhorn_common::types::SkaterLine {
                player_id: s.player_id,
                name: s
                    .name
                    .as_ref()
                    .map(|n| n.default.clone())
                    .unwrap_or_default(),
                toi_seconds: s.toi.as_deref().and_then(parse_mmss).unwrap_or(0),
                sog: s.sog.unwrap_or(0),
                hits: s.hits.unwrap_or(0),
            })
            .collect()
    }

    pub fn goalie_lines(&self) -> Vec<goalhorn_common::types::GoalieLine> {
        self.goalies
            .iter()
            .map(|g| goalhorn_common::types::GoalieLine {
                player_id: g.player_id,
                name: g
                    .name
                    .as_ref()
                    .map(|n| n.default.clone())
                    .unwrap_or_default(),
                toi_seconds: g.toi.as_deref().and_then(parse_mmss).unwrap_or(0),
                saves: g.saves.unwrap_or(0),
                goals_against: g.goals_against.unwrap_or(0),
            })
            .collect()
    }

    pub fn totals(&self) -> goalhorn_common::types::TeamGameTotals {
        let skaters = self.forwards.iter().chain(self.defense.iter());
        let mut totals = goalhorn_common::types::TeamGameTotals::default();
        for s in skaters {
            totals.sog += s.sog.unwrap_or(0);
            totals.hits += s.hits.unwrap_or(0);
            totals.blocks += s.blocked_shots.unwrap_or(0);
            totals.pim += s.pim.unwrap_or(0);
        }
        totals
    }
}

// ---------------------------------------------------------------------------
// Landing (goal highlights)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandingResponse {
    pub summary: Option<WireLandingSummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLandingSummary {
    #[serde(default)]
    pub scoring: Vec<WireScoringPeriod>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireScoringPeriod {
    pub period_descriptor: Option<WirePeriodDescriptor>,
    #[serde(default)]
    pub goals: Vec<WireLandingGoal>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLandingGoal {
    pub time_in_period: Option<String>,
    pub highlight_clip_sharing_url: Option<String>,
}

/// A goal's highlight clip, keyed by (period, elapsed time) since the landing
/// feed doesn't carry play-by-play event ids.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalHighlight {
    pub period_number: u32,
    pub time_in_period: String,
    pub clip_url: Option<String>,
}

impl LandingResponse {
    pub fn goal_highlights(self) -> Vec<GoalHighlight> {
        let Some(summary) = self.summary else {
            return Vec::new();
        };
        summary
            .scoring
            .into_iter()
            .flat_map(|period| {
                let number = period
                    .period_descriptor
                    .map(|p| p.number)
                    .unwrap_or(0);
                period.goals.into_iter().map(move |g| GoalHighlight {
                    period_number: number,
                    time_in_period: g.time_in_period.unwrap_or_default(),
                    clip_url: g.highlight_clip_sharing_url,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Player landing (career totals)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLandingResponse {
    pub player_id: i64,
    pub first_name: Option<Localized>,
    pub last_name: Option<Localized>,
    pub career_totals: Option<WireCareerTotals>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCareerTotals {
    pub regular_season: Option<WireSeasonTotals>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSeasonTotals {
    pub games_played: Option<u32>,
    pub goals: Option<u32>,
    pub assists: Option<u32>,
    pub points: Option<u32>,
    pub wins: Option<u32>,
    pub shutouts: Option<u32>,
}

/// Resolved player detail: display name plus cumulative career totals.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerDetail {
    pub player_id: i64,
    pub name: String,
    pub career: goalhorn_common::types::CareerTotals,
}

impl PlayerLandingResponse {
    pub fn into_detail(self) -> PlayerDetail {
        let totals = self
            .career_totals
            .and_then(|c| c.regular_season)
            .unwrap_or_default();
        let first = self.first_name.map(|n| n.default).unwrap_or_default();
        let last = self.last_name.map(|n| n.default).unwrap_or_default();
        PlayerDetail {
            player_id: self.player_id,
            name: format!("{first} {last}").trim().to_string(),
            career: goalhorn_common::types::CareerTotals {
                games_played: totals.games_played.unwrap_or(0),
                goals: totals.goals.unwrap_or(0),
                assists: totals.assists.unwrap_or(0),
                points: totals.points.unwrap_or(0),
                wins: totals.wins.unwrap_or(0),
                shutouts: totals.shutouts.unwrap_or(0),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Club schedule + standings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubScheduleResponse {
    #[serde(default)]
    pub games: Vec<WireScheduledGame>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireScheduledGame {
    pub id: i64,
    #[serde(rename = "startTimeUTC")]
    pub start_time_utc: DateTime<Utc>,
    pub game_state: Option<String>,
    pub away_team: WireScheduleTeam,
    pub home_team: WireScheduleTeam,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireScheduleTeam {
    pub abbrev: String,
}

impl WireScheduledGame {
    pub fn into_common(self) -> ScheduledGame {
        ScheduledGame {
            game_id: self.id,
            start_time_utc: self.start_time_utc,
            away_abbrev: self.away_team.abbrev,
            home_abbrev: self.home_team.abbrev,
            state: self
                .game_state
                .as_deref()
                .map(parse_game_state)
                .unwrap_or(GameState::Future),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsResponse {
    #[serde(default)]
    pub standings: Vec<WireStandingRow>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireStandingRow {
    pub team_abbrev: Option<Localized>,
    pub games_played: Option<u32>,
    pub wins: Option<u32>,
    pub points: Option<u32>,
}

impl WireStandingRow {
    pub fn into_common(self) -> StandingLine {
        StandingLine {
            team_abbrev: self.team_abbrev.map(|a| a.default).unwrap_or_default(),
            games_played: self.games_played.unwrap_or(0),
            wins: self.wins.unwrap_or(0),
            points: self.points.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_by_play_decodes_with_sparse_details() {
        let raw = r#"{
            "id": 2024020500,
            "gameState": "LIVE",
            "awayTeam": {"id": 1, "abbrev": "NJD", "commonName": {"default": "Devils"}, "score": 0, "sog": 9},
            "homeTeam": {"id": 6, "abbrev": "BOS", "commonName": {"default": "Bruins"}, "score": 1, "sog": 11},
            "periodDescriptor": {"number": 2, "periodType": "REG"},
            "plays": [
                {"eventId": 240, "typeDescKey": "goal", "periodDescriptor": {"number": 2, "periodType": "REG"},
                 "timeInPeriod": "04:18",
                 "details": {"scoringPlayerId": 8471685, "assist1PlayerId": 8471215, "eventOwnerTeamId": 6,
                             "awayScore": 0, "homeScore": 1, "goalieInNetId": 8475683}},
                {"eventId": 241, "typeDescKey": "stoppage"},
                {"eventId": 242, "typeDescKey": "some-new-event-type", "details": {}}
            ],
            "rosterSpots": [
                {"teamId": 6, "playerId": 8471685, "firstName": {"default": "David"},
                 "lastName": {"default": "Krejci"}, "sweaterNumber": 46, "positionCode": "C"}
            ]
        }"#;

        let resp: PlayByPlayResponse = serde_json::from_str(raw).unwrap();
        let snap = resp.into_snapshot();

        assert_eq!(snap.game_id, 2024020500);
        assert_eq!(snap.state, GameState::Live);
        assert_eq!(snap.plays.len(), 3);

        let goal = snap.find_play(240).unwrap();
        assert_eq!(goal.kind, EventKind::Goal);
        assert_eq!(goal.details.scoring_player_id, Some(8471685));
        assert_eq!(goal.details.goalie_in_net_id, Some(8475683));

        // Details-free stoppage inherits the current period descriptor.
        let stoppage = snap.find_play(241).unwrap();
        assert_eq!(stoppage.kind, EventKind::Stoppage);
        assert_eq!(stoppage.period.number, 2);
        assert_eq!(stoppage.details, EventDetails::default());

        // Unknown type tags decode as Other instead of failing.
        assert_eq!(snap.find_play(242).unwrap().kind, EventKind::Other);

        assert_eq!(snap.player_name(8471685).as_deref(), Some("David Krejci"));
    }

    #[test]
    fn game_state_codes() {
        assert_eq!(parse_game_state("FUT"), GameState::Future);
        assert_eq!(parse_game_state("LIVE"), GameState::Live);
        assert_eq!(parse_game_state("CRIT"), GameState::Critical);
        assert_eq!(parse_game_state("OFF"), GameState::Off);
        assert!(parse_game_state("FINAL").is_terminal());
        // Unknown codes degrade to a non-terminal state.
        assert!(!parse_game_state("???").is_terminal());
    }

    #[test]
    fn player_landing_tolerates_missing_career_totals() {
        let raw = r#"{
            "playerId": 8484900,
            "firstName": {"default": "Jacob"},
            "lastName": {"default": "Fowler"}
        }"#;
        let detail: PlayerDetail = serde_json::from_str::<PlayerLandingResponse>(raw)
            .unwrap()
            .into_detail();
        assert_eq!(detail.name, "Jacob Fowler");
        assert_eq!(detail.career.goals, 0);
        assert_eq!(detail.career.points, 0);
    }

    #[test]
    fn landing_highlights_keyed_by_period_and_time() {
        let raw = r#"{
            "summary": {"scoring": [
                {"periodDescriptor": {"number": 2, "periodType": "REG"},
                 "goals": [{"timeInPeriod": "04:18", "highlightClipSharingUrl": "https://nhl.com/video/x"},
                           {"timeInPeriod": "11:02"}]}
            ]}
        }"#;
        let highlights = serde_json::from_str::<LandingResponse>(raw)
            .unwrap()
            .goal_highlights();
        assert_eq!(highlights.len(), 2);
        assert_eq!(highlights[0].period_number, 2);
        assert_eq!(
            highlights[0].clip_url.as_deref(),
            Some("https://nhl.com/video/x")
        );
        assert_eq!(highlights[1].clip_url, None);
    }

    #[test]
    fn boxscore_totals_sum_skaters() {
        let team = WireTeamPlayers {
            forwards: vec![WireSkaterStats {
                player_id: 1,
                name: Some(Localized {
                    default: "A B".into(),
                }),
                toi: Some("12:34".into()),
                sog: Some(3),
                hits: Some(2),
                blocked_shots: Some(1),
                pim: Some(2),
            }],
            defense: vec![WireSkaterStats {
                player_id: 2,
                name: None,
                toi: Some("21:07".into()),
                sog: Some(1),
                hits: Some(4),
                blocked_shots: Some(3),
                pim: None,
            }],
            goalies: vec![],
        };
        let totals = team.totals();
        assert_eq!(totals.sog, 4);
        assert_eq!(totals.hits, 6);
        assert_eq!(totals.blocks, 4);
        assert_eq!(totals.pim, 2);

        let lines = team.skater_lines();
        assert_eq!(lines[0].toi_seconds, 754);
        assert_eq!(lines[1].name, "");
    }
}
