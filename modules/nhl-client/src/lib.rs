pub mod error;
pub mod types;

pub use error::{NhlError, Result};
pub use types::{GoalHighlight, PlayerDetail};

use std::time::Duration;

use goalhorn_common::types::{GameSnapshot, GameStats, ScheduledGame, StandingLine};

use types::{
    BoxscoreResponse, ClubScheduleResponse, LandingResponse, PlayByPlayResponse,
    PlayerLandingResponse, StandingsResponse,
};

const BASE_URL: &str = "https://api-web.nhle.com/v1";

/// Client for the league's public gamecenter API.
///
/// Read-only and unauthenticated. The feed is eventually consistent —
/// callers are expected to re-poll rather than trust any single response
/// to be complete.
pub struct NhlClient {
    client: reqwest::Client,
    base_url: String,
}

impl NhlClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL.to_string())
    }

    /// Point the client at a different host (tests, proxies).
    pub fn with_base_url(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, base_url }
    }

    /// Fetch the current play-by-play snapshot for a game.
    pub async fn play_by_play(&self, game_id: i64) -> Result<GameSnapshot> {
        let url = format!("{}/gamecenter/{}/play-by-play", self.base_url, game_id);
        let resp: PlayByPlayResponse = self.get_json(&url).await?;
        let snapshot = resp.into_snapshot();
        tracing::debug!(
            game_id,
            plays = snapshot.plays.len(),
            state = ?snapshot.state,
            "Fetched play-by-play"
        );
        Ok(snapshot)
    }

    /// Fetch per-player boxscore stats (TOI, shots, hits) for a game.
    pub async fn boxscore(&self, game_id: i64) -> Result<GameStats> {
        let url = format!("{}/gamecenter/{}/boxscore", self.base_url, game_id);
        let resp: BoxscoreResponse = self.get_json(&url).await?;

        let Some(stats) = resp.player_by_game_stats else {
            // Early in a game the boxscore can be empty.
            return Ok(GameStats::default());
        };

        Ok(GameStats {
            away_skaters: stats.away_team.skater_lines(),
            home_skaters: stats.home_team.skater_lines(),
            away_goalies: stats.away_team.goalie_lines(),
            home_goalies: stats.home_team.goalie_lines(),
            away_totals: stats.away_team.totals(),
            home_totals: stats.home_team.totals(),
        })
    }

    /// Fetch the landing summary's goal highlight clips. Clips trail the
    /// play-by-play by minutes; absent entries mean "not ready yet".
    pub async fn goal_highlights(&self, game_id: i64) -> Result<Vec<GoalHighlight>> {
        let url = format!("{}/gamecenter/{}/landing", self.base_url, game_id);
        let resp: LandingResponse = self.get_json(&url).await?;
        Ok(resp.goal_highlights())
    }

    /// Fetch a player's display name and career totals.
    pub async fn player_landing(&self, player_id: i64) -> Result<PlayerDetail> {
        let url = format!("{}/player/{}/landing", self.base_url, player_id);
        let resp: PlayerLandingResponse = self.get_json(&url).await?;
        Ok(resp.into_detail())
    }

    /// Fetch this week's schedule for a club.
    pub async fn club_schedule_week(&self, team_abbrev: &str) -> Result<Vec<ScheduledGame>> {
        let url = format!("{}/club-schedule/{}/week/now", self.base_url, team_abbrev);
        let resp: ClubScheduleResponse = self.get_json(&url).await?;
        Ok(resp.games.into_iter().map(|g| g.into_common()).collect())
    }

    /// Fetch current league standings.
    pub async fn standings_now(&self) -> Result<Vec<StandingLine>> {
        let url = format!("{}/standings/now", self.base_url);
        let resp: StandingsResponse = self.get_json(&url).await?;
        Ok(resp
            .standings
            .into_iter()
            .map(|row| row.into_common())
            .collect())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NhlError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }
}

impl Default for NhlClient {
    fn default() -> Self {
        Self::new()
    }
}
