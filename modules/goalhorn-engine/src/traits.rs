// Trait abstractions for engine dependencies.
//
// FeedSource — everything fetched from the league API behind one trait.
// PostBackend — the publishing platform's create-post call.
// JobRunner — how the scheduler hands a due job to the dispatch layer.
//
// These enable deterministic testing with MockFeed and RecordingBackend:
// no network, no Redis. `cargo test` in seconds.

use anyhow::Result;
use async_trait::async_trait;

use bluesky_client::{BlueskyClient, ExternalEmbed, PostRef, ReplyRef};
use goalhorn_common::types::{GameSnapshot, GameStats, ScheduledGame, StandingLine};
use nhl_client::{GoalHighlight, NhlClient, PlayerDetail};

use crate::jobs::ScheduledJob;

// ---------------------------------------------------------------------------
// FeedSource — the league API boundary
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Current play-by-play snapshot for a game.
    async fn snapshot(&self, game_id: i64) -> Result<GameSnapshot>;

    /// Per-player boxscore stats for period summaries.
    async fn boxscore(&self, game_id: i64) -> Result<GameStats>;

    /// Goal highlight clips from the landing summary.
    async fn goal_highlights(&self, game_id: i64) -> Result<Vec<GoalHighlight>>;

    /// Player display name and career totals.
    async fn player(&self, player_id: i64) -> Result<PlayerDetail>;

    /// This week's club schedule.
    async fn schedule_week(&self, team_abbrev: &str) -> Result<Vec<ScheduledGame>>;

    /// Current league standings.
    async fn standings(&self) -> Result<Vec<StandingLine>>;
}

#[async_trait]
impl FeedSource for NhlClient {
    async fn snapshot(&self, game_id: i64) -> Result<GameSnapshot> {
        Ok(self.play_by_play(game_id).await?)
    }

    async fn boxscore(&self, game_id: i64) -> Result<GameStats> {
        Ok(self.boxscore(game_id).await?)
    }

    async fn goal_highlights(&self, game_id: i64) -> Result<Vec<GoalHighlight>> {
        Ok(self.goal_highlights(game_id).await?)
    }

    async fn player(&self, player_id: i64) -> Result<PlayerDetail> {
        Ok(self.player_landing(player_id).await?)
    }

    async fn schedule_week(&self, team_abbrev: &str) -> Result<Vec<ScheduledGame>> {
        Ok(self.club_schedule_week(team_abbrev).await?)
    }

    async fn standings(&self) -> Result<Vec<StandingLine>> {
        Ok(self.standings_now().await?)
    }
}

// ---------------------------------------------------------------------------
// PostBackend — the publishing platform boundary
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PostBackend: Send + Sync {
    async fn create_post(
        &self,
        text: &str,
        reply: Option<&ReplyRef>,
        embed: Option<&ExternalEmbed>,
    ) -> Result<PostRef>;
}

#[async_trait]
impl PostBackend for BlueskyClient {
    async fn create_post(
        &self,
        text: &str,
        reply: Option<&ReplyRef>,
        embed: Option<&ExternalEmbed>,
    ) -> Result<PostRef> {
        Ok(BlueskyClient::create_post(self, text, reply, embed).await?)
    }
}

/// Dry-run backend: logs what would have been posted and fabricates refs.
pub struct NoopBackend;

#[async_trait]
impl PostBackend for NoopBackend {
    async fn create_post(
        &self,
        text: &str,
        reply: Option<&ReplyRef>,
        _embed: Option<&ExternalEmbed>,
    ) -> Result<PostRef> {
        tracing::info!(reply = reply.is_some(), text, "Dry run: would post");
        Ok(PostRef {
            uri: format!("at://noop/post/{}", uuid::Uuid::new_v4()),
            cid: "noop".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// JobRunner — scheduler → dispatch seam
// ---------------------------------------------------------------------------

#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Run one job to completion, returning follow-up jobs to enqueue.
    async fn run(&self, scheduled: &ScheduledJob) -> Result<Vec<ScheduledJob>>;
}
