// Test doubles for the engine.
//
// Two mocks matching the two I/O trait boundaries:
// - MockFeed (FeedSource) — scripted snapshot sequence plus keyed fixtures
// - RecordingBackend (PostBackend) — captures every published post
//
// Plus builders for snapshots and play events. Together with MemoryStore
// these make every scenario test run without network or Redis.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use bluesky_client::{ExternalEmbed, PostRef, ReplyRef};
use goalhorn_common::types::{
    EventDetails, EventKind, GameSnapshot, GameState, GameStats, PeriodDescriptor, PeriodType,
    PlayEvent, RosterPlayer, ScheduledGame, StandingLine, TeamState,
};
use goalhorn_common::Config;
use goalhorn_store::MemoryStore;
use nhl_client::{GoalHighlight, PlayerDetail};

use crate::deps::BotDeps;
use crate::publisher::PostPublisher;
use crate::traits::{FeedSource, PostBackend};

/// Game id used throughout the test fixtures.
pub const TEST_GAME_ID: i64 = 2024020500;

/// The configured team in tests: the home side (Bruins, id 6).
pub const OUR_TEAM_ID: i64 = 6;

// ---------------------------------------------------------------------------
// MockFeed
// ---------------------------------------------------------------------------

/// Scripted feed. Snapshots are served as a sequence — each fetch pops the
/// next one, and the last keeps repeating. Everything else is keyed.
pub struct MockFeed {
    snapshots: Mutex<VecDeque<GameSnapshot>>,
    boxscores: HashMap<i64, GameStats>,
    players: HashMap<i64, PlayerDetail>,
    highlights: HashMap<i64, Vec<GoalHighlight>>,
    schedule: Vec<ScheduledGame>,
    standings: Vec<StandingLine>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self {
            snapshots: Mutex::new(VecDeque::new()),
            boxscores: HashMap::new(),
            players: HashMap::new(),
            highlights: HashMap::new(),
            schedule: Vec::new(),
            standings: Vec::new(),
        }
    }

    pub fn with_snapshots(self, snapshots: Vec<GameSnapshot>) -> Self {
        *self.snapshots.lock().unwrap() = snapshots.into();
        self
    }

    pub fn on_boxscore(mut self, game_id: i64, stats: GameStats) -> Self {
        self.boxscores.insert(game_id, stats);
        self
    }

    pub fn on_player(mut self, detail: PlayerDetail) -> Self {
        self.players.insert(detail.player_id, detail);
        self
    }

    pub fn on_highlights(mut self, game_id: i64, highlights: Vec<GoalHighlight>) -> Self {
        self.highlights.insert(game_id, highlights);
        self
    }

    pub fn with_schedule(mut self, games: Vec<ScheduledGame>) -> Self {
        self.schedule = games;
        self
    }

    pub fn with_standings(mut self, standings: Vec<StandingLine>) -> Self {
        self.standings = standings;
        self
    }
}

impl Default for MockFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedSource for MockFeed {
    async fn snapshot(&self, game_id: i64) -> Result<GameSnapshot> {
        let mut snapshots = self.snapshots.lock().unwrap();
        match snapshots.len() {
            0 => Err(anyhow!("MockFeed: no snapshot scripted for game {game_id}")),
            1 => Ok(snapshots
                .front()
                .cloned()
                .expect("length checked")),
            _ => Ok(snapshots.pop_front().expect("length checked")),
        }
    }

    async fn boxscore(&self, game_id: i64) -> Result<GameStats> {
        self.boxscores
            .get(&game_id)
            .cloned()
            .ok_or_else(|| anyhow!("MockFeed: no boxscore for game {game_id}"))
    }

    async fn goal_highlights(&self, game_id: i64) -> Result<Vec<GoalHighlight>> {
        Ok(self.highlights.get(&game_id).cloned().unwrap_or_default())
    }

    async fn player(&self, player_id: i64) -> Result<PlayerDetail> {
        self.players
            .get(&player_id)
            .cloned()
            .ok_or_else(|| anyhow!("MockFeed: no player {player_id} registered"))
    }

    async fn schedule_week(&self, _team_abbrev: &str) -> Result<Vec<ScheduledGame>> {
        Ok(self.schedule.clone())
    }

    async fn standings(&self) -> Result<Vec<StandingLine>> {
        Ok(self.standings.clone())
    }
}

// ---------------------------------------------------------------------------
// RecordingBackend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PublishedPost {
    pub text: String,
    pub reply: Option<ReplyRef>,
    pub embed: Option<ExternalEmbed>,
    pub returned: PostRef,
}

/// Captures posts instead of publishing, handing back synthetic refs.
pub struct RecordingBackend {
    posts: Mutex<Vec<PublishedPost>>,
    counter: AtomicU64,
    fail_times: Mutex<u32>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
            fail_times: Mutex::new(0),
        }
    }

    /// Make the next `times` publishes fail, for retry tests.
    pub fn fail_times(&self, times: u32) {
        *self.fail_times.lock().unwrap() = times;
    }

    pub fn posts(&self) -> Vec<PublishedPost> {
        self.posts.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.posts().into_iter().map(|p| p.text).collect()
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostBackend for RecordingBackend {
    async fn create_post(
        &self,
        text: &str,
        reply: Option<&ReplyRef>,
        embed: Option<&ExternalEmbed>,
    ) -> Result<PostRef> {
        {
            let mut fails = self.fail_times.lock().unwrap();
            if *fails > 0 {
                *fails -= 1;
                return Err(anyhow!("RecordingBackend: scripted publish failure"));
            }
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let returned = PostRef {
            uri: format!("at://did:plc:test/app.bsky.feed.post/{n}"),
            cid: format!("cid-{n}"),
        };
        self.posts.lock().unwrap().push(PublishedPost {
            text: text.to_string(),
            reply: reply.cloned(),
            embed: embed.cloned(),
            returned: returned.clone(),
        });
        Ok(returned)
    }
}

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

pub fn test_config() -> Config {
    Config {
        team_id: OUR_TEAM_ID,
        team_abbrev: "BOS".to_string(),
        team_name: "Bruins".to_string(),
        utc_offset: "-05:00".parse().expect("valid offset"),
        bluesky_identifier: "bot.test".to_string(),
        bluesky_password: "hunter2".to_string(),
        hashtags: String::new(),
        redis_url: String::new(),
        upcoming_goal_window: 3,
        upcoming_point_window: 6,
    }
}

/// NJD @ BOS, live, second period, with both goalies and a few skaters
/// rostered.
pub fn base_snapshot() -> GameSnapshot {
    let roster = vec![
        roster_player(8471685, 6, "David", "Krejci"),
        roster_player(8476459, 6, "Pavel", "Zacha"),
        roster_player(8471215, 6, "Brad", "Marchand"),
        roster_player(8475683, 6, "Jeremy", "Swayman"),
        roster_player(8484900, 6, "Brandon", "Bussi"),
        roster_player(8480002, 1, "Nico", "Hischier"),
        roster_player(8481559, 1, "Jack", "Hughes"),
        roster_player(8470000, 1, "Jake", "Allen"),
    ];
    GameSnapshot {
        game_id: TEST_GAME_ID,
        state: GameState::Live,
        away: TeamState {
            id: 1,
            abbrev: "NJD".to_string(),
            name: "Devils".to_string(),
            score: 0,
            sog: 9,
        },
        home: TeamState {
            id: 6,
            abbrev: "BOS".to_string(),
            name: "Bruins".to_string(),
            score: 1,
            sog: 11,
        },
        period: Some(PeriodDescriptor {
            number: 2,
            period_type: PeriodType::Regulation,
        }),
        plays: vec![],
        roster,
    }
}

fn roster_player(player_id: i64, team_id: i64, first: &str, last: &str) -> RosterPlayer {
    RosterPlayer {
        player_id,
        team_id,
        first_name: first.to_string(),
        last_name: last.to_string(),
        sweater_number: None,
        position: None,
    }
}

pub fn snapshot_with_plays(plays: Vec<PlayEvent>) -> GameSnapshot {
    let mut snapshot = base_snapshot();
    snapshot.plays = plays;
    snapshot
}

pub fn play(event_id: i64, kind: EventKind) -> PlayEvent {
    PlayEvent {
        event_id,
        kind,
        period: PeriodDescriptor {
            number: 2,
            period_type: PeriodType::Regulation,
        },
        time_in_period: "04:18".to_string(),
        details: EventDetails::default(),
    }
}

/// A home-team (Bruins) goal, 0-1, scored at 04:18 of the second.
pub fn goal_play(event_id: i64, scorer: Option<i64>) -> PlayEvent {
    let mut event = play(event_id, EventKind::Goal);
    event.details = EventDetails {
        event_owner_team_id: Some(6),
        scoring_player_id: scorer,
        away_score: Some(0),
        home_score: Some(1),
        goalie_in_net_id: Some(8470000),
        ..Default::default()
    };
    event
}

/// A shot by `shooting_team`, naming the defending side's goalie.
pub fn shot_play(event_id: i64, shooting_team: i64, goalie_in_net: i64) -> PlayEvent {
    let mut event = play(event_id, EventKind::ShotOnGoal);
    event.details = EventDetails {
        event_owner_team_id: Some(shooting_team),
        goalie_in_net_id: Some(goalie_in_net),
        ..Default::default()
    };
    event
}

pub fn player_detail(player_id: i64, name: &str, career: goalhorn_common::types::CareerTotals) -> PlayerDetail {
    PlayerDetail {
        player_id,
        name: name.to_string(),
        career,
    }
}

/// Wire a full dependency bundle from a scripted feed. Returns the deps plus
/// handles to the recording backend and the shared store for assertions.
pub fn make_deps(feed: MockFeed) -> (BotDeps, Arc<RecordingBackend>, Arc<MemoryStore>) {
    let backend = Arc::new(RecordingBackend::new());
    let store = Arc::new(MemoryStore::new());
    let config = test_config();
    let publisher = PostPublisher::new(
        backend.clone(),
        store.clone(),
        config.hashtags.clone(),
    );
    let deps = BotDeps {
        config,
        feed: Arc::new(feed),
        store: store.clone(),
        publisher,
    };
    (deps, backend, store)
}
