//! Period transitions: the start-of-period post, the end-of-period stats
//! thread, and the final-score post.

use std::time::Duration as StdDuration;

use anyhow::Result;
use tracing::{info, warn};

use goalhorn_common::format::{mmss, period_label, period_name};
use goalhorn_common::types::{EventKind, GameStats, SkaterLine};

use crate::deps::BotDeps;
use crate::handlers::{acquire_claim, goalie, milestones, SkipReason};
use crate::jobs::{ScheduledJob, SummaryStage};
use crate::publisher::PostDraft;

/// How many skaters each leaders post lists.
const LEADER_COUNT: usize = 3;

/// Final posts can arrive via the game-end play or the terminal game state;
/// the claim makes the two paths publish once.
const FINAL_CLAIM_TTL: StdDuration = StdDuration::from_secs(48 * 60 * 60);

pub async fn handle_period_start(
    game_id: i64,
    event_id: i64,
    deps: &BotDeps,
) -> Result<Vec<ScheduledJob>> {
    let snapshot = deps.feed.snapshot(game_id).await?;

    let Some(event) = snapshot
        .find_play(event_id)
        .filter(|p| p.kind == EventKind::PeriodStart)
    else {
        info!(game_id, event_id, skip = %SkipReason::EventVanished, "Period start gone from feed");
        return Ok(vec![]);
    };

    let text = format!(
        "🏒 {} is underway! {} @ {}.\n\n{}",
        capitalize(&period_name(&event.period)),
        snapshot.away.name,
        snapshot.home.name,
        snapshot.score_line(),
    );
    let draft = PostDraft::new(text)
        .with_logical_key(format!("period-start:{game_id}:{}", event.period.number));
    deps.publisher.publish(&draft).await?;
    Ok(vec![])
}

fn stage_slug(stage: SummaryStage) -> &'static str {
    match stage {
        SummaryStage::TimeOnIce => "toi",
        SummaryStage::Shots => "sog",
        SummaryStage::TeamSplits => "splits",
    }
}

fn summary_key(game_id: i64, period_number: u32, stage: SummaryStage) -> String {
    format!(
        "period-summary:{game_id}:{period_number}:{}",
        stage_slug(stage)
    )
}

/// One stage of the stats thread. Stages are scheduled 15s apart, so each
/// parent is already mapped by the time its reply publishes.
pub async fn handle_period_summary(
    game_id: i64,
    period_number: u32,
    stage: SummaryStage,
    deps: &BotDeps,
) -> Result<Vec<ScheduledJob>> {
    let snapshot = deps.feed.snapshot(game_id).await?;
    let stats = deps.feed.boxscore(game_id).await?;

    let we_are_home = snapshot.home.id == deps.config.team_id;
    let our_skaters = if we_are_home {
        &stats.home_skaters
    } else {
        &stats.away_skaters
    };

    if our_skaters.is_empty() && stage != SummaryStage::TeamSplits {
        warn!(
            game_id,
            period_number,
            stage = stage_slug(stage),
            skip = %SkipReason::MissingData,
            "Boxscore not populated, skipping stats post"
        );
        return Ok(vec![]);
    }

    let text = match stage {
        SummaryStage::TimeOnIce => toi_text(period_number, our_skaters),
        SummaryStage::Shots => shots_text(period_number, our_skaters),
        SummaryStage::TeamSplits => splits_text(&snapshot, &stats),
    };

    let mut draft =
        PostDraft::new(text).with_logical_key(summary_key(game_id, period_number, stage));
    let parent = match stage {
        SummaryStage::TimeOnIce => None,
        SummaryStage::Shots => Some(summary_key(game_id, period_number, SummaryStage::TimeOnIce)),
        SummaryStage::TeamSplits => Some(summary_key(game_id, period_number, SummaryStage::Shots)),
    };
    if let Some(parent) = parent {
        draft = draft.with_parent(parent);
    }

    deps.publisher.publish(&draft).await?;
    Ok(vec![])
}

fn leaders_by<F: Fn(&SkaterLine) -> u32>(skaters: &[SkaterLine], key: F) -> Vec<&SkaterLine> {
    let mut sorted: Vec<&SkaterLine> = skaters.iter().collect();
    sorted.sort_by(|a, b| key(b).cmp(&key(a)));
    sorted.truncate(LEADER_COUNT);
    sorted
}

fn toi_text(period_number: u32, skaters: &[SkaterLine]) -> String {
    let mut lines = vec![format!(
        "⏱️ Ice-time leaders through {} period(s):",
        period_number
    )];
    for skater in leaders_by(skaters, |s| s.toi_seconds) {
        lines.push(format!("{} — {}", skater.name, mmss(skater.toi_seconds)));
    }
    lines.join("\n")
}

fn shots_text(period_number: u32, skaters: &[SkaterLine]) -> String {
    let mut lines = vec![format!(
        "🎯 Shot leaders through {} period(s):",
        period_number
    )];
    for skater in leaders_by(skaters, |s| s.sog) {
        lines.push(format!("{} — {} SOG", skater.name, skater.sog));
    }
    lines.join("\n")
}

fn splits_text(
    snapshot: &goalhorn_common::types::GameSnapshot,
    stats: &GameStats,
) -> String {
    format!(
        "📊 {} vs {}\nShots: {} - {}\nHits: {} - {}\nBlocks: {} - {}\nPIM: {} - {}",
        snapshot.away.abbrev,
        snapshot.home.abbrev,
        stats.away_totals.sog,
        stats.home_totals.sog,
        stats.away_totals.hits,
        stats.home_totals.hits,
        stats.away_totals.blocks,
        stats.home_totals.blocks,
        stats.away_totals.pim,
        stats.home_totals.pim,
    )
}

pub async fn handle_announce_final(game_id: i64, deps: &BotDeps) -> Result<Vec<ScheduledJob>> {
    let snapshot = deps.feed.snapshot(game_id).await?;

    if !acquire_claim(
        deps.store.as_ref(),
        &format!("claim:final:{game_id}"),
        FINAL_CLAIM_TTL,
    )
    .await?
    {
        info!(game_id, skip = %SkipReason::AlreadyClaimed, "Final already announced");
        return Ok(vec![]);
    }

    let we_are_home = snapshot.home.id == deps.config.team_id;
    let (us, them) = if we_are_home {
        (&snapshot.home, &snapshot.away)
    } else {
        (&snapshot.away, &snapshot.home)
    };
    let we_won = us.score > them.score;

    let overtime_tag = snapshot
        .period
        .as_ref()
        .filter(|p| p.number > 3)
        .map(|p| format!(" ({})", period_label(p)))
        .unwrap_or_default();

    let headline = if we_won {
        format!("{} win!", us.name)
    } else {
        "Final from tonight.".to_string()
    };

    let text = format!(
        "🏁 {headline}\n\nFinal{overtime_tag}: {}\nShots on goal: {} {} - {} {}",
        snapshot.score_line(),
        snapshot.away.abbrev,
        snapshot.away.sog,
        snapshot.home.abbrev,
        snapshot.home.sog,
    );
    let draft = PostDraft::new(text).with_logical_key(format!("final:{game_id}"));
    deps.publisher.publish(&draft).await?;

    if we_won {
        announce_goalie_milestones(game_id, we_are_home, us.id, them.score == 0, deps).await?;
    }

    Ok(vec![])
}

/// Win (and shutout) milestone checks for the goaltender of record: the
/// cached in-net goalie, falling back to the boxscore ice-time leader.
async fn announce_goalie_milestones(
    game_id: i64,
    we_are_home: bool,
    team_id: i64,
    shutout: bool,
    deps: &BotDeps,
) -> Result<()> {
    let cached = match deps
        .store
        .get(&goalie::goalie_cache_key(game_id, team_id))
        .await
    {
        Ok(cached) => cached.and_then(|raw| raw.parse::<i64>().ok()),
        Err(e) => {
            warn!(game_id, team_id, error = %e, "Goalie cache unavailable");
            None
        }
    };

    let goalie_id = match cached {
        Some(id) => Some(id),
        None => match deps.feed.boxscore(game_id).await {
            Ok(stats) => stats.goalie_of_record(we_are_home).map(|g| g.player_id),
            Err(e) => {
                warn!(game_id, error = %e, "Boxscore unavailable for goalie of record");
                None
            }
        },
    };
    let Some(goalie_id) = goalie_id else {
        info!(game_id, team_id, "No goalie of record found, skipping win milestones");
        return Ok(());
    };

    let detail = match deps.feed.player(goalie_id).await {
        Ok(detail) => detail,
        Err(e) => {
            warn!(goalie_id, error = %e, "Career totals unavailable, skipping win milestones");
            return Ok(());
        }
    };

    for milestone in milestones::goalie_milestones(&detail.career, shutout) {
        let text = milestones::milestone_text(&detail.name, &milestone);
        let key = format!(
            "milestone:{}:{}:{}",
            goalie_id, milestone.credit, milestone.total
        );
        deps.publisher
            .publish(&PostDraft::new(text).with_logical_key(key))
            .await?;
    }
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
