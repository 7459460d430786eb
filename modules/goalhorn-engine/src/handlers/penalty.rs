//! Penalty announcement. Runs ~30s after detection; penalty details settle
//! much faster than goal attribution.

use anyhow::Result;
use tracing::info;

use goalhorn_common::format::{period_name, UNKNOWN_PLAYER};
use goalhorn_common::types::{EventKind, GameSnapshot, PlayEvent};

use crate::deps::BotDeps;
use crate::handlers::SkipReason;
use crate::jobs::ScheduledJob;
use crate::publisher::PostDraft;

pub fn penalty_key(game_id: i64, event_id: i64) -> String {
    format!("penalty:{game_id}:{event_id}")
}

pub async fn handle_announce_penalty(
    game_id: i64,
    event_id: i64,
    deps: &BotDeps,
) -> Result<Vec<ScheduledJob>> {
    let snapshot = deps.feed.snapshot(game_id).await?;

    let Some(event) = snapshot
        .find_play(event_id)
        .filter(|p| p.kind == EventKind::Penalty)
    else {
        info!(
            game_id,
            event_id,
            skip = %SkipReason::EventVanished,
            "Penalty disappeared before announcement"
        );
        return Ok(vec![]);
    };

    // A penalty with neither offender nor infraction reads as nothing.
    if event.details.committed_by_player_id.is_none() && event.details.penalty_desc_key.is_none() {
        info!(
            game_id,
            event_id,
            skip = %SkipReason::MissingData,
            "Penalty details never populated, not posting"
        );
        return Ok(vec![]);
    }

    let draft = compose_penalty_post(&snapshot, event);
    deps.publisher.publish(&draft).await?;
    Ok(vec![])
}

fn compose_penalty_post(snapshot: &GameSnapshot, event: &PlayEvent) -> PostDraft {
    let offender = event
        .details
        .committed_by_player_id
        .and_then(|id| snapshot.player_name(id))
        .unwrap_or_else(|| UNKNOWN_PLAYER.to_string());

    let infraction = event
        .details
        .penalty_desc_key
        .as_deref()
        .map(prettify_infraction)
        .unwrap_or_else(|| "a penalty".to_string());

    let severity = penalty_severity(event.details.penalty_type_code.as_deref());
    let duration = event
        .details
        .penalty_duration
        .map(|m| format!("{m}-minute "))
        .unwrap_or_default();

    let power_play = event
        .details
        .event_owner_team_id
        .and_then(|team_id| snapshot.opponent(team_id))
        .map(|team| format!(" {} to the power play.", team.name))
        .unwrap_or_default();

    let period = period_name(&event.period);
    let time = &event.time_in_period;

    let text = format!(
        "🚔 {offender} heads to the box: {duration}{severity} for {infraction} in {period} ({time}).{power_play}"
    );

    PostDraft::new(text).with_logical_key(penalty_key(snapshot.game_id, event.event_id))
}

/// "high-sticking" → "high sticking".
fn prettify_infraction(desc_key: &str) -> String {
    desc_key.replace('-', " ")
}

fn penalty_severity(type_code: Option<&str>) -> &'static str {
    match type_code {
        Some("MIN") => "minor",
        Some("MAJ") => "major",
        Some("MIS") => "misconduct",
        Some("MAT") => "match penalty",
        Some("BEN") => "bench minor",
        _ => "penalty",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goalhorn_common::types::EventDetails;

    use crate::testing::{base_snapshot, play};

    #[test]
    fn penalty_text_names_offender_and_power_play_side() {
        let mut snap = base_snapshot();
        let mut event = play(300, EventKind::Penalty);
        event.details = EventDetails {
            // Committed by the home side — away team goes on the power play.
            event_owner_team_id: Some(snap.home.id),
            committed_by_player_id: Some(8471685),
            penalty_desc_key: Some("high-sticking".to_string()),
            penalty_type_code: Some("MIN".to_string()),
            penalty_duration: Some(2),
            ..Default::default()
        };
        snap.plays.push(event.clone());

        let draft = compose_penalty_post(&snap, &event);
        assert!(draft.text.contains("David Krejci"));
        assert!(draft.text.contains("2-minute minor"));
        assert!(draft.text.contains("high sticking"));
        assert!(draft.text.contains("Devils to the power play"));
    }

    #[test]
    fn unknown_offender_degrades_to_label() {
        let mut snap = base_snapshot();
        let mut event = play(301, EventKind::Penalty);
        event.details = EventDetails {
            event_owner_team_id: Some(snap.away.id),
            committed_by_player_id: Some(999_999),
            penalty_desc_key: Some("tripping".to_string()),
            ..Default::default()
        };
        snap.plays.push(event.clone());

        let draft = compose_penalty_post(&snap, &event);
        assert!(draft.text.contains(UNKNOWN_PLAYER));
        assert!(draft.text.contains("tripping"));
    }
}
