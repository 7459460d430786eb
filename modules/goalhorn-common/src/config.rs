use std::env;

use chrono::FixedOffset;
use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Team identity
    pub team_id: i64,
    pub team_abbrev: String,
    pub team_name: String,
    /// UTC offset used when formatting puck-drop times (e.g. "-05:00").
    pub utc_offset: FixedOffset,

    // Publishing
    pub bluesky_identifier: String,
    pub bluesky_password: String,
    /// Appended to every post before length checking.
    pub hashtags: String,

    // Store
    pub redis_url: String,

    // Upcoming-milestone windows. Product-tuned; a player within this many
    // goals/points of a threshold gets an "approaching" mention in game-day
    // posts when few games remain.
    pub upcoming_goal_window: u32,
    pub upcoming_point_window: u32,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            team_id: required_env("TEAM_ID")
                .parse()
                .expect("TEAM_ID must be a number"),
            team_abbrev: required_env("TEAM_ABBREV"),
            team_name: required_env("TEAM_NAME"),
            utc_offset: env::var("TEAM_UTC_OFFSET")
                .unwrap_or_else(|_| "-05:00".to_string())
                .parse()
                .expect("TEAM_UTC_OFFSET must look like -05:00"),
            bluesky_identifier: required_env("BLUESKY_IDENTIFIER"),
            bluesky_password: required_env("BLUESKY_PASSWORD"),
            hashtags: env::var("POST_HASHTAGS").unwrap_or_default(),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            upcoming_goal_window: 3,
            upcoming_point_window: 6,
        }
    }

    /// Log the non-secret parts of the config at startup.
    pub fn log_redacted(&self) {
        info!(
            team_id = self.team_id,
            team_abbrev = self.team_abbrev.as_str(),
            team_name = self.team_name.as_str(),
            bluesky_identifier = self.bluesky_identifier.as_str(),
            hashtags = self.hashtags.as_str(),
            "Config loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
