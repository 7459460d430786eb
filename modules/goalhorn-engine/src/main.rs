use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bluesky_client::BlueskyClient;
use goalhorn_common::Config;
use goalhorn_engine::deps::BotDeps;
use goalhorn_engine::jobs::Job;
use goalhorn_engine::publisher::PostPublisher;
use goalhorn_engine::scheduler::JobScheduler;
use goalhorn_engine::traits::{JobRunner, NoopBackend, PostBackend};
use goalhorn_store::{KeyValue, RedisStore};
use nhl_client::NhlClient;

#[derive(Parser, Debug)]
#[command(name = "goalhorn", about = "Live-game social bot engine")]
struct Args {
    /// Scheduler worker count.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Log posts instead of publishing them.
    #[arg(long)]
    dry_run: bool,

    /// Start polling this game immediately instead of waiting for the
    /// schedule scan to arm it.
    #[arg(long)]
    game: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("goalhorn=info".parse()?))
        .init();

    let args = Args::parse();
    let run_id = format!("bot-{}", uuid::Uuid::new_v4());
    info!(run_id = run_id.as_str(), "Goalhorn starting...");

    let config = Config::from_env();
    config.log_redacted();

    let store: Arc<dyn KeyValue> = Arc::new(RedisStore::connect(&config.redis_url, 5).await?);

    let backend: Arc<dyn PostBackend> = if args.dry_run {
        info!("Dry run: posts will be logged, not published");
        Arc::new(NoopBackend)
    } else {
        Arc::new(BlueskyClient::new(
            config.bluesky_identifier.clone(),
            config.bluesky_password.clone(),
        ))
    };

    let publisher = PostPublisher::new(backend, store.clone(), config.hashtags.clone());

    let deps: Arc<dyn JobRunner> = Arc::new(BotDeps {
        config,
        feed: Arc::new(NhlClient::new()),
        store,
        publisher,
    });

    let scheduler = JobScheduler::new();
    match args.game {
        Some(game_id) => {
            info!(game_id, "Polling requested game directly");
            scheduler.enqueue(Job::PollGame { game_id });
        }
        None => scheduler.enqueue(Job::ScheduleScan),
    }

    scheduler.run(deps, args.workers).await;
    Ok(())
}
