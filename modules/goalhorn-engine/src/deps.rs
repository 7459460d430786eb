//! Shared dependencies handed to every job handler.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use goalhorn_common::Config;
use goalhorn_store::KeyValue;

use crate::dispatch;
use crate::jobs::ScheduledJob;
use crate::publisher::PostPublisher;
use crate::traits::{FeedSource, JobRunner};

/// Immutable dependency bundle. Cloned-by-Arc into each worker; handlers own
/// no state of their own — everything cross-job lives in the store.
pub struct BotDeps {
    pub config: Config,
    pub feed: Arc<dyn FeedSource>,
    pub store: Arc<dyn KeyValue>,
    pub publisher: PostPublisher,
}

#[async_trait]
impl JobRunner for BotDeps {
    async fn run(&self, scheduled: &ScheduledJob) -> Result<Vec<ScheduledJob>> {
        dispatch::dispatch(scheduled, self).await
    }
}
