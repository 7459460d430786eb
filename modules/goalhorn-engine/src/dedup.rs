//! Event deduplication against the durable seen-set.
//!
//! Markers are written at detection time, not after downstream processing —
//! the announcement jobs run minutes later and the next poll lands in 30
//! seconds, so waiting would double-dispatch every delayed event.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use goalhorn_common::types::{GameSnapshot, PlayEvent};
use goalhorn_common::GoalhornError;
use goalhorn_store::KeyValue;

/// Seen markers outlive any plausible game + review window.
const SEEN_TTL: Duration = Duration::from_secs(48 * 60 * 60);

pub fn seen_key(game_id: i64, event_id: i64) -> String {
    format!("seen:{game_id}:{event_id}")
}

pub struct Deduplicator {
    store: Arc<dyn KeyValue>,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn KeyValue>) -> Self {
        Self { store }
    }

    /// Return the snapshot's not-yet-processed events, in snapshot order,
    /// marking each seen as it is claimed.
    ///
    /// Fails closed: a store error aborts the whole poll cycle rather than
    /// risking duplicate dispatch — the next scheduled poll retries.
    pub async fn filter_new(&self, snapshot: &GameSnapshot) -> Result<Vec<PlayEvent>> {
        let mut new_events = Vec::new();
        for play in &snapshot.plays {
            let claimed = self
                .store
                .set_if_absent(&seen_key(snapshot.game_id, play.event_id), "1", SEEN_TTL)
                .await
                .map_err(|e| GoalhornError::Store(e.to_string()))?;
            if claimed {
                new_events.push(play.clone());
            }
        }
        if !new_events.is_empty() {
            debug!(
                game_id = snapshot.game_id,
                new_events = new_events.len(),
                total = snapshot.plays.len(),
                "Dedup pass complete"
            );
        }
        Ok(new_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{goal_play, snapshot_with_plays};
    use async_trait::async_trait;
    use goalhorn_store::{MemoryStore, StoreError};

    #[tokio::test]
    async fn events_dispatch_once_across_polls() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Deduplicator::new(store);

        let snap = snapshot_with_plays(vec![goal_play(240, Some(8471685)), goal_play(241, None)]);

        let first = dedup.filter_new(&snap).await.unwrap();
        assert_eq!(
            first.iter().map(|e| e.event_id).collect::<Vec<_>>(),
            vec![240, 241]
        );

        // Same snapshot 30 seconds later: nothing new.
        let second = dedup.filter_new(&snap).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn concurrent_polls_split_without_overlap() {
        let store = Arc::new(MemoryStore::new());
        let dedup_a = Deduplicator::new(store.clone());
        let dedup_b = Deduplicator::new(store);

        let snap = snapshot_with_plays(vec![
            goal_play(240, Some(8471685)),
            goal_play(241, None),
            goal_play(242, None),
        ]);

        let (a, b) = tokio::join!(dedup_a.filter_new(&snap), dedup_b.filter_new(&snap));
        let mut all: Vec<i64> = a
            .unwrap()
            .iter()
            .chain(b.unwrap().iter())
            .map(|e| e.event_id)
            .collect();
        all.sort_unstable();

        // Between the two racing pollers, each event exactly once.
        assert_eq!(all, vec![240, 241, 242]);
    }

    struct BrokenStore;

    #[async_trait]
    impl KeyValue for BrokenStore {
        async fn get(&self, _key: &str) -> goalhorn_store::kv::Result<Option<String>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn set_with_ttl(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Duration,
        ) -> goalhorn_store::kv::Result<()> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn set_if_absent(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Duration,
        ) -> goalhorn_store::kv::Result<bool> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn delete(&self, _key: &str) -> goalhorn_store::kv::Result<()> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn store_outage_fails_closed() {
        let dedup = Deduplicator::new(Arc::new(BrokenStore));
        let snap = snapshot_with_plays(vec![goal_play(240, None)]);

        // Never "all unseen" — the poll cycle must error out.
        assert!(dedup.filter_new(&snap).await.is_err());
    }
}
