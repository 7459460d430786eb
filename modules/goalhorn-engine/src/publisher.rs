//! Threaded post publishing over the platform backend.
//!
//! Producers address posts by logical key ("goal:2024020500:240"), never by
//! platform id. The publisher records logical key → platform ref on first
//! successful publish and resolves `parent_key` through the same mapping, so
//! replies thread correctly even though publishing is asynchronous and
//! retried.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use bluesky_client::{ExternalEmbed, PostRef, ReplyRef, MAX_POST_LENGTH};
use goalhorn_common::GoalhornError;
use goalhorn_store::KeyValue;

use crate::traits::PostBackend;

/// Post mappings cover a game plus its review window, same as seen markers.
const POST_KEY_TTL: Duration = Duration::from_secs(48 * 60 * 60);

pub fn post_key(logical_key: &str) -> String {
    format!("post:{logical_key}")
}

/// What we persist per logical key: the post itself plus its thread root,
/// so a reply-to-a-reply still anchors to the top of the thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPost {
    pub post: PostRef,
    pub root: PostRef,
}

#[derive(Debug, Clone)]
pub struct PostDraft {
    pub text: String,
    pub logical_key: Option<String>,
    pub parent_key: Option<String>,
    pub media: Option<ExternalEmbed>,
}

impl PostDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            logical_key: None,
            parent_key: None,
            media: None,
        }
    }

    pub fn with_logical_key(mut self, key: impl Into<String>) -> Self {
        self.logical_key = Some(key.into());
        self
    }

    pub fn with_parent(mut self, key: impl Into<String>) -> Self {
        self.parent_key = Some(key.into());
        self
    }

    pub fn with_media(mut self, media: ExternalEmbed) -> Self {
        self.media = Some(media);
        self
    }
}

pub struct PostPublisher {
    backend: Arc<dyn PostBackend>,
    store: Arc<dyn KeyValue>,
    /// Static footer appended to every post before length checking.
    footer: String,
}

impl PostPublisher {
    pub fn new(backend: Arc<dyn PostBackend>, store: Arc<dyn KeyValue>, footer: String) -> Self {
        Self {
            backend,
            store,
            footer,
        }
    }

    /// Publish a draft. Threads beneath `parent_key`'s post when that key is
    /// mapped; otherwise publishes top-level. Errors are surfaced to the job
    /// retry machinery — a visible retry beats a silently lost post.
    pub async fn publish(&self, draft: &PostDraft) -> Result<PostRef> {
        let text = self.with_footer(&draft.text);

        // Callers pre-shorten; truncating here would cut mid-sentence.
        let length = text.chars().count();
        if length > MAX_POST_LENGTH {
            return Err(GoalhornError::PostTooLong {
                length,
                max: MAX_POST_LENGTH,
            }
            .into());
        }

        let reply = match &draft.parent_key {
            Some(parent_key) => self.lookup(parent_key).await?.map(|parent| ReplyRef {
                root: parent.root,
                parent: parent.post,
            }),
            None => None,
        };

        let post_ref = self
            .backend
            .create_post(&text, reply.as_ref(), draft.media.as_ref())
            .await?;
        let threaded = reply.is_some();

        if let Some(logical_key) = &draft.logical_key {
            let stored = StoredPost {
                post: post_ref.clone(),
                root: reply
                    .map(|r| r.root)
                    .unwrap_or_else(|| post_ref.clone()),
            };
            let value = serde_json::to_string(&stored)?;
            // First successful publish wins; a concurrent duplicate keeps
            // the mapping stable for everything threaded beneath it.
            let recorded = self
                .store
                .set_if_absent(&post_key(logical_key), &value, POST_KEY_TTL)
                .await?;
            if !recorded {
                warn!(logical_key = logical_key.as_str(), "Post key already mapped, keeping first");
            }
        }

        info!(
            logical_key = draft.logical_key.as_deref().unwrap_or("-"),
            parent_key = draft.parent_key.as_deref().unwrap_or("-"),
            threaded,
            "Post published"
        );
        Ok(post_ref)
    }

    /// Resolve a logical key to its stored platform ref, if published.
    pub async fn lookup(&self, logical_key: &str) -> Result<Option<StoredPost>> {
        let raw = self.store.get(&post_key(logical_key)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn with_footer(&self, text: &str) -> String {
        if self.footer.is_empty() {
            text.to_string()
        } else {
            format!("{text}\n{}", self.footer)
        }
    }
}
