pub mod error;
pub mod types;

pub use error::{BlueskyError, Result};
pub use types::{ExternalEmbed, PostRef, ReplyRef};

use chrono::Utc;
use serde_json::json;
use tokio::sync::Mutex;

use types::{CreateRecordRequest, CreateRecordResponse, CreateSessionRequest, SessionData};

const DEFAULT_SERVICE: &str = "https://bsky.social";

/// The platform rejects posts longer than this many units.
pub const MAX_POST_LENGTH: usize = 300;

/// Client for the publishing platform's create-post/create-reply API.
///
/// Sessions are created lazily and refreshed once on an auth rejection;
/// callers never manage tokens.
pub struct BlueskyClient {
    client: reqwest::Client,
    service: String,
    identifier: String,
    password: String,
    session: Mutex<Option<SessionData>>,
}

impl BlueskyClient {
    pub fn new(identifier: String, password: String) -> Self {
        Self::with_service(DEFAULT_SERVICE.to_string(), identifier, password)
    }

    pub fn with_service(service: String, identifier: String, password: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            service,
            identifier,
            password,
            session: Mutex::new(None),
        }
    }

    /// Publish a post. `reply` threads it beneath an existing post; `embed`
    /// attaches an external link card.
    pub async fn create_post(
        &self,
        text: &str,
        reply: Option<&ReplyRef>,
        embed: Option<&ExternalEmbed>,
    ) -> Result<PostRef> {
        let session = self.session().await?;

        let mut record = json!({
            "$type": "app.bsky.feed.post",
            "text": text,
            "createdAt": Utc::now().to_rfc3339(),
        });
        if let Some(reply) = reply {
            record["reply"] = serde_json::to_value(reply)?;
        }
        if let Some(embed) = embed {
            record["embed"] = json!({
                "$type": "app.bsky.embed.external",
                "external": embed,
            });
        }

        let body = CreateRecordRequest {
            repo: session.did.clone(),
            collection: "app.bsky.feed.post".to_string(),
            record,
        };

        let url = format!("{}/xrpc/com.atproto.repo.createRecord", self.service);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&session.access_jwt)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Stale session — drop it and retry once with a fresh login.
            *self.session.lock().await = None;
            let session = self.session().await?;
            let resp = self
                .client
                .post(&url)
                .bearer_auth(&session.access_jwt)
                .json(&body)
                .send()
                .await?;
            return Self::read_post_ref(resp).await;
        }

        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BlueskyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreateRecordResponse = resp.json().await?;
        tracing::info!(uri = %created.uri, reply = reply.is_some(), "Published post");
        Ok(PostRef {
            uri: created.uri,
            cid: created.cid,
        })
    }

    async fn read_post_ref(resp: reqwest::Response) -> Result<PostRef> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BlueskyError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let created: CreateRecordResponse = resp.json().await?;
        Ok(PostRef {
            uri: created.uri,
            cid: created.cid,
        })
    }

    /// Return the live session, logging in if none is cached.
    async fn session(&self) -> Result<SessionData> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let url = format!("{}/xrpc/com.atproto.server.createSession", self.service);
        let resp = self
            .client
            .post(&url)
            .json(&CreateSessionRequest {
                identifier: &self.identifier,
                password: &self.password,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BlueskyError::Auth(format!("status {status}: {message}")));
        }

        let session: SessionData = resp.json().await?;
        tracing::info!(did = %session.did, "Bluesky session created");
        *guard = Some(session.clone());
        Ok(session)
    }
}
