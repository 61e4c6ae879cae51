//! REST client for the campaign backend: rule retrieval, recipient dequeue,
//! result reporting and lifecycle notification.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{AttachmentRef, MediaKind, RecipientTask, SendOutcome};
use crate::rules::RulesPatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Pause,
    Resume,
    Cancel,
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::Pause => "pause",
            LifecycleEvent::Resume => "resume",
            LifecycleEvent::Cancel => "cancel",
        }
    }
}

/// One dequeue call: the next task if any, plus the queue size when the
/// backend reports it (first response usually carries it).
#[derive(Debug, Clone, Default)]
pub struct Dequeued {
    pub task: Option<RecipientTask>,
    pub total_recipients: Option<u32>,
}

#[async_trait]
pub trait BackendService: Send + Sync {
    /// `GET /bulk_sends/rules`; absent fields fall back to defaults upstream.
    async fn fetch_rules(&self) -> Result<RulesPatch>;

    /// `GET /bulk_sends/{id}/next-recipient`. The backend owns the queue
    /// cursor, so a recipient interrupted before completion is simply
    /// re-dequeued on resume.
    async fn next_recipient(&self, campaign_id: i64) -> Result<Dequeued>;

    /// `POST /bulk_sends/{id}/recipient-result`.
    async fn report_result(
        &self,
        campaign_id: i64,
        recipient_id: i64,
        outcome: &SendOutcome,
    ) -> Result<()>;

    /// `POST /bulk_sends/{id}/{pause|resume|cancel}`. Callers treat failures
    /// as log-and-continue.
    async fn notify_lifecycle(&self, campaign_id: i64, event: LifecycleEvent) -> Result<()>;
}

#[derive(Clone)]
pub struct HttpBackendClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for HttpBackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackendClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct NextRecipientResp {
    has_next: bool,
    recipient_id: Option<i64>,
    phone: Option<String>,
    content: Option<String>,
    attachment_url: Option<String>,
    attachment_name: Option<String>,
    attachment_kind: Option<MediaKind>,
    total_recipients: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecipientResultBody<'a> {
    recipient_id: i64,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<&'a str>,
}

impl HttpBackendClient {
    pub fn new(base_url: &str, token: String) -> Result<Self> {
        // A trailing slash keeps Url::join from eating the last path segment.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).context("invalid backend base URL")?;
        Ok(Self::with_base_url(base_url, token))
    }

    pub fn with_base_url(base_url: Url, token: String) -> Self {
        let http = Client::builder()
            .user_agent("bulksend/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            token,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid backend endpoint: {path}"))
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(anyhow!("backend returned {status}: {body}"))
    }
}

#[async_trait]
impl BackendService for HttpBackendClient {
    async fn fetch_rules(&self) -> Result<RulesPatch> {
        let resp = self
            .http
            .get(self.endpoint("bulk_sends/rules")?)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("rules request failed")?;
        let resp = Self::check_status(resp).await?;
        resp.json().await.context("invalid rules payload")
    }

    async fn next_recipient(&self, campaign_id: i64) -> Result<Dequeued> {
        let resp = self
            .http
            .get(self.endpoint(&format!("bulk_sends/{campaign_id}/next-recipient"))?)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("next-recipient request failed")?;
        let resp = Self::check_status(resp).await?;
        let body: NextRecipientResp = resp.json().await.context("invalid recipient payload")?;

        if !body.has_next {
            return Ok(Dequeued {
                task: None,
                total_recipients: body.total_recipients,
            });
        }

        let recipient_id = body
            .recipient_id
            .ok_or_else(|| anyhow!("has_next without recipient_id"))?;
        let attachment = match (body.attachment_url, body.attachment_name) {
            (Some(url), Some(name)) => Some(AttachmentRef {
                url,
                name,
                kind: body.attachment_kind.unwrap_or(MediaKind::Document),
            }),
            _ => None,
        };
        Ok(Dequeued {
            task: Some(RecipientTask {
                recipient_id,
                phone: body.phone.unwrap_or_default(),
                content: body.content.unwrap_or_default(),
                attachment,
            }),
            total_recipients: body.total_recipients,
        })
    }

    async fn report_result(
        &self,
        campaign_id: i64,
        recipient_id: i64,
        outcome: &SendOutcome,
    ) -> Result<()> {
        let action = match outcome {
            SendOutcome::Success => None,
            SendOutcome::Skip(_) => Some("skip"),
            SendOutcome::Retryable(_) => Some("retry"),
            SendOutcome::Fatal(_) => Some("fatal"),
        };
        let body = RecipientResultBody {
            recipient_id,
            success: matches!(outcome, SendOutcome::Success),
            error_message: outcome.error_message(),
            action,
        };
        let resp = self
            .http
            .post(self.endpoint(&format!("bulk_sends/{campaign_id}/recipient-result"))?)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .context("recipient-result request failed")?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn notify_lifecycle(&self, campaign_id: i64, event: LifecycleEvent) -> Result<()> {
        let resp = self
            .http
            .post(self.endpoint(&format!("bulk_sends/{campaign_id}/{}", event.as_str()))?)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("lifecycle request failed")?;
        Self::check_status(resp).await?;
        Ok(())
    }
}
