//! Capability interface over the live chat surface.
//!
//! The page mechanics (selectors, keyboard simulation, clipboard) live in a
//! separate bridge process; the engine only sees the structured results
//! below. A test double implementing [`ChatAutomationPort`] in memory drives
//! the full state machine without a browser.
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::model::MediaKind;

/// Navigation attempt result. `error_type` carries the classifier tag
/// (`not_registered`, `not_found`, `timeout`, `selector`, `unknown`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavResult {
    pub ok: bool,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl NavResult {
    pub fn success() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    pub fn failure(error_type: &str, message: &str) -> Self {
        Self {
            ok: false,
            error_type: Some(error_type.to_string()),
            error_message: Some(message.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendResult {
    pub ok: bool,
    pub error_message: Option<String>,
}

impl SendResult {
    pub fn success() -> Self {
        Self {
            ok: true,
            error_message: None,
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            ok: false,
            error_message: Some(message.to_string()),
        }
    }
}

/// The single automation surface. Exclusively owned by the controller for
/// the duration of a campaign; nothing else may drive it concurrently.
#[async_trait]
pub trait ChatAutomationPort: Send + Sync {
    /// True while the chat session is logged in and usable.
    async fn check_session(&self) -> Result<bool>;

    /// Return the surface to its neutral home screen.
    async fn reset_to_home(&self) -> Result<bool>;

    async fn navigate_to_recipient(&self, phone: &str) -> Result<NavResult>;

    async fn send_text(&self, text: &str) -> Result<SendResult>;

    async fn send_media(
        &self,
        local_path: &Path,
        caption: &str,
        kind: MediaKind,
    ) -> Result<SendResult>;
}

/// Adapter speaking JSON-over-HTTP to the local automation bridge.
#[derive(Clone)]
pub struct HttpBridgePort {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for HttpBridgePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBridgePort")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct OkResp {
    ok: bool,
}

impl HttpBridgePort {
    pub fn new(base_url: &str) -> Result<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).context("invalid bridge URL")?;
        let http = Client::builder()
            .user_agent("bulksend/0.1")
            .no_proxy()
            .build()
            .expect("reqwest client");
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid bridge endpoint: {path}"))
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let resp = self
            .http
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await
            .with_context(|| format!("bridge call failed: {path}"))?
            .error_for_status()
            .with_context(|| format!("bridge rejected call: {path}"))?;
        resp.json()
            .await
            .with_context(|| format!("invalid bridge response: {path}"))
    }
}

#[async_trait]
impl ChatAutomationPort for HttpBridgePort {
    async fn check_session(&self) -> Result<bool> {
        let resp: OkResp = self.post_json("session/check", &serde_json::json!({})).await?;
        Ok(resp.ok)
    }

    async fn reset_to_home(&self) -> Result<bool> {
        let resp: OkResp = self.post_json("session/home", &serde_json::json!({})).await?;
        Ok(resp.ok)
    }

    async fn navigate_to_recipient(&self, phone: &str) -> Result<NavResult> {
        self.post_json("chat/navigate", &serde_json::json!({ "phone": phone }))
            .await
    }

    async fn send_text(&self, text: &str) -> Result<SendResult> {
        self.post_json("chat/send-text", &serde_json::json!({ "text": text }))
            .await
    }

    async fn send_media(
        &self,
        local_path: &Path,
        caption: &str,
        kind: MediaKind,
    ) -> Result<SendResult> {
        self.post_json(
            "chat/send-media",
            &serde_json::json!({
                "path": local_path.to_string_lossy(),
                "caption": caption,
                "kind": kind.as_str(),
            }),
        )
        .await
    }
}
