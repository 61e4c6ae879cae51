//! Campaign-scoped attachment staging.
//!
//! A media campaign carries one attachment reused for every recipient. It is
//! downloaded once into `<data_dir>/staging/<campaign_id>/` and the whole
//! directory is removed when the campaign reaches a terminal state.
use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::model::AttachmentRef;

#[derive(Debug, Clone)]
pub struct AttachmentStage {
    http: Client,
    staging_root: PathBuf,
}

impl AttachmentStage {
    pub fn new(data_dir: &str) -> Self {
        let http = Client::builder()
            .user_agent("bulksend/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            staging_root: Path::new(data_dir).join("staging"),
        }
    }

    fn campaign_dir(&self, campaign_id: i64) -> PathBuf {
        self.staging_root.join(campaign_id.to_string())
    }

    /// Local path for the campaign's attachment, downloading it on first use.
    /// Subsequent recipients reuse the staged file.
    pub async fn stage(&self, campaign_id: i64, attachment: &AttachmentRef) -> Result<PathBuf> {
        let dir = self.campaign_dir(campaign_id);
        let name = sanitize_name(&attachment.name);
        let path = dir.join(&name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(path);
        }

        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("cannot create staging dir {}", dir.display()))?;

        let resp = self
            .http
            .get(&attachment.url)
            .send()
            .await
            .context("attachment download failed")?
            .error_for_status()
            .context("attachment download rejected")?;
        let bytes = resp.bytes().await.context("attachment body read failed")?;

        let mut dst = tokio::fs::File::create(&path)
            .await
            .with_context(|| format!("cannot create {}", path.display()))?;
        dst.write_all(&bytes).await?;
        dst.flush().await?;
        info!(campaign_id, name = %name, "staged campaign attachment");
        Ok(path)
    }

    /// Drop the campaign's staging directory. Best-effort: a leftover file
    /// only wastes disk, it cannot corrupt a run.
    pub async fn cleanup(&self, campaign_id: i64) {
        let dir = self.campaign_dir(campaign_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => info!(campaign_id, "removed staged attachment"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(?err, campaign_id, "staging cleanup failed"),
        }
    }
}

/// Keep the stored name to a safe basename; the backend controls the
/// original string.
fn sanitize_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("attachment.bin");
    base.replace(['\\', ':'], "_")
}
