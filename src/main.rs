use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use bulksend::automation::HttpBridgePort;
use bulksend::backend::HttpBackendClient;
use bulksend::config;
use bulksend::controller::SendController;
use bulksend::model::CampaignState;
use bulksend::persist::{self, SnapshotStore};
use bulksend::staging::AttachmentStage;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one campaign until it completes, pauses or is cancelled
    Run {
        /// Campaign id as known by the backend
        campaign_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/bulksend.db", cfg.app.data_dir));
    let pool = persist::init_pool(&database_url).await?;
    let store = SnapshotStore::init(pool).await?;

    // Crash-recovery display: a leftover non-terminal snapshot means the
    // previous host process died mid-campaign.
    if let Some(snap) = store.load().await? {
        if !snap.state.is_terminal() {
            warn!(
                campaign_id = snap.campaign_id,
                state = snap.state.as_str(),
                sent = snap.sent_count,
                failed = snap.failed_count,
                total = snap.total_recipients,
                "previous run was interrupted"
            );
        }
    }

    let backend = Arc::new(HttpBackendClient::new(
        &cfg.backend.base_url,
        cfg.backend.token.clone(),
    )?);
    let port = Arc::new(HttpBridgePort::new(&cfg.automation.bridge_url)?);
    let stage = AttachmentStage::new(&cfg.app.data_dir);

    let controller = SendController::new(backend, port, store, stage, cfg.app.utc_offset_hours);

    // Progress feed for the terminal.
    let mut progress = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(ev) = progress.recv().await {
            info!(
                state = ev.state.as_str(),
                sent = ev.sent_count,
                failed = ev.failed_count,
                total = ev.total_recipients,
                phone = ev.current_phone.as_deref().unwrap_or("-"),
                "progress"
            );
        }
    });

    // Ctrl-C requests a cooperative cancel, honored at the next loop check.
    let cancel_ctl = Arc::clone(&controller);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; cancelling campaign");
            cancel_ctl.cancel().await;
        }
    });

    let Command::Run { campaign_id } = args.command;
    info!(campaign_id, "starting campaign");
    let handle = controller.start(campaign_id)?;
    handle.await?;

    match controller.current_run().await {
        Some(run) if run.state == CampaignState::Paused => {
            warn!(
                reason = run.last_error.as_deref().unwrap_or("paused by operator"),
                sent = run.sent_count,
                failed = run.failed_count,
                "campaign paused"
            );
        }
        Some(run) => {
            info!(
                state = run.state.as_str(),
                sent = run.sent_count,
                failed = run.failed_count,
                "campaign finished"
            );
        }
        None => {}
    }

    Ok(())
}
