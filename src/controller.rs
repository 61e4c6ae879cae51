//! The send-loop controller: one campaign at a time, strictly serialized.
//!
//! Pause and cancel are cooperative flags observed at the top of each loop
//! iteration. Pacing sleeps (including the multi-minute anti-ban pause) are
//! deliberately not preemptible: a cancel requested mid-sleep takes effect
//! when the sleep finishes, never mid-recipient.
use anyhow::{anyhow, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::automation::ChatAutomationPort;
use crate::backend::{BackendService, LifecycleEvent};
use crate::classify::{self, ErrorKind, CIRCUIT_BREAKER_THRESHOLD};
use crate::model::{CampaignRun, CampaignState, ProgressEvent, RecipientTask, SendOutcome};
use crate::persist::SnapshotStore;
use crate::rules::RulesConfig;
use crate::staging::AttachmentStage;

/// Operator-facing auto-pause reasons. Part of the contract: the UI shows
/// these verbatim so the operator knows whether to reconnect, wait or dig in.
pub const PAUSE_REASON_SESSION: &str =
    "Chat session disconnected. Reconnect the session and resume the campaign.";
pub const PAUSE_REASON_DAILY_LIMIT: &str =
    "Daily message limit reached. Resume after the limit resets.";
pub const PAUSE_REASON_CONSECUTIVE_FAILURES: &str =
    "Paused after 5 consecutive failures. Check the chat session before resuming.";

/// Idle step while outside the send-hour window.
const WINDOW_IDLE: Duration = Duration::from_secs(60);
/// Breather after a failed dequeue before asking the backend again.
const DEQUEUE_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct SendController {
    backend: Arc<dyn BackendService>,
    port: Arc<dyn ChatAutomationPort>,
    store: SnapshotStore,
    stage: AttachmentStage,
    utc_offset_hours: i32,
    progress_tx: broadcast::Sender<ProgressEvent>,
    running: AtomicBool,
    pause_requested: AtomicBool,
    cancel_requested: AtomicBool,
    /// Messages sent since process start. Reset only by restart, never by a
    /// new campaign, so back-to-back campaigns share one daily budget.
    daily_sent: AtomicU32,
    run: Mutex<Option<CampaignRun>>,
    rules: Mutex<RulesConfig>,
}

impl SendController {
    pub fn new(
        backend: Arc<dyn BackendService>,
        port: Arc<dyn ChatAutomationPort>,
        store: SnapshotStore,
        stage: AttachmentStage,
        utc_offset_hours: i32,
    ) -> Arc<Self> {
        let (progress_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            backend,
            port,
            store,
            stage,
            utc_offset_hours,
            progress_tx,
            running: AtomicBool::new(false),
            pause_requested: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            daily_sent: AtomicU32::new(0),
            run: Mutex::new(None),
            rules: Mutex::new(RulesConfig::default()),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress_tx.subscribe()
    }

    pub async fn current_run(&self) -> Option<CampaignRun> {
        self.run.lock().await.clone()
    }

    /// Begin a campaign. Fails fast if one is already running; every other
    /// failure mode surfaces through `last_error` and a paused state, never
    /// as an error from the spawned task.
    pub fn start(self: &Arc<Self>, campaign_id: i64) -> Result<JoinHandle<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(anyhow!("a campaign is already running"));
        }
        self.pause_requested.store(false, Ordering::SeqCst);
        self.cancel_requested.store(false, Ordering::SeqCst);

        let ctl = Arc::clone(self);
        Ok(tokio::spawn(async move {
            // Rules are fetched once per campaign start; a backend failure
            // falls back to the built-in defaults.
            let rules = match ctl.backend.fetch_rules().await {
                Ok(patch) => RulesConfig::merged(&patch),
                Err(err) => {
                    warn!(?err, "rules fetch failed; using defaults");
                    RulesConfig::default()
                }
            };
            *ctl.rules.lock().await = rules.clone();

            match ctl.port.reset_to_home().await {
                Ok(true) => {}
                Ok(false) => warn!("automation surface did not reset to home"),
                Err(err) => warn!(?err, "reset-to-home failed"),
            }

            let run = CampaignRun::new(campaign_id, 0, ctl.daily_sent.load(Ordering::SeqCst));
            ctl.checkpoint(&run).await;
            ctl.drive(run, rules).await;
        }))
    }

    /// Request a pause. Takes effect at the top of the next loop iteration.
    pub async fn pause(&self) {
        let Some(run) = self.current_run().await else {
            return;
        };
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        self.pause_requested.store(true, Ordering::SeqCst);
        info!(campaign_id = run.campaign_id, "pause requested");
        self.notify_lifecycle(run.campaign_id, LifecycleEvent::Pause)
            .await;
    }

    /// Re-enter the loop from scratch for a paused campaign. Session, hours
    /// and quota are re-checked before the next recipient is dequeued.
    pub async fn resume(self: &Arc<Self>) -> Result<JoinHandle<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(anyhow!("a campaign is already running"));
        }
        let resumed = {
            let mut guard = self.run.lock().await;
            match guard.take() {
                Some(run) if run.state == CampaignState::Paused => {
                    let run = run.resumed();
                    *guard = Some(run.clone());
                    run
                }
                other => {
                    *guard = other;
                    self.running.store(false, Ordering::SeqCst);
                    return Err(anyhow!("no paused campaign to resume"));
                }
            }
        };
        self.pause_requested.store(false, Ordering::SeqCst);
        self.cancel_requested.store(false, Ordering::SeqCst);
        info!(campaign_id = resumed.campaign_id, "resuming campaign");
        self.notify_lifecycle(resumed.campaign_id, LifecycleEvent::Resume)
            .await;

        let rules = self.rules.lock().await.clone();
        let ctl = Arc::clone(self);
        Ok(tokio::spawn(async move {
            ctl.checkpoint(&resumed).await;
            ctl.drive(resumed, rules).await;
        }))
    }

    /// Request a cancel. Honored at the next loop check while running; a
    /// paused campaign is finalized immediately.
    pub async fn cancel(&self) {
        let Some(run) = self.current_run().await else {
            return;
        };
        self.notify_lifecycle(run.campaign_id, LifecycleEvent::Cancel)
            .await;
        if self.running.load(Ordering::SeqCst) {
            self.cancel_requested.store(true, Ordering::SeqCst);
            info!(campaign_id = run.campaign_id, "cancel requested");
            return;
        }
        if run.state == CampaignState::Paused {
            self.finalize(run.cancelled()).await;
        }
    }

    /// The loop proper. Exits only through a state transition; no error
    /// escapes to the spawned task.
    #[instrument(skip_all, fields(campaign_id = run.campaign_id))]
    async fn drive(&self, mut run: CampaignRun, rules: RulesConfig) {
        // Successes since the last long pause.
        let mut sent_in_block: u32 = 0;

        loop {
            if self.cancel_requested.load(Ordering::SeqCst) {
                info!("campaign cancelled");
                self.finalize(run.cancelled()).await;
                break;
            }
            if self.pause_requested.load(Ordering::SeqCst) {
                info!("campaign paused by operator");
                run = run.with_state(CampaignState::Paused);
                self.checkpoint(&run).await;
                break;
            }

            match self.port.check_session().await {
                Ok(true) => {}
                Ok(false) => {
                    warn!("chat session invalid; auto-pausing");
                    run = run.paused(PAUSE_REASON_SESSION);
                    self.checkpoint(&run).await;
                    self.notify_lifecycle(run.campaign_id, LifecycleEvent::Pause).await;
                    break;
                }
                Err(err) => {
                    warn!(?err, "session check failed; auto-pausing");
                    run = run.paused(PAUSE_REASON_SESSION);
                    self.checkpoint(&run).await;
                    self.notify_lifecycle(run.campaign_id, LifecycleEvent::Pause).await;
                    break;
                }
            }

            if !rules.within_send_window(Utc::now(), self.utc_offset_hours) {
                // Outside the window: idle without consuming recipients.
                tokio::time::sleep(WINDOW_IDLE).await;
                continue;
            }

            if rules.daily_cap_reached(run.daily_sent_count) {
                info!(daily_sent = run.daily_sent_count, "daily cap reached; auto-pausing");
                run = run.paused(PAUSE_REASON_DAILY_LIMIT);
                self.checkpoint(&run).await;
                self.notify_lifecycle(run.campaign_id, LifecycleEvent::Pause).await;
                break;
            }

            let dequeued = match self.backend.next_recipient(run.campaign_id).await {
                Ok(d) => d,
                Err(err) => {
                    // Backend hiccups never kill the loop.
                    warn!(?err, "dequeue failed; retrying");
                    tokio::time::sleep(DEQUEUE_RETRY_DELAY).await;
                    continue;
                }
            };
            if let Some(total) = dequeued.total_recipients {
                run = run.with_total(total);
            }
            let Some(task) = dequeued.task else {
                info!(sent = run.sent_count, failed = run.failed_count, "campaign completed");
                self.finalize(run.completed()).await;
                break;
            };

            run = run.at_recipient(&task.phone);

            if !classify::valid_phone(&task.phone) {
                let outcome = SendOutcome::Skip("invalid phone number".into());
                self.report(run.campaign_id, task.recipient_id, &outcome).await;
                run = run.record_skip();
                self.checkpoint(&run).await;
                continue;
            }

            let outcome = self.deliver(&run, &task).await;
            match &outcome {
                SendOutcome::Success => {
                    self.report(run.campaign_id, task.recipient_id, &outcome).await;
                    run = run.record_success();
                    self.daily_sent.fetch_add(1, Ordering::SeqCst);
                    sent_in_block += 1;
                    self.checkpoint(&run).await;

                    if rules.long_pause_due(sent_in_block) {
                        info!(
                            pause_min = rules.pause_duration_min,
                            "anti-ban long pause"
                        );
                        tokio::time::sleep(rules.long_pause()).await;
                        sent_in_block = 0;
                    }
                    tokio::time::sleep(rules.pacing_delay(run.consecutive_failures)).await;
                }
                SendOutcome::Skip(reason) => {
                    info!(phone = %task.phone, %reason, "recipient skipped");
                    self.report(run.campaign_id, task.recipient_id, &outcome).await;
                    run = run.record_skip();
                    self.checkpoint(&run).await;
                    tokio::time::sleep(rules.skip_delay()).await;
                }
                SendOutcome::Retryable(reason) | SendOutcome::Fatal(reason) => {
                    warn!(phone = %task.phone, %reason, "delivery failed");
                    self.report(run.campaign_id, task.recipient_id, &outcome).await;
                    run = run.record_retryable(reason);
                    self.checkpoint(&run).await;

                    if run.consecutive_failures >= CIRCUIT_BREAKER_THRESHOLD {
                        warn!("circuit breaker tripped; auto-pausing");
                        run = run.paused(PAUSE_REASON_CONSECUTIVE_FAILURES);
                        self.checkpoint(&run).await;
                        self.notify_lifecycle(run.campaign_id, LifecycleEvent::Pause).await;
                        break;
                    }
                    tokio::time::sleep(rules.pacing_delay(run.consecutive_failures)).await;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
    }

    /// Navigate to the recipient and perform the send. Every failure path
    /// collapses into a classified outcome; nothing propagates.
    async fn deliver(&self, run: &CampaignRun, task: &RecipientTask) -> SendOutcome {
        let nav = match self.port.navigate_to_recipient(&task.phone).await {
            Ok(nav) => nav,
            Err(err) => return SendOutcome::Retryable(format!("navigation error: {err}")),
        };
        if !nav.ok {
            let kind = nav
                .error_type
                .as_deref()
                .map(ErrorKind::parse)
                .unwrap_or(ErrorKind::Unknown);
            return classify::classify_navigation(kind, nav.error_message.as_deref());
        }

        let sent = match &task.attachment {
            Some(attachment) => {
                let path = match self.stage.stage(run.campaign_id, attachment).await {
                    Ok(path) => path,
                    Err(err) => {
                        return SendOutcome::Retryable(format!("attachment staging failed: {err}"))
                    }
                };
                self.port
                    .send_media(&path, &task.content, attachment.kind)
                    .await
            }
            None => self.port.send_text(&task.content).await,
        };
        match sent {
            Ok(res) if res.ok => SendOutcome::Success,
            Ok(res) => classify::classify_send(res.error_message.as_deref()),
            Err(err) => classify::classify_send(Some(&format!("send error: {err}"))),
        }
    }

    /// Persist and broadcast the current run. Both are best-effort.
    async fn checkpoint(&self, run: &CampaignRun) {
        *self.run.lock().await = Some(run.clone());
        self.store.save_best_effort(run).await;
        let _ = self.progress_tx.send(ProgressEvent::from_run(run));
    }

    /// Terminal transition: snapshot cleared, staged attachment removed.
    async fn finalize(&self, run: CampaignRun) {
        *self.run.lock().await = Some(run.clone());
        self.store.clear_best_effort().await;
        self.stage.cleanup(run.campaign_id).await;
        let _ = self.progress_tx.send(ProgressEvent::from_run(&run));
    }

    async fn report(&self, campaign_id: i64, recipient_id: i64, outcome: &SendOutcome) {
        if let Err(err) = self
            .backend
            .report_result(campaign_id, recipient_id, outcome)
            .await
        {
            // Reporting must never block progress.
            warn!(?err, recipient_id, "result report failed");
        }
    }

    async fn notify_lifecycle(&self, campaign_id: i64, event: LifecycleEvent) {
        if let Err(err) = self.backend.notify_lifecycle(campaign_id, event).await {
            warn!(?err, event = event.as_str(), "lifecycle notify failed");
        }
    }
}
