use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use bulksend::automation::{ChatAutomationPort, NavResult, SendResult};
use bulksend::backend::{BackendService, Dequeued, LifecycleEvent};
use bulksend::controller::{
    SendController, PAUSE_REASON_CONSECUTIVE_FAILURES, PAUSE_REASON_DAILY_LIMIT,
    PAUSE_REASON_SESSION,
};
use bulksend::model::{
    AttachmentRef, CampaignState, MediaKind, RecipientTask, SendOutcome,
};
use bulksend::persist::SnapshotStore;
use bulksend::rules::RulesPatch;
use bulksend::staging::AttachmentStage;

#[derive(Debug, Clone)]
struct Reported {
    recipient_id: i64,
    outcome: SendOutcome,
}

#[derive(Default)]
struct FakeBackend {
    rules: RulesPatch,
    queue: Mutex<VecDeque<RecipientTask>>,
    total: Option<u32>,
    reports: Mutex<Vec<Reported>>,
    lifecycle: Mutex<Vec<LifecycleEvent>>,
    dequeue_calls: AtomicU32,
    /// Fail this many dequeues before serving the queue.
    dequeue_failures: AtomicU32,
}

impl FakeBackend {
    fn with_rules(rules: RulesPatch) -> Self {
        Self {
            rules,
            ..Default::default()
        }
    }

    async fn push_tasks(&self, tasks: Vec<RecipientTask>) {
        self.queue.lock().await.extend(tasks);
    }

    async fn reports(&self) -> Vec<Reported> {
        self.reports.lock().await.clone()
    }

    async fn lifecycle(&self) -> Vec<LifecycleEvent> {
        self.lifecycle.lock().await.clone()
    }

    fn dequeues(&self) -> u32 {
        self.dequeue_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendService for FakeBackend {
    async fn fetch_rules(&self) -> Result<RulesPatch> {
        Ok(self.rules.clone())
    }

    async fn next_recipient(&self, _campaign_id: i64) -> Result<Dequeued> {
        self.dequeue_calls.fetch_add(1, Ordering::SeqCst);
        if self.dequeue_failures.load(Ordering::SeqCst) > 0 {
            self.dequeue_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(anyhow!("backend unavailable"));
        }
        let task = self.queue.lock().await.pop_front();
        Ok(Dequeued {
            task,
            total_recipients: self.total,
        })
    }

    async fn report_result(
        &self,
        _campaign_id: i64,
        recipient_id: i64,
        outcome: &SendOutcome,
    ) -> Result<()> {
        self.reports.lock().await.push(Reported {
            recipient_id,
            outcome: outcome.clone(),
        });
        Ok(())
    }

    async fn notify_lifecycle(&self, _campaign_id: i64, event: LifecycleEvent) -> Result<()> {
        self.lifecycle.lock().await.push(event);
        Ok(())
    }
}

#[derive(Default)]
struct FakePort {
    session_ok: AtomicBool,
    nav_results: Mutex<VecDeque<NavResult>>,
    send_results: Mutex<VecDeque<SendResult>>,
    nav_calls: Mutex<Vec<String>>,
    text_calls: Mutex<Vec<String>>,
    media_calls: Mutex<Vec<(PathBuf, String)>>,
}

impl FakePort {
    fn healthy() -> Self {
        let port = Self::default();
        port.session_ok.store(true, Ordering::SeqCst);
        port
    }

    async fn script_nav(&self, results: Vec<NavResult>) {
        self.nav_results.lock().await.extend(results);
    }

    async fn script_send(&self, results: Vec<SendResult>) {
        self.send_results.lock().await.extend(results);
    }

    async fn nav_calls(&self) -> Vec<String> {
        self.nav_calls.lock().await.clone()
    }

    async fn text_calls(&self) -> Vec<String> {
        self.text_calls.lock().await.clone()
    }

    async fn media_calls(&self) -> Vec<(PathBuf, String)> {
        self.media_calls.lock().await.clone()
    }
}

#[async_trait]
impl ChatAutomationPort for FakePort {
    async fn check_session(&self) -> Result<bool> {
        Ok(self.session_ok.load(Ordering::SeqCst))
    }

    async fn reset_to_home(&self) -> Result<bool> {
        Ok(true)
    }

    async fn navigate_to_recipient(&self, phone: &str) -> Result<NavResult> {
        self.nav_calls.lock().await.push(phone.to_string());
        Ok(self
            .nav_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(NavResult::success))
    }

    async fn send_text(&self, text: &str) -> Result<SendResult> {
        self.text_calls.lock().await.push(text.to_string());
        Ok(self
            .send_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(SendResult::success))
    }

    async fn send_media(
        &self,
        local_path: &std::path::Path,
        caption: &str,
        _kind: MediaKind,
    ) -> Result<SendResult> {
        self.media_calls
            .lock()
            .await
            .push((local_path.to_path_buf(), caption.to_string()));
        Ok(self
            .send_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(SendResult::success))
    }
}

/// Pacing that keeps tests fast under paused tokio time: zero jitter, no
/// long pause, full-day window, no daily cap.
fn fast_rules() -> RulesPatch {
    RulesPatch {
        min_delay_sec: Some(0),
        max_delay_sec: Some(0),
        pause_after_count: Some(0),
        pause_duration_min: Some(0),
        send_hour_start: Some(0),
        send_hour_end: Some(24),
        max_daily_messages: Some(0),
    }
}

fn task(id: i64, phone: &str) -> RecipientTask {
    RecipientTask {
        recipient_id: id,
        phone: phone.to_string(),
        content: format!("message {id}"),
        attachment: None,
    }
}

/// Open a file-backed snapshot store for tests. Everything that can block on
/// a real thread (opening connections, health checks) happens here on real
/// time: under the paused clock, sqlx's acquire timeout auto-advances and
/// fires whenever an acquire has to wait, so mid-test acquires must always
/// find an idle, pre-opened connection.
async fn test_store(td: &tempfile::TempDir) -> SnapshotStore {
    tokio::time::resume();
    let url = format!("sqlite://{}/snapshot.db?mode=rwc", td.path().display());
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(3)
        .test_before_acquire(false)
        .connect(&url)
        .await
        .unwrap();
    let mut warm = Vec::new();
    for _ in 0..3 {
        warm.push(pool.acquire().await.unwrap());
    }
    drop(warm);
    let store = SnapshotStore::init(pool).await.unwrap();
    tokio::time::pause();
    store
}

async fn setup(
    backend: Arc<FakeBackend>,
    port: Arc<FakePort>,
) -> (Arc<SendController>, SnapshotStore, tempfile::TempDir) {
    let td = tempfile::tempdir().unwrap();
    let store = test_store(&td).await;
    let stage = AttachmentStage::new(td.path().to_str().unwrap());
    let ctl = SendController::new(backend, port, store.clone(), stage, 0);
    (ctl, store, td)
}

// Scenario A: three recipients, all succeed.
#[tokio::test(start_paused = true)]
async fn completes_clean_campaign() {
    let backend = Arc::new(FakeBackend::with_rules(fast_rules()));
    backend
        .push_tasks(vec![
            task(1, "5511988880001"),
            task(2, "5511988880002"),
            task(3, "5511988880003"),
        ])
        .await;
    let port = Arc::new(FakePort::healthy());
    let (ctl, store, _td) = setup(backend.clone(), port.clone()).await;

    ctl.start(100).unwrap().await.unwrap();

    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.state, CampaignState::Completed);
    assert_eq!(run.sent_count, 3);
    assert_eq!(run.failed_count, 0);
    assert_eq!(port.text_calls().await.len(), 3);
    // Terminal state clears the snapshot.
    assert!(store.load().await.unwrap().is_none());

    let reports = backend.reports().await;
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.outcome == SendOutcome::Success));
}

// Scenario B: a not_found recipient is skipped without touching the streak.
#[tokio::test(start_paused = true)]
async fn not_found_is_skip_not_failure_streak() {
    let backend = Arc::new(FakeBackend::with_rules(fast_rules()));
    backend
        .push_tasks(vec![task(1, "5511988880001"), task(2, "5511988880002")])
        .await;
    let port = Arc::new(FakePort::healthy());
    port.script_nav(vec![NavResult::failure("not_found", "no chat for number")])
        .await;
    let (ctl, _store, _td) = setup(backend.clone(), port.clone()).await;

    ctl.start(100).unwrap().await.unwrap();

    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.state, CampaignState::Completed);
    assert_eq!(run.sent_count, 1);
    assert_eq!(run.failed_count, 1);
    assert_eq!(run.consecutive_failures, 0);

    let reports = backend.reports().await;
    assert_eq!(reports[0].recipient_id, 1);
    assert_eq!(
        reports[0].outcome,
        SendOutcome::Skip("no chat for number".into())
    );
    assert_eq!(reports[1].outcome, SendOutcome::Success);
}

// P1 / Scenario C: five consecutive timeouts trip the circuit breaker.
#[tokio::test(start_paused = true)]
async fn circuit_breaker_pauses_after_five_failures() {
    let backend = Arc::new(FakeBackend::with_rules(fast_rules()));
    backend
        .push_tasks((1..=8).map(|i| task(i, &format!("551198888{i:04}"))).collect())
        .await;
    let port = Arc::new(FakePort::healthy());
    port.script_nav(
        (0..5)
            .map(|_| NavResult::failure("timeout", "navigation timed out"))
            .collect(),
    )
    .await;
    let (ctl, store, _td) = setup(backend.clone(), port.clone()).await;

    ctl.start(100).unwrap().await.unwrap();

    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.state, CampaignState::Paused);
    assert_eq!(run.last_error.as_deref(), Some(PAUSE_REASON_CONSECUTIVE_FAILURES));
    assert_eq!(run.consecutive_failures, 5);
    // No sixth dequeue after the breaker trips.
    assert_eq!(backend.dequeues(), 5);
    // Paused snapshot stays on disk for the operator.
    let snap = store.load().await.unwrap().unwrap();
    assert_eq!(snap.state, CampaignState::Paused);
    assert_eq!(snap.failed_count, 5);
    // The backend was told about the auto-pause.
    assert!(backend.lifecycle().await.contains(&LifecycleEvent::Pause));
}

// P2: skips never feed the circuit breaker, even many in a row.
#[tokio::test(start_paused = true)]
async fn hundred_skips_never_trip_breaker() {
    let backend = Arc::new(FakeBackend::with_rules(fast_rules()));
    backend
        .push_tasks((1..=100).map(|i| task(i, &format!("55119{i:07}"))).collect())
        .await;
    let port = Arc::new(FakePort::healthy());
    port.script_nav(
        (0..100)
            .map(|_| NavResult::failure("not_registered", "not on platform"))
            .collect(),
    )
    .await;
    let (ctl, _store, _td) = setup(backend.clone(), port.clone()).await;

    ctl.start(100).unwrap().await.unwrap();

    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.state, CampaignState::Completed);
    assert_eq!(run.failed_count, 100);
    assert_eq!(run.consecutive_failures, 0);
}

// P3: the daily cap halts before the next dequeue.
#[tokio::test(start_paused = true)]
async fn daily_cap_pauses_before_dequeue() {
    let rules = RulesPatch {
        max_daily_messages: Some(2),
        ..fast_rules()
    };
    let backend = Arc::new(FakeBackend::with_rules(rules));
    backend
        .push_tasks(vec![
            task(1, "5511988880001"),
            task(2, "5511988880002"),
            task(3, "5511988880003"),
        ])
        .await;
    let port = Arc::new(FakePort::healthy());
    let (ctl, _store, _td) = setup(backend.clone(), port.clone()).await;

    ctl.start(100).unwrap().await.unwrap();

    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.state, CampaignState::Paused);
    assert_eq!(run.last_error.as_deref(), Some(PAUSE_REASON_DAILY_LIMIT));
    assert_eq!(run.sent_count, 2);
    assert_eq!(backend.dequeues(), 2);
}

// The daily counter survives across campaigns within one process.
#[tokio::test(start_paused = true)]
async fn daily_budget_shared_across_campaigns() {
    let rules = RulesPatch {
        max_daily_messages: Some(3),
        ..fast_rules()
    };
    let backend = Arc::new(FakeBackend::with_rules(rules));
    backend
        .push_tasks(vec![task(1, "5511988880001"), task(2, "5511988880002")])
        .await;
    let port = Arc::new(FakePort::healthy());
    let (ctl, _store, _td) = setup(backend.clone(), port.clone()).await;

    ctl.start(100).unwrap().await.unwrap();
    assert_eq!(
        ctl.current_run().await.unwrap().state,
        CampaignState::Completed
    );

    // Second campaign only has one message left in today's budget.
    backend
        .push_tasks(vec![task(3, "5511988880003"), task(4, "5511988880004")])
        .await;
    ctl.start(101).unwrap().await.unwrap();

    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.campaign_id, 101);
    assert_eq!(run.state, CampaignState::Paused);
    assert_eq!(run.last_error.as_deref(), Some(PAUSE_REASON_DAILY_LIMIT));
    assert_eq!(run.sent_count, 1);
    assert_eq!(run.daily_sent_count, 3);
}

// P4: outside the send window nothing is dequeued or sent.
#[tokio::test(start_paused = true)]
async fn window_idles_without_dequeuing() {
    let rules = RulesPatch {
        // Empty half-open window: never inside it.
        send_hour_start: Some(0),
        send_hour_end: Some(0),
        ..fast_rules()
    };
    let backend = Arc::new(FakeBackend::with_rules(rules));
    backend.push_tasks(vec![task(1, "5511988880001")]).await;
    let port = Arc::new(FakePort::healthy());
    let (ctl, _store, _td) = setup(backend.clone(), port.clone()).await;

    let handle = ctl.start(100).unwrap();
    // Let several idle iterations elapse (60 s steps under paused time).
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(backend.dequeues(), 0);
    assert!(port.nav_calls().await.is_empty());

    // Cancel is honored at the top of the next idle iteration.
    ctl.cancel().await;
    handle.await.unwrap();
    assert_eq!(
        ctl.current_run().await.unwrap().state,
        CampaignState::Cancelled
    );
}

// P5: the snapshot is written through on every count-changing event. The
// write happens before the progress broadcast, so when an event is observed
// the snapshot already covers at least those counts.
#[tokio::test(start_paused = true)]
async fn snapshot_tracks_every_event() {
    let backend = Arc::new(FakeBackend {
        rules: fast_rules(),
        total: Some(3),
        ..Default::default()
    });
    backend
        .push_tasks(vec![
            task(1, "5511988880001"),
            task(2, "5511988880002"),
            task(3, "5511988880003"),
        ])
        .await;
    let port = Arc::new(FakePort::healthy());
    port.script_nav(vec![
        NavResult::success(),
        NavResult::failure("not_found", "gone"),
        NavResult::failure("timeout", "slow"),
    ])
    .await;
    let (ctl, store, _td) = setup(backend.clone(), port.clone()).await;

    let mut progress = ctl.subscribe();
    let handle = ctl.start(100).unwrap();

    loop {
        let ev = progress.recv().await.unwrap();
        if ev.state.is_terminal() {
            break;
        }
        if ev.sent_count + ev.failed_count == 0 {
            continue;
        }
        let snap = store.load().await.unwrap().unwrap();
        assert!(snap.sent_count >= ev.sent_count);
        assert!(snap.failed_count >= ev.failed_count);
        assert_eq!(snap.total_recipients, 3);
    }
    handle.await.unwrap();

    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.state, CampaignState::Completed);
    assert_eq!(run.sent_count, 1);
    assert_eq!(run.failed_count, 2);
    assert_eq!(run.total_recipients, 3);
    assert!(store.load().await.unwrap().is_none());
}

// Scenario D: operator pause, then resume re-validates the session first.
#[tokio::test(start_paused = true)]
async fn pause_then_resume_revalidates_session() {
    let rules = RulesPatch {
        min_delay_sec: Some(1),
        max_delay_sec: Some(1),
        ..fast_rules()
    };
    let backend = Arc::new(FakeBackend::with_rules(rules));
    backend
        .push_tasks((1..=1000).map(|i| task(i, &format!("55119{i:07}"))).collect())
        .await;
    let port = Arc::new(FakePort::healthy());
    let (ctl, _store, _td) = setup(backend.clone(), port.clone()).await;

    let mut progress = ctl.subscribe();
    let handle = ctl.start(100).unwrap();

    // Wait for the first delivery, then ask for a pause.
    loop {
        match progress.recv().await {
            Ok(ev) if ev.sent_count >= 1 => break,
            Ok(_) => {}
            Err(_) => break,
        }
    }
    ctl.pause().await;
    handle.await.unwrap();

    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.state, CampaignState::Paused);
    assert!(backend.dequeues() < 1000);
    assert!(backend.lifecycle().await.contains(&LifecycleEvent::Pause));
    let sent_at_pause = run.sent_count;

    // Session died while paused: resume must re-check before dequeuing.
    port.session_ok.store(false, Ordering::SeqCst);
    let dequeues_before = backend.dequeues();
    ctl.resume().await.unwrap().await.unwrap();

    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.state, CampaignState::Paused);
    assert_eq!(run.last_error.as_deref(), Some(PAUSE_REASON_SESSION));
    assert_eq!(backend.dequeues(), dequeues_before);

    // Session restored: resume drains the queue.
    port.session_ok.store(true, Ordering::SeqCst);
    ctl.resume().await.unwrap().await.unwrap();
    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.state, CampaignState::Completed);
    assert!(run.sent_count > sent_at_pause);
    assert!(backend.lifecycle().await.contains(&LifecycleEvent::Resume));
}

#[tokio::test(start_paused = true)]
async fn invalid_session_at_start_pauses_with_reason() {
    let backend = Arc::new(FakeBackend::with_rules(fast_rules()));
    backend.push_tasks(vec![task(1, "5511988880001")]).await;
    let port = Arc::new(FakePort::default()); // session_ok = false
    let (ctl, store, _td) = setup(backend.clone(), port.clone()).await;

    ctl.start(100).unwrap().await.unwrap();

    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.state, CampaignState::Paused);
    assert_eq!(run.last_error.as_deref(), Some(PAUSE_REASON_SESSION));
    assert_eq!(backend.dequeues(), 0);
    // Snapshot kept so the operator can see why the run stopped.
    assert!(store.load().await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn malformed_phone_is_skipped_without_navigation() {
    let backend = Arc::new(FakeBackend::with_rules(fast_rules()));
    backend
        .push_tasks(vec![task(1, "123"), task(2, "5511988880002")])
        .await;
    let port = Arc::new(FakePort::healthy());
    let (ctl, _store, _td) = setup(backend.clone(), port.clone()).await;

    ctl.start(100).unwrap().await.unwrap();

    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.state, CampaignState::Completed);
    assert_eq!(run.sent_count, 1);
    assert_eq!(run.failed_count, 1);
    assert_eq!(run.consecutive_failures, 0);
    // The bad number never reached the automation surface.
    assert_eq!(port.nav_calls().await, vec!["5511988880002".to_string()]);

    let reports = backend.reports().await;
    assert_eq!(
        reports[0].outcome,
        SendOutcome::Skip("invalid phone number".into())
    );
}

#[tokio::test(start_paused = true)]
async fn second_start_fails_fast() {
    let rules = RulesPatch {
        min_delay_sec: Some(1),
        max_delay_sec: Some(1),
        ..fast_rules()
    };
    let backend = Arc::new(FakeBackend::with_rules(rules));
    backend
        .push_tasks((1..=500).map(|i| task(i, &format!("55119{i:07}"))).collect())
        .await;
    let port = Arc::new(FakePort::healthy());
    let (ctl, _store, _td) = setup(backend.clone(), port.clone()).await;

    let handle = ctl.start(100).unwrap();
    let err = ctl.start(200).unwrap_err();
    assert!(err.to_string().contains("already running"));

    ctl.cancel().await;
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn dequeue_errors_are_swallowed() {
    let backend = Arc::new(FakeBackend {
        rules: fast_rules(),
        dequeue_failures: AtomicU32::new(2),
        ..Default::default()
    });
    backend.push_tasks(vec![task(1, "5511988880001")]).await;
    let port = Arc::new(FakePort::healthy());
    let (ctl, _store, _td) = setup(backend.clone(), port.clone()).await;

    ctl.start(100).unwrap().await.unwrap();

    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.state, CampaignState::Completed);
    assert_eq!(run.sent_count, 1);
    // Two failed dequeues, one successful, one end-of-queue.
    assert_eq!(backend.dequeues(), 4);
}

#[tokio::test(start_paused = true)]
async fn send_failure_is_retryable() {
    let backend = Arc::new(FakeBackend::with_rules(fast_rules()));
    backend
        .push_tasks(vec![task(1, "5511988880001"), task(2, "5511988880002")])
        .await;
    let port = Arc::new(FakePort::healthy());
    port.script_send(vec![SendResult::failure("clipboard paste failed")])
        .await;
    let (ctl, _store, _td) = setup(backend.clone(), port.clone()).await;

    ctl.start(100).unwrap().await.unwrap();

    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.state, CampaignState::Completed);
    assert_eq!(run.sent_count, 1);
    assert_eq!(run.failed_count, 1);

    let reports = backend.reports().await;
    assert_eq!(
        reports[0].outcome,
        SendOutcome::Retryable("clipboard paste failed".into())
    );
}

// Media campaign: staged file reused per recipient, removed on completion.
#[tokio::test(start_paused = true)]
async fn media_campaign_uses_staged_attachment() {
    let backend = Arc::new(FakeBackend::with_rules(fast_rules()));
    let attachment = AttachmentRef {
        // Never fetched: the file is pre-staged below.
        url: "http://192.0.2.1/promo.jpg".into(),
        name: "promo.jpg".into(),
        kind: MediaKind::Image,
    };
    backend
        .push_tasks(vec![
            RecipientTask {
                attachment: Some(attachment.clone()),
                ..task(1, "5511988880001")
            },
            RecipientTask {
                attachment: Some(attachment),
                ..task(2, "5511988880002")
            },
        ])
        .await;
    let port = Arc::new(FakePort::healthy());

    let td = tempfile::tempdir().unwrap();
    let store = test_store(&td).await;
    let staged_dir = td.path().join("staging").join("100");
    tokio::fs::create_dir_all(&staged_dir).await.unwrap();
    tokio::fs::write(staged_dir.join("promo.jpg"), b"jpeg").await.unwrap();
    let stage = AttachmentStage::new(td.path().to_str().unwrap());
    let ctl = SendController::new(backend.clone(), port.clone(), store, stage, 0);

    ctl.start(100).unwrap().await.unwrap();

    let run = ctl.current_run().await.unwrap();
    assert_eq!(run.state, CampaignState::Completed);
    assert_eq!(run.sent_count, 2);

    let media = port.media_calls().await;
    assert_eq!(media.len(), 2);
    assert_eq!(media[0].0, media[1].0);
    assert_eq!(media[0].1, "message 1");
    // Terminal state removes the staging directory.
    assert!(!staged_dir.exists());
}

// Resume with nothing paused is rejected.
#[tokio::test(start_paused = true)]
async fn resume_without_paused_campaign_fails() {
    let backend = Arc::new(FakeBackend::with_rules(fast_rules()));
    let port = Arc::new(FakePort::healthy());
    let (ctl, _store, _td) = setup(backend, port).await;

    let err = ctl.resume().await.unwrap_err();
    assert!(err.to_string().contains("no paused campaign"));
}
