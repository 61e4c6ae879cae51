use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CampaignState {
    Idle,
    Running,
    Paused,
    Cancelled,
    Completed,
    Error,
}

impl CampaignState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignState::Idle => "idle",
            CampaignState::Running => "running",
            CampaignState::Paused => "paused",
            CampaignState::Cancelled => "cancelled",
            CampaignState::Completed => "completed",
            CampaignState::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(CampaignState::Idle),
            "running" => Some(CampaignState::Running),
            "paused" => Some(CampaignState::Paused),
            "cancelled" => Some(CampaignState::Cancelled),
            "completed" => Some(CampaignState::Completed),
            "error" => Some(CampaignState::Error),
            _ => None,
        }
    }

    /// Terminal states clear the persisted snapshot and release the campaign.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignState::Completed | CampaignState::Cancelled)
    }
}

/// Working state of one campaign run. Immutable value: the controller holds a
/// single current instance and replaces it through the transition helpers
/// below, so every transition is testable without a live automation surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignRun {
    pub campaign_id: i64,
    pub state: CampaignState,
    pub sent_count: u32,
    pub failed_count: u32,
    pub total_recipients: u32,
    pub consecutive_failures: u32,
    pub daily_sent_count: u32,
    pub current_phone: Option<String>,
    pub last_error: Option<String>,
}

impl CampaignRun {
    pub fn new(campaign_id: i64, total_recipients: u32, daily_sent_count: u32) -> Self {
        Self {
            campaign_id,
            state: CampaignState::Running,
            sent_count: 0,
            failed_count: 0,
            total_recipients,
            consecutive_failures: 0,
            daily_sent_count,
            current_phone: None,
            last_error: None,
        }
    }

    pub fn with_state(self, state: CampaignState) -> Self {
        Self { state, ..self }
    }

    /// The backend reports the queue size on dequeue; record it when known.
    pub fn with_total(self, total_recipients: u32) -> Self {
        Self {
            total_recipients,
            ..self
        }
    }

    pub fn at_recipient(self, phone: &str) -> Self {
        Self {
            current_phone: Some(phone.to_string()),
            ..self
        }
    }

    /// A delivered message: resets the consecutive-failure streak.
    pub fn record_success(self) -> Self {
        Self {
            sent_count: self.sent_count + 1,
            daily_sent_count: self.daily_sent_count + 1,
            consecutive_failures: 0,
            ..self
        }
    }

    /// A skipped recipient counts as failed but carries no systemic signal,
    /// so the failure streak is left untouched.
    pub fn record_skip(self) -> Self {
        Self {
            failed_count: self.failed_count + 1,
            ..self
        }
    }

    pub fn record_retryable(self, message: &str) -> Self {
        Self {
            failed_count: self.failed_count + 1,
            consecutive_failures: self.consecutive_failures + 1,
            last_error: Some(message.to_string()),
            ..self
        }
    }

    pub fn paused(self, reason: &str) -> Self {
        Self {
            state: CampaignState::Paused,
            last_error: Some(reason.to_string()),
            ..self
        }
    }

    pub fn resumed(self) -> Self {
        Self {
            state: CampaignState::Running,
            ..self
        }
    }

    pub fn cancelled(self) -> Self {
        Self {
            state: CampaignState::Cancelled,
            current_phone: None,
            ..self
        }
    }

    pub fn completed(self) -> Self {
        Self {
            state: CampaignState::Completed,
            current_phone: None,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentRef {
    pub url: String,
    pub name: String,
    pub kind: MediaKind,
}

/// One recipient dequeued from the backend. Lives for a single loop
/// iteration; never persisted locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientTask {
    pub recipient_id: i64,
    pub phone: String,
    pub content: String,
    pub attachment: Option<AttachmentRef>,
}

/// Result of one delivery attempt, driving both the backend report and the
/// controller's failure counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Success,
    Skip(String),
    Retryable(String),
    Fatal(String),
}

impl SendOutcome {
    pub fn error_message(&self) -> Option<&str> {
        match self {
            SendOutcome::Success => None,
            SendOutcome::Skip(m) | SendOutcome::Retryable(m) | SendOutcome::Fatal(m) => Some(m),
        }
    }
}

/// Snapshot pushed to the UI layer on every state- or count-changing event.
/// Delivery is at-least-once; consumers must tolerate duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressEvent {
    pub state: CampaignState,
    pub sent_count: u32,
    pub failed_count: u32,
    pub total_recipients: u32,
    pub current_phone: Option<String>,
    pub last_error: Option<String>,
}

impl ProgressEvent {
    pub fn from_run(run: &CampaignRun) -> Self {
        Self {
            state: run.state,
            sent_count: run.sent_count,
            failed_count: run.failed_count,
            total_recipients: run.total_recipients,
            current_phone: run.current_phone.clone(),
            last_error: run.last_error.clone(),
        }
    }
}
