//! Anti-ban pacing policy for a campaign run.
use chrono::{DateTime, FixedOffset, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Partial rules payload as returned by `GET /bulk_sends/rules`. Every field
/// is optional; absent fields fall back to the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesPatch {
    pub min_delay_sec: Option<u64>,
    pub max_delay_sec: Option<u64>,
    pub pause_after_count: Option<u32>,
    pub pause_duration_min: Option<u64>,
    pub send_hour_start: Option<u32>,
    pub send_hour_end: Option<u32>,
    pub max_daily_messages: Option<u32>,
}

/// Immutable pacing snapshot, loaded once per campaign start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RulesConfig {
    pub min_delay_sec: u64,
    pub max_delay_sec: u64,
    pub pause_after_count: u32,
    pub pause_duration_min: u64,
    pub send_hour_start: u32,
    pub send_hour_end: u32,
    pub max_daily_messages: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            min_delay_sec: 30,
            max_delay_sec: 90,
            pause_after_count: 20,
            pause_duration_min: 5,
            send_hour_start: 8,
            send_hour_end: 20,
            max_daily_messages: 200,
        }
    }
}

impl RulesConfig {
    /// Apply a partial backend payload over the defaults. A max below min is
    /// lifted to min so delay draws stay well-formed.
    pub fn merged(patch: &RulesPatch) -> Self {
        let d = Self::default();
        let min_delay_sec = patch.min_delay_sec.unwrap_or(d.min_delay_sec);
        let max_delay_sec = patch.max_delay_sec.unwrap_or(d.max_delay_sec).max(min_delay_sec);
        Self {
            min_delay_sec,
            max_delay_sec,
            pause_after_count: patch.pause_after_count.unwrap_or(d.pause_after_count),
            pause_duration_min: patch.pause_duration_min.unwrap_or(d.pause_duration_min),
            send_hour_start: patch.send_hour_start.unwrap_or(d.send_hour_start),
            send_hour_end: patch.send_hour_end.unwrap_or(d.send_hour_end),
            max_daily_messages: patch.max_daily_messages.unwrap_or(d.max_daily_messages),
        }
    }

    /// Fresh uniform draw from `[min, max]` seconds.
    pub fn jitter_delay(&self) -> Duration {
        Duration::from_secs(rand::thread_rng().gen_range(self.min_delay_sec..=self.max_delay_sec))
    }

    /// Pacing delay for the next iteration. From the third consecutive
    /// failure onward the jitter draw is doubled, keeping the randomized
    /// characteristic instead of a fixed exponential curve.
    pub fn pacing_delay(&self, consecutive_failures: u32) -> Duration {
        let base = self.jitter_delay();
        if consecutive_failures >= 3 {
            base * 2
        } else {
            base
        }
    }

    /// Short randomized delay after a skipped recipient.
    pub fn skip_delay(&self) -> Duration {
        Duration::from_secs(rand::thread_rng().gen_range(2..=5))
    }

    /// Anti-ban long pause between blocks of successful sends.
    pub fn long_pause(&self) -> Duration {
        Duration::from_secs(self.pause_duration_min * 60)
    }

    /// True when a long pause is due after `sent_in_block` successes since
    /// the previous long pause. Disabled when the cadence is 0.
    pub fn long_pause_due(&self, sent_in_block: u32) -> bool {
        self.pause_after_count > 0 && sent_in_block >= self.pause_after_count
    }

    /// Half-open `[send_hour_start, send_hour_end)` check against civil time
    /// at a fixed UTC offset. Deliberately not a tz-database lookup: the
    /// deployment runs on one fixed offset and the window must not shift
    /// across daylight-saving boundaries.
    pub fn within_send_window(&self, now: DateTime<Utc>, utc_offset_hours: i32) -> bool {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
        let hour = now.with_timezone(&offset).hour();
        hour >= self.send_hour_start && hour < self.send_hour_end
    }

    /// Daily cap check; a cap of 0 disables the limit.
    pub fn daily_cap_reached(&self, daily_sent: u32) -> bool {
        self.max_daily_messages > 0 && daily_sent >= self.max_daily_messages
    }
}
