//! Maps automation-layer failures onto delivery outcomes.
use crate::model::SendOutcome;
use serde::{Deserialize, Serialize};

/// Failure tag supplied by the automation layer on navigation errors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotRegistered,
    NotFound,
    Timeout,
    Selector,
    Unknown,
}

impl ErrorKind {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "not_registered" => ErrorKind::NotRegistered,
            "not_found" => ErrorKind::NotFound,
            "timeout" => ErrorKind::Timeout,
            "selector" => ErrorKind::Selector,
            _ => ErrorKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotRegistered => "not_registered",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Selector => "selector",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// Classify a navigation failure. Lookup misses are skips: the recipient is
/// unreachable but nothing systemic is wrong. Everything else is retryable
/// and feeds the consecutive-failure counter.
pub fn classify_navigation(kind: ErrorKind, message: Option<&str>) -> SendOutcome {
    let detail = |fallback: &str| message.unwrap_or(fallback).to_string();
    match kind {
        ErrorKind::NotRegistered => {
            SendOutcome::Skip(detail("recipient is not registered on the platform"))
        }
        ErrorKind::NotFound => SendOutcome::Skip(detail("recipient chat could not be found")),
        ErrorKind::Timeout => SendOutcome::Retryable(detail("navigation timed out")),
        ErrorKind::Selector => SendOutcome::Retryable(detail("page element not found")),
        ErrorKind::Unknown => SendOutcome::Retryable(detail("navigation failed")),
    }
}

/// A failure during the send step itself is always retryable.
pub fn classify_send(message: Option<&str>) -> SendOutcome {
    SendOutcome::Retryable(message.unwrap_or("send failed").to_string())
}

/// Consecutive retryable/fatal failures that trip the circuit breaker.
/// A hard constant, not runtime-configurable.
pub const CIRCUIT_BREAKER_THRESHOLD: u32 = 5;

/// Phone shape check: trimmed, non-empty, at least 5 characters. Anything
/// shorter cannot be a dialable number on any supported market.
pub fn valid_phone(phone: &str) -> bool {
    phone.trim().len() >= 5
}
