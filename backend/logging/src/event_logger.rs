//! Wire Event Logger
//!
//! Structured records of commands sent and replies received, emitted at
//! `target: "wire_events"` so they can be filtered or routed separately.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::redact::redact_sensitive_data;

pub const WIRE_EVENTS_TARGET: &str = "wire_events";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    CommandSent {
        id: u64,
        name: String,
        params_json: String,
    },
    ResponseReceived {
        id: u64,
        result_json: String,
    },
    RemoteError {
        id: u64,
        kind: String,
        message: Option<String>,
    },
}

impl WireEvent {
    pub fn command_sent(id: u64, name: impl Into<String>, params: &Value) -> Self {
        Self::CommandSent {
            id,
            name: name.into(),
            params_json: params.to_string(),
        }
    }

    pub fn response_received(id: u64, result: &Value) -> Self {
        Self::ResponseReceived {
            id,
            result_json: result.to_string(),
        }
    }

    fn redact(&mut self) {
        match self {
            Self::CommandSent { params_json, .. } => *params_json = redact_sensitive_data(params_json),
            Self::ResponseReceived { result_json, .. } => {
                *result_json = redact_sensitive_data(result_json)
            }
            Self::RemoteError { message, .. } => {
                if let Some(message) = message {
                    *message = redact_sensitive_data(message);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WireEventLogEntry {
    /// Remote end's address, e.g. `localhost:2828`
    pub endpoint: String,
    pub timestamp: DateTime<Utc>,
    pub event: WireEvent,
}

impl WireEventLogEntry {
    /// A timestamped entry with every string payload redacted.
    pub fn new(endpoint: &str, mut event: WireEvent) -> Self {
        event.redact();
        Self {
            endpoint: endpoint.to_string(),
            timestamp: Utc::now(),
            event,
        }
    }

    /// One-line JSON form, as written to the log.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"serializeError\":\"{e}\"}}"))
    }
}

pub struct WireEventLogger;

impl WireEventLogger {
    pub fn log_event(endpoint: &str, event: WireEvent) {
        let entry = WireEventLogEntry::new(endpoint, event);
        info!(
            target: WIRE_EVENTS_TARGET,
            endpoint = %entry.endpoint,
            entry = %entry.to_json(),
            "Wire event"
        );
    }
}
