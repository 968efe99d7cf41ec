use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection state of a live subscription as seen by callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Reconnecting { attempt: u32 },
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
        }
    }
}

/// Buffered record counts, one per history kind.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryCounts {
    pub chat: usize,
    pub gift: usize,
    pub like: usize,
    pub roster: usize,
}

/// Counters and counts for one subscription (no payloads).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSummary {
    pub key: String,
    pub room_id: String,
    pub viewer_count: u64,
    pub stream_endpoint: Option<String>,
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
    pub counts: HistoryCounts,
    pub connected_at: DateTime<Utc>,
}

/// Row returned by `list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionListing {
    pub key: String,
    pub room_id: String,
    pub viewer_count: u64,
}

/// Lifecycle notifications published on the gateway event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Connected { key: String, room_id: String },
    Reconnecting { key: String, attempt: u32 },
    Reconnected { key: String, room_id: String },
    Evicted { key: String, attempts: u32 },
    Disconnected { key: String },
}

impl LifecycleEvent {
    pub fn key(&self) -> &str {
        match self {
            Self::Connected { key, .. }
            | Self::Reconnecting { key, .. }
            | Self::Reconnected { key, .. }
            | Self::Evicted { key, .. }
            | Self::Disconnected { key } => key,
        }
    }
}
