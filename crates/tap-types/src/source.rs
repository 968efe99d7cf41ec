//! Types exchanged with an event source: the handshake result and the raw
//! events it emits, plus the NDJSON envelope a connector bridge writes.

use serde::{Deserialize, Serialize};

use crate::event::{EventPayload, EventRecord, UserIdentity};

/// Result of a successful connect exchange with the platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Handshake {
    pub room_id: String,
    #[serde(default)]
    pub viewer_count: u64,
    #[serde(default)]
    pub stream_endpoint: Option<String>,
}

/// Raw upstream event, before the gateway stamps and buffers it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceEvent {
    Chat {
        #[serde(flatten)]
        user: UserIdentity,
        comment: String,
    },
    Gift {
        #[serde(flatten)]
        user: UserIdentity,
        gift_id: u64,
        #[serde(default)]
        gift_name: String,
        #[serde(default)]
        diamond_count: u64,
        #[serde(default = "one")]
        repeat_count: u32,
    },
    Like {
        #[serde(flatten)]
        user: UserIdentity,
        #[serde(default = "one")]
        like_count: u32,
    },
    /// A viewer joined; carries the room's current viewer count.
    Roster {
        #[serde(flatten)]
        user: UserIdentity,
        viewer_count: u64,
    },
    Disconnected,
    Error {
        message: String,
    },
}

fn one() -> u32 {
    1
}

impl SourceEvent {
    /// Whether this event ends the current connection epoch.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Error { .. })
    }

    /// Convert into a buffered record with a fresh capture timestamp.
    /// Terminal signals have no record.
    pub fn into_record(self) -> Option<EventRecord> {
        let (user, payload) = match self {
            Self::Chat { user, comment } => (user, EventPayload::Chat { comment }),
            Self::Gift {
                user,
                gift_id,
                gift_name,
                diamond_count,
                repeat_count,
            } => (
                user,
                EventPayload::Gift {
                    gift_id,
                    gift_name,
                    diamond_count,
                    repeat_count,
                },
            ),
            Self::Like { user, like_count } => (user, EventPayload::Like { like_count }),
            Self::Roster { user, .. } => (user, EventPayload::Roster),
            Self::Disconnected | Self::Error { .. } => return None,
        };
        Some(EventRecord::capture(user, payload))
    }
}

/// One NDJSON line written by a connector bridge process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
    Handshake(Handshake),
    Event { event: SourceEvent },
}
