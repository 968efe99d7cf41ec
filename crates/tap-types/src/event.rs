use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The fixed set of history kinds buffered per subscription.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Chat,
    Gift,
    Like,
    Roster,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [Self::Chat, Self::Gift, Self::Like, Self::Roster];
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::Gift => write!(f, "gift"),
            Self::Like => write!(f, "like"),
            Self::Roster => write!(f, "roster"),
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" | "messages" => Ok(Self::Chat),
            "gift" | "gifts" => Ok(Self::Gift),
            "like" | "likes" => Ok(Self::Like),
            "roster" | "users" | "viewers" => Ok(Self::Roster),
            _ => Err(format!("unknown event kind: {s}")),
        }
    }
}

/// Who triggered an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdentity {
    #[serde(default)]
    pub unique_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub nickname: String,
}

/// Kind-specific part of a buffered event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    Chat {
        comment: String,
    },
    Gift {
        gift_id: u64,
        gift_name: String,
        diamond_count: u64,
        repeat_count: u32,
    },
    Like {
        like_count: u32,
    },
    Roster,
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Chat { .. } => EventKind::Chat,
            Self::Gift { .. } => EventKind::Gift,
            Self::Like { .. } => EventKind::Like,
            Self::Roster => EventKind::Roster,
        }
    }
}

/// A buffered event. `captured_at` is stamped on receipt, never copied from
/// upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub user: UserIdentity,
    #[serde(flatten)]
    pub payload: EventPayload,
    pub captured_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn capture(user: UserIdentity, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            payload,
            captured_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// One-line rendering used by the history tools.
    pub fn render_line(&self) -> String {
        let ts = self.captured_at.to_rfc3339();
        let who = &self.user.unique_id;
        match &self.payload {
            EventPayload::Chat { comment } => format!("{ts} - {who}: {comment}"),
            EventPayload::Gift {
                gift_id,
                gift_name,
                diamond_count,
                repeat_count,
            } => format!(
                "{ts} - {who}: Gift {gift_name} (ID: {gift_id}) x{repeat_count}, Diamond Value: {diamond_count}"
            ),
            EventPayload::Like { like_count } => format!("{ts} - {who}: {like_count} likes"),
            EventPayload::Roster => format!("{ts} - {who} ({})", self.user.nickname),
        }
    }
}
