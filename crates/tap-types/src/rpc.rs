use serde::{Deserialize, Serialize};

use crate::subscription::LifecycleEvent;
use crate::tool::{ToolInfo, ToolResult};

/// Client → Server, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientToServer {
    ListTools {
        id: String,
    },
    Call {
        id: String,
        tool: String,
        #[serde(default)]
        input: serde_json::Value,
    },
}

/// Server → Client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerToClient {
    Tools {
        id: String,
        tools: Vec<ToolInfo>,
    },
    Result {
        id: String,
        result: ToolResult,
    },
    /// The request line itself could not be understood.
    Error {
        id: Option<String>,
        message: String,
    },
    /// Unsolicited lifecycle change of a subscription.
    Notification {
        event: LifecycleEvent,
    },
}
