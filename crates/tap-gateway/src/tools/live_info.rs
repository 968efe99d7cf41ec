use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::required_str;
use crate::manager::ConnectionManager;

pub struct LiveInfo {
    manager: Arc<ConnectionManager>,
}

impl LiveInfo {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl super::ToolExecutor for LiveInfo {
    fn name(&self) -> &str {
        "live_info"
    }

    fn description(&self) -> &str {
        "Show room ID, viewer count, connection state and buffered event counts for a connected broadcast."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "Handle of a connected broadcast, starting with @"
                }
            },
            "required": ["key"]
        })
    }

    async fn execute(&self, input: &Value) -> Result<String> {
        let key = required_str(input, "key")?;
        let s = self.manager.info(key)?;
        Ok(format!(
            "Stream information for {key}:\n\n\
             Room ID: {}\n\
             Viewers: {}\n\
             State: {}\n\
             Reconnect attempts: {}\n\
             Stream URL: {}\n\
             Connected since: {}\n\
             Total Messages: {}\n\
             Total Gifts: {}\n\
             Total Likes: {}\n\
             Total Users: {}\n",
            s.room_id,
            s.viewer_count,
            s.state,
            s.reconnect_attempts,
            s.stream_endpoint.as_deref().unwrap_or("No stream url"),
            s.connected_at.to_rfc3339(),
            s.counts.chat,
            s.counts.gift,
            s.counts.like,
            s.counts.roster,
        ))
    }
}
