use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::required_str;
use crate::manager::ConnectionManager;

pub struct LiveConnect {
    manager: Arc<ConnectionManager>,
}

impl LiveConnect {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl super::ToolExecutor for LiveConnect {
    fn name(&self) -> &str {
        "live_connect"
    }

    fn description(&self) -> &str {
        "Connect to a broadcast that is currently live and start buffering its chat, gifts, \
         likes and viewer joins. Connecting to an already connected broadcast is a no-op."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "Handle of someone who is currently live, starting with @"
                }
            },
            "required": ["key"]
        })
    }

    async fn execute(&self, input: &Value) -> Result<String> {
        let key = required_str(input, "key")?;

        if self.manager.is_connected(key) {
            let summary = self.manager.info(key)?;
            return Ok(format!(
                "Already connected to {key}'s livestream (Room ID: {})",
                summary.room_id
            ));
        }

        let summary = self.manager.connect(key).await?;
        Ok(format!(
            "Successfully connected to {key}'s livestream (Room ID: {}) with stream url {}",
            summary.room_id,
            summary.stream_endpoint.as_deref().unwrap_or("No stream url")
        ))
    }
}
