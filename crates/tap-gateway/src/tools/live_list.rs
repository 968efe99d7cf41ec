use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::manager::ConnectionManager;

pub struct LiveList {
    manager: Arc<ConnectionManager>,
}

impl LiveList {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl super::ToolExecutor for LiveList {
    fn name(&self) -> &str {
        "live_list"
    }

    fn description(&self) -> &str {
        "List every connected broadcast with its room ID and viewer count."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _input: &Value) -> Result<String> {
        let rows = self.manager.list();
        if rows.is_empty() {
            return Ok("No active connections to any livestreams".to_string());
        }
        let lines = rows
            .iter()
            .map(|r| format!("{} (Room ID: {}, Viewers: {})", r.key, r.room_id, r.viewer_count))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(format!("Active livestream connections:\n\n{lines}"))
    }
}
