use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::required_str;
use crate::manager::ConnectionManager;

pub struct LiveDisconnect {
    manager: Arc<ConnectionManager>,
}

impl LiveDisconnect {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl super::ToolExecutor for LiveDisconnect {
    fn name(&self) -> &str {
        "live_disconnect"
    }

    fn description(&self) -> &str {
        "Disconnect from a broadcast and drop its buffered history."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "Handle to disconnect from, starting with @"
                }
            },
            "required": ["key"]
        })
    }

    async fn execute(&self, input: &Value) -> Result<String> {
        let key = required_str(input, "key")?;
        self.manager.disconnect(key)?;
        Ok(format!("Successfully disconnected from {key}'s livestream"))
    }
}
