use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::required_str;
use crate::manager::ConnectionManager;

pub struct LiveStreamUrl {
    manager: Arc<ConnectionManager>,
}

impl LiveStreamUrl {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl super::ToolExecutor for LiveStreamUrl {
    fn name(&self) -> &str {
        "live_stream_url"
    }

    fn description(&self) -> &str {
        "Get the stream url of a broadcast. Does not need to connect first and does not \
         start a subscription."
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
        let url = self.manager.probe_stream_url(key).await?;
        Ok(format!(
            "Stream url for {key} is {}",
            url.as_deref().unwrap_or("No stream url")
        ))
    }
}
