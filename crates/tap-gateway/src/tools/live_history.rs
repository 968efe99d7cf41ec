use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use tap_types::event::EventKind;

use super::{count_param, required_str};
use crate::manager::ConnectionManager;

pub struct LiveHistory {
    manager: Arc<ConnectionManager>,
    default_count: usize,
}

impl LiveHistory {
    pub fn new(manager: Arc<ConnectionManager>, default_count: usize) -> Self {
        Self {
            manager,
            default_count,
        }
    }
}

fn label(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Chat => "messages",
        EventKind::Gift => "gifts",
        EventKind::Like => "likes",
        EventKind::Roster => "viewer joins",
    }
}

#[async_trait]
impl super::ToolExecutor for LiveHistory {
    fn name(&self) -> &str {
        "live_history"
    }

    fn description(&self) -> &str {
        "Get the most recent buffered events of one kind (chat, gift, like or roster) from a \
         connected broadcast, oldest first."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "Handle of a connected broadcast, starting with @"
                },
                "kind": {
                    "type": "string",
                    "enum": ["chat", "gift", "like", "roster"],
                    "description": "Event kind to read. Default: chat."
                },
                "count": {
                    "type": "integer",
                    "description": "Number of events to retrieve (default: 10)"
                },
                "format": {
                    "type": "string",
                    "enum": ["text", "json"],
                    "description": "Output format. Default: text."
                }
            },
            "required": ["key"]
        })
    }

    async fn execute(&self, input: &Value) -> Result<String> {
        let key = required_str(input, "key")?;
        let kind_name = input["kind"].as_str().unwrap_or("chat");
        let count = count_param(input, "count", self.default_count);

        let records = self.manager.history(key, kind_name, count)?;

        if input["format"].as_str() == Some("json") {
            return Ok(serde_json::to_string_pretty(&records)?);
        }

        // Validated by `history` above.
        let kind: EventKind = kind_name.parse().map_err(anyhow::Error::msg)?;
        if records.is_empty() {
            return Ok(format!("No {} yet in {key}'s livestream", label(kind)));
        }
        let lines = records
            .iter()
            .map(|r| r.render_line())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(format!(
            "Recent {} from {key}'s livestream:\n\n{lines}",
            label(kind)
        ))
    }
}
