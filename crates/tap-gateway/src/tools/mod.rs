pub mod live_connect;
pub mod live_disconnect;
pub mod live_history;
pub mod live_info;
pub mod live_list;
pub mod live_stream_url;
pub mod video_list;
pub mod video_play;
pub mod video_record;
pub mod video_stop;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use tap_types::tool::{ToolCall, ToolInfo, ToolResult};

use crate::manager::ConnectionManager;
use crate::process_manager::ProcessManager;

/// Tool executor trait. Each tool implements this.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn execute(&self, input: &Value) -> Result<String>;
}

/// Registry of available tools.
pub struct ToolRegistry {
    tools: Vec<Box<dyn ToolExecutor>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: vec![] }
    }

    /// Create a registry with every subscription and media tool.
    pub fn with_default_tools(
        manager: Arc<ConnectionManager>,
        processes: ProcessManager,
        default_count: usize,
    ) -> Self {
        let mut reg = Self::new();
        reg.register(Box::new(live_connect::LiveConnect::new(manager.clone())));
        reg.register(Box::new(live_disconnect::LiveDisconnect::new(manager.clone())));
        reg.register(Box::new(live_list::LiveList::new(manager.clone())));
        reg.register(Box::new(live_info::LiveInfo::new(manager.clone())));
        reg.register(Box::new(live_history::LiveHistory::new(
            manager.clone(),
            default_count,
        )));
        reg.register(Box::new(live_stream_url::LiveStreamUrl::new(manager)));
        reg.register(Box::new(video_play::VideoPlay::new(processes.clone())));
        reg.register(Box::new(video_record::VideoRecord::new(processes.clone())));
        reg.register(Box::new(video_list::VideoList::new(processes.clone())));
        reg.register(Box::new(video_stop::VideoStop::new(processes)));
        reg
    }

    pub fn register(&mut self, tool: Box<dyn ToolExecutor>) {
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn ToolExecutor> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    /// Execute a tool call, returning a ToolResult. Never fails: every error
    /// becomes an `is_error` result carrying its message.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let result = match self.get(&call.name) {
            Some(tool) => tool.execute(&call.input).await,
            None => Err(anyhow::anyhow!("Unknown tool: {}", call.name)),
        };

        match result {
            Ok(output) => ToolResult {
                tool_call_id: call.id.clone(),
                content: output,
                is_error: false,
            },
            Err(e) => ToolResult {
                tool_call_id: call.id.clone(),
                content: e.to_string(),
                is_error: true,
            },
        }
    }

    /// Tool definitions for a client's tool listing.
    pub fn definitions(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a required string parameter.
pub(crate) fn required_str<'a>(input: &'a Value, name: &str) -> Result<&'a str> {
    input[name]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("missing '{name}' parameter"))
}

/// Read an optional count, clamping negatives to zero. Fractions are
/// truncated; anything unreadable falls back to `default`.
pub(crate) fn count_param(input: &Value, name: &str, default: usize) -> usize {
    let value = &input[name];
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .map(|n| n.max(0) as usize)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolExecutor for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the text parameter."
        }
        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(&self, input: &Value) -> Result<String> {
            Ok(required_str(input, "text")?.to_string())
        }
    }

    fn call(name: &str, input: Value) -> ToolCall {
        ToolCall {
            id: "call-1".into(),
            name: name.into(),
            input,
        }
    }

    #[tokio::test]
    async fn errors_become_error_results() {
        let mut reg = ToolRegistry::new();
        reg.register(Box::new(Echo));

        let ok = reg.execute(&call("echo", json!({"text": "hi"}))).await;
        assert!(!ok.is_error);
        assert_eq!(ok.content, "hi");

        let missing = reg.execute(&call("echo", json!({}))).await;
        assert!(missing.is_error);
        assert!(missing.content.contains("missing 'text'"));

        let unknown = reg.execute(&call("nope", json!({}))).await;
        assert!(unknown.is_error);
        assert_eq!(unknown.content, "Unknown tool: nope");
        assert_eq!(unknown.tool_call_id, "call-1");
    }

    #[test]
    fn count_defaults_and_clamps() {
        assert_eq!(count_param(&json!({}), "count", 10), 10);
        assert_eq!(count_param(&json!({"count": 3}), "count", 10), 3);
        assert_eq!(count_param(&json!({"count": -4}), "count", 10), 0);
        assert_eq!(count_param(&json!({"count": 2.9}), "count", 10), 2);
        assert_eq!(count_param(&json!({"count": "7"}), "count", 10), 7);
        assert_eq!(count_param(&json!({"count": true}), "count", 10), 10);
    }
}
