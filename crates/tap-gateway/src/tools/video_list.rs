use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::process_manager::ProcessManager;

pub struct VideoList {
    processes: ProcessManager,
}

impl VideoList {
    pub fn new(processes: ProcessManager) -> Self {
        Self { processes }
    }
}

#[async_trait]
impl super::ToolExecutor for VideoList {
    fn name(&self) -> &str {
        "video_list"
    }

    fn description(&self) -> &str {
        "List playback and recording processes started by video_play or video_record, \
         with their pid and status."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _input: &Value) -> Result<String> {
        let processes = self.processes.list().await;
        if processes.is_empty() {
            return Ok("No video processes.".to_string());
        }

        let mut out = String::new();
        for p in &processes {
            let status = if p.is_running { "running" } else { "exited" };
            out.push_str(&format!(
                "  {} | {} | {} | since {} | {}\n",
                p.pid, p.purpose, status, p.started_at, p.command
            ));
        }
        Ok(out)
    }
}
