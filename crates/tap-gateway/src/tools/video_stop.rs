use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::process_manager::ProcessManager;

pub struct VideoStop {
    processes: ProcessManager,
}

impl VideoStop {
    pub fn new(processes: ProcessManager) -> Self {
        Self { processes }
    }
}

#[async_trait]
impl super::ToolExecutor for VideoStop {
    fn name(&self) -> &str {
        "video_stop"
    }

    fn description(&self) -> &str {
        "Stop a playback or recording process started by video_play or video_record."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pid": {
                    "type": ["string", "integer"],
                    "description": "The pid returned when the process was started"
                }
            },
            "required": ["pid"]
        })
    }

    async fn execute(&self, input: &Value) -> Result<String> {
        let pid = input["pid"]
            .as_u64()
            .or_else(|| input["pid"].as_str().and_then(|s| s.trim().parse().ok()))
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| anyhow::anyhow!("missing or invalid 'pid' parameter"))?;

        self.processes.terminate(pid).await?;
        Ok(format!("Stopped process {pid}"))
    }
}
