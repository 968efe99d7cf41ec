use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::required_str;
use crate::process_manager::ProcessManager;

pub struct VideoPlay {
    processes: ProcessManager,
}

impl VideoPlay {
    pub fn new(processes: ProcessManager) -> Self {
        Self { processes }
    }
}

#[async_trait]
impl super::ToolExecutor for VideoPlay {
    fn name(&self) -> &str {
        "video_play"
    }

    fn description(&self) -> &str {
        "Play a video from a given url in a local player window. Use the full url including \
         its expire and sign parameters. Returns the player's pid for video_stop."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Video URL to play"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, input: &Value) -> Result<String> {
        let url = required_str(input, "url")?;
        let pid = self.processes.play(url).await?;
        Ok(format!("Video playback started with PID: {pid}"))
    }
}
