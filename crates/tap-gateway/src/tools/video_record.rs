use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::required_str;
use crate::process_manager::ProcessManager;

pub struct VideoRecord {
    processes: ProcessManager,
}

impl VideoRecord {
    pub fn new(processes: ProcessManager) -> Self {
        Self { processes }
    }
}

#[async_trait]
impl super::ToolExecutor for VideoRecord {
    fn name(&self) -> &str {
        "video_record"
    }

    fn description(&self) -> &str {
        "Record a video from a given url to a file without re-encoding. Use the full url \
         including its expire and sign parameters. Returns the recorder's pid for video_stop."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Video URL to record"
                },
                "filename": {
                    "type": "string",
                    "description": "Output filename for the recorded video"
                }
            },
            "required": ["url", "filename"]
        })
    }

    async fn execute(&self, input: &Value) -> Result<String> {
        let url = required_str(input, "url")?;
        let filename = required_str(input, "filename")?;
        let pid = self.processes.record(url, filename).await?;
        Ok(format!("Video recording started with PID: {pid}"))
    }
}
