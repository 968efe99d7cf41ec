use serde::{Deserialize, Serialize};

/// Why a child process was started.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessPurpose {
    Playback,
    Recording,
}

impl std::fmt::Display for ProcessPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Playback => write!(f, "playback"),
            Self::Recording => write!(f, "recording"),
        }
    }
}

/// Info about a managed playback/recording process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub purpose: ProcessPurpose,
    pub command: String,
    pub is_running: bool,
    pub started_at: String,
}
