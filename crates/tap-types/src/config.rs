use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Connector bridge executable. The subscription key is appended as the
    /// last argument. Unset means connects fail until one is configured.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    /// Opaque platform session token, passed through to the bridge.
    /// The `LIVETAP_SESSION_ID` env var takes priority at runtime.
    #[serde(default)]
    pub session_id: Option<String>,
    pub handshake_timeout_ms: u64,
    pub fetch_room_info: bool,
    pub process_initial_data: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Records kept per kind per subscription.
    pub capacity: usize,
    /// Records returned by a history query that names no count.
    pub default_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    pub max_attempts: u32,
    /// Fixed delay between failed attempts.
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub player: String,
    pub recorder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub log_level: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: vec![],
            session_id: None,
            handshake_timeout_ms: 15_000,
            fetch_room_info: true,
            process_initial_data: true,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            default_count: 10,
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 5_000,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            player: "ffplay".to_string(),
            recorder: "ffmpeg".to_string(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
