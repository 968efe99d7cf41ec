pub mod bridge;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod manager;
pub mod process_manager;
pub mod rpc;
pub mod source;
pub mod subscription;
pub mod supervisor;
pub mod tools;

pub use error::LiveError;
pub use events::EventBus;
pub use manager::{ConnectionManager, ManagerOptions};
pub use source::{ConnectOptions, EventSource, LiveConnection, SourceHandle};

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use tap_types::config::LiveConfig;
use tap_types::subscription::LifecycleEvent;
use tap_types::tool::{ToolCall, ToolInfo, ToolResult};

use bridge::BridgeSource;
use process_manager::ProcessManager;
use tools::ToolRegistry;

/// The central gateway. Owns the connection manager, the media processes,
/// the event bus and the tool registry. The stdio server holds an
/// `Arc<Gateway>`.
pub struct Gateway {
    manager: Arc<ConnectionManager>,
    processes: ProcessManager,
    event_bus: EventBus,
    tools: ToolRegistry,
}

impl Gateway {
    /// Create a gateway whose connections come from the configured
    /// connector bridge.
    pub fn new(config: LiveConfig) -> Self {
        let source = Arc::new(BridgeSource::new(&config.source));
        Self::with_source(config, source)
    }

    /// Create a gateway over any event source.
    pub fn with_source(config: LiveConfig, source: Arc<dyn EventSource>) -> Self {
        let event_bus = EventBus::new();
        let manager = Arc::new(ConnectionManager::new(
            source,
            ManagerOptions::from_config(&config),
            event_bus.clone(),
        ));
        let processes = ProcessManager::new(config.media.clone());
        let tools = ToolRegistry::with_default_tools(
            Arc::clone(&manager),
            processes.clone(),
            config.history.default_count,
        );

        Self {
            manager,
            processes,
            event_bus,
            tools,
        }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Subscribe to subscription lifecycle events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.event_bus.subscribe()
    }

    pub fn tool_definitions(&self) -> Vec<ToolInfo> {
        self.tools.definitions()
    }

    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        self.tools.execute(call).await
    }

    /// Disconnect every subscription and stop every media process.
    pub async fn shutdown(&self) {
        self.manager.shutdown();
        self.processes.terminate_all().await;
        info!("Gateway shut down");
    }
}
