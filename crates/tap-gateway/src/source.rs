//! The seam between the gateway and whatever speaks the platform protocol.
//!
//! An [`EventSource`] opens one connection per subscription key. A connection
//! yields its handshake, a channel of raw events, and a [`SourceHandle`] that
//! owns the underlying resource. Dropping the handle closes the connection,
//! so a handle is released exactly once no matter which path drops it.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use tap_types::config::SourceConfig;
use tap_types::source::{Handshake, SourceEvent};

/// Capacity of the per-connection event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Options passed through to the source unmodified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    pub session_id: Option<String>,
    pub fetch_room_info: bool,
    pub process_initial_data: bool,
}

impl ConnectOptions {
    /// Build options from config. `LIVETAP_SESSION_ID` wins over the
    /// configured token.
    pub fn from_config(cfg: &SourceConfig) -> Self {
        let session_id = std::env::var("LIVETAP_SESSION_ID")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| cfg.session_id.clone());
        Self {
            session_id,
            fetch_room_info: cfg.fetch_room_info,
            process_initial_data: cfg.process_initial_data,
        }
    }
}

/// Exclusive ownership of one open connection.
pub struct SourceHandle {
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl SourceHandle {
    pub fn new(on_close: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_close: Some(Box::new(on_close)),
        }
    }

    /// A handle with nothing to release.
    pub fn detached() -> Self {
        Self { on_close: None }
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(on_close) = self.on_close.take() {
            on_close();
        }
    }
}

impl Drop for SourceHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceHandle")
            .field("open", &self.on_close.is_some())
            .finish()
    }
}

/// A connection that completed its handshake.
pub struct LiveConnection {
    pub handshake: Handshake,
    pub events: mpsc::Receiver<SourceEvent>,
    pub handle: SourceHandle,
}

/// Provider of live connections. Implementations must make `open` fail (not
/// hang forever) when the broadcast cannot be reached; the manager still
/// applies its own handshake timeout on top.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn open(&self, key: &str, options: &ConnectOptions) -> Result<LiveConnection>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn handle_releases_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&closes);
        let handle = SourceHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        handle.close();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases() {
        let closes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&closes);
        {
            let _handle = SourceHandle::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn options_from_config() {
        let cfg = SourceConfig {
            session_id: Some("token".into()),
            fetch_room_info: false,
            ..Default::default()
        };
        let opts = ConnectOptions::from_config(&cfg);
        assert!(!opts.fetch_room_info);
        assert!(opts.process_initial_data);
        if std::env::var("LIVETAP_SESSION_ID").is_err() {
            assert_eq!(opts.session_id.as_deref(), Some("token"));
        }
    }
}
