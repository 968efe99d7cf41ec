//! Multi-session live-connection manager.
//!
//! The registry maps each subscription key to a slot holding one
//! [`Subscription`] behind its own mutex, so unrelated subscriptions never
//! contend. Every subscription has exactly one session task: it owns the
//! receiving end of the connection's event channel, buffers events, and on a
//! disconnect or error signal drives the [`ReconnectSupervisor`] until the
//! connection resumes or the subscription is evicted.
//!
//! Lock order: the registry lock is never taken while a subscription lock is
//! held, and no lock is held across an `.await`.
//!
//! [`ReconnectSupervisor`]: crate::supervisor::ReconnectSupervisor

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tap_types::config::LiveConfig;
use tap_types::event::{EventKind, EventRecord};
use tap_types::source::SourceEvent;
use tap_types::subscription::{LifecycleEvent, SubscriptionListing, SubscriptionSummary};

use crate::error::{LiveError, Result};
use crate::events::EventBus;
use crate::source::{ConnectOptions, EventSource, LiveConnection};
use crate::subscription::Subscription;
use crate::supervisor::{ReconnectPolicy, Step};

/// Tunables of the manager, usually built from [`LiveConfig`].
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub history_capacity: usize,
    pub handshake_timeout: Duration,
    pub policy: ReconnectPolicy,
    pub connect: ConnectOptions,
}

impl ManagerOptions {
    pub fn from_config(cfg: &LiveConfig) -> Self {
        Self {
            history_capacity: cfg.history.capacity,
            handshake_timeout: Duration::from_millis(cfg.source.handshake_timeout_ms),
            policy: ReconnectPolicy::from(&cfg.reconnect),
            connect: ConnectOptions::from_config(&cfg.source),
        }
    }
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self::from_config(&LiveConfig::default())
    }
}

struct SubscriptionSlot {
    session_id: Uuid,
    inner: Mutex<Subscription>,
}

/// Keyed store of live subscriptions.
#[derive(Default)]
struct Registry {
    entries: RwLock<HashMap<String, Arc<SubscriptionSlot>>>,
}

impl Registry {
    fn get(&self, key: &str) -> Option<Arc<SubscriptionSlot>> {
        self.entries.read().get(key).cloned()
    }

    /// The slot for `key`, but only if it is still the same subscription.
    fn lookup(&self, key: &str, session_id: Uuid) -> Option<Arc<SubscriptionSlot>> {
        self.get(key).filter(|slot| slot.session_id == session_id)
    }

    /// Insert unless the key is taken; on conflict returns the existing slot.
    fn insert_if_absent(
        &self,
        key: &str,
        slot: Arc<SubscriptionSlot>,
    ) -> std::result::Result<(), Arc<SubscriptionSlot>> {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(key) {
            return Err(Arc::clone(existing));
        }
        entries.insert(key.to_string(), slot);
        Ok(())
    }

    fn remove(&self, key: &str) -> Option<Arc<SubscriptionSlot>> {
        self.entries.write().remove(key)
    }

    fn remove_if(&self, key: &str, session_id: Uuid) -> Option<Arc<SubscriptionSlot>> {
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(slot) if slot.session_id == session_id => entries.remove(key),
            _ => None,
        }
    }

    fn drain(&self) -> Vec<(String, Arc<SubscriptionSlot>)> {
        self.entries.write().drain().collect()
    }

    fn snapshot(&self) -> Vec<Arc<SubscriptionSlot>> {
        self.entries.read().values().cloned().collect()
    }
}

pub struct ConnectionManager {
    registry: Arc<Registry>,
    source: Arc<dyn EventSource>,
    options: Arc<ManagerOptions>,
    event_bus: EventBus,
}

impl ConnectionManager {
    pub fn new(source: Arc<dyn EventSource>, options: ManagerOptions, event_bus: EventBus) -> Self {
        Self {
            registry: Arc::new(Registry::default()),
            source,
            options: Arc::new(options),
            event_bus,
        }
    }

    /// Open a subscription for `key`, or return the live one's summary.
    pub async fn connect(&self, key: &str) -> Result<SubscriptionSummary> {
        if let Some(slot) = self.registry.get(key) {
            debug!("Already connected to {key}");
            return Ok(slot.inner.lock().summary());
        }

        let LiveConnection {
            handshake,
            events,
            handle,
        } = open_connection(
            self.source.as_ref(),
            key,
            &self.options.connect,
            self.options.handshake_timeout,
        )
        .await?;

        let room_id = handshake.room_id.clone();
        let subscription = Subscription::new(
            key,
            handshake,
            self.options.history_capacity,
            self.options.policy,
            handle,
        );
        let session_id = subscription.session_id();
        let slot = Arc::new(SubscriptionSlot {
            session_id,
            inner: Mutex::new(subscription),
        });

        if let Err(existing) = self.registry.insert_if_absent(key, Arc::clone(&slot)) {
            // Lost a race with a concurrent connect; our connection closes
            // when `slot` drops.
            debug!("Concurrent connect for {key}; keeping the existing subscription");
            return Ok(existing.inner.lock().summary());
        }

        let summary = slot.inner.lock().summary();
        drop(slot);

        info!("Connected to {key}'s livestream (room {room_id})");
        self.event_bus.publish(LifecycleEvent::Connected {
            key: key.to_string(),
            room_id,
        });

        let session = Session {
            key: key.to_string(),
            session_id,
            registry: Arc::clone(&self.registry),
            source: Arc::clone(&self.source),
            options: Arc::clone(&self.options),
            event_bus: self.event_bus.clone(),
        };
        tokio::spawn(session.run(events));

        Ok(summary)
    }

    /// Tear down the subscription for `key` and release its connection.
    pub fn disconnect(&self, key: &str) -> Result<()> {
        let slot = self
            .registry
            .remove(key)
            .ok_or_else(|| LiveError::NotConnected(key.to_string()))?;

        let handle = slot.inner.lock().retire();
        if let Some(handle) = handle {
            handle.close();
        }

        info!("Disconnected from {key}'s livestream");
        self.event_bus.publish(LifecycleEvent::Disconnected {
            key: key.to_string(),
        });
        Ok(())
    }

    /// All live subscriptions, ordered by key.
    pub fn list(&self) -> Vec<SubscriptionListing> {
        let mut rows: Vec<_> = self
            .registry
            .snapshot()
            .iter()
            .map(|slot| slot.inner.lock().listing())
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        rows
    }

    pub fn is_connected(&self, key: &str) -> bool {
        self.registry.get(key).is_some()
    }

    pub fn info(&self, key: &str) -> Result<SubscriptionSummary> {
        let slot = self.slot(key)?;
        let summary = slot.inner.lock().summary();
        Ok(summary)
    }

    /// The most recent `count` records of `kind`, oldest first.
    pub fn history(&self, key: &str, kind: &str, count: usize) -> Result<Vec<EventRecord>> {
        let slot = self.slot(key)?;
        let kind: EventKind = kind
            .parse()
            .map_err(|_| LiveError::InvalidKind(kind.to_string()))?;
        let records = slot.inner.lock().histories().get(kind).snapshot(count);
        Ok(records)
    }

    /// One-shot handshake that captures the stream endpoint and closes the
    /// connection again. Does not touch the registry.
    pub async fn probe_stream_url(&self, key: &str) -> Result<Option<String>> {
        let connection = open_connection(
            self.source.as_ref(),
            key,
            &self.options.connect,
            self.options.handshake_timeout,
        )
        .await?;
        connection.handle.close();
        Ok(connection.handshake.stream_endpoint)
    }

    /// Disconnect everything.
    pub fn shutdown(&self) {
        for (key, slot) in self.registry.drain() {
            let handle = slot.inner.lock().retire();
            drop(handle);
            info!("Disconnected from {key}'s livestream (shutdown)");
            self.event_bus.publish(LifecycleEvent::Disconnected { key });
        }
    }

    fn slot(&self, key: &str) -> Result<Arc<SubscriptionSlot>> {
        self.registry
            .get(key)
            .ok_or_else(|| LiveError::NotConnected(key.to_string()))
    }
}

/// Open a connection, bounding the handshake by `timeout`.
async fn open_connection(
    source: &dyn EventSource,
    key: &str,
    options: &ConnectOptions,
    timeout: Duration,
) -> Result<LiveConnection> {
    match tokio::time::timeout(timeout, source.open(key, options)).await {
        Ok(Ok(connection)) => Ok(connection),
        Ok(Err(e)) => Err(LiveError::Connect {
            key: key.to_string(),
            reason: format!("{e:#}"),
        }),
        Err(_) => Err(LiveError::Connect {
            key: key.to_string(),
            reason: format!("handshake timed out after {}ms", timeout.as_millis()),
        }),
    }
}

/// Why the event pump stopped.
enum PumpExit {
    /// The source signalled a disconnect or error, or its channel closed.
    Signal,
    /// The subscription is no longer in the registry.
    Gone,
}

/// The per-subscription task: event dispatch plus reconnect supervision.
struct Session {
    key: String,
    session_id: Uuid,
    registry: Arc<Registry>,
    source: Arc<dyn EventSource>,
    options: Arc<ManagerOptions>,
    event_bus: EventBus,
}

impl Session {
    async fn run(self, mut events: mpsc::Receiver<SourceEvent>) {
        loop {
            match self.pump(&mut events).await {
                PumpExit::Gone => break,
                PumpExit::Signal => {}
            }
            drop(events);
            match self.reconnect().await {
                Some(next) => events = next,
                None => break,
            }
        }
        debug!("Session task for {} finished", self.key);
    }

    async fn pump(&self, events: &mut mpsc::Receiver<SourceEvent>) -> PumpExit {
        while let Some(event) = events.recv().await {
            let Some(slot) = self.registry.lookup(&self.key, self.session_id) else {
                debug!("Dropping late event for {}: subscription is gone", self.key);
                return PumpExit::Gone;
            };
            if event.is_terminal() {
                match event {
                    SourceEvent::Error { message } => {
                        warn!("Error in {}'s livestream connection: {message}", self.key)
                    }
                    _ => warn!("Disconnected from {}'s livestream", self.key),
                }
                return PumpExit::Signal;
            }
            slot.inner.lock().record(event);
        }

        if self.registry.lookup(&self.key, self.session_id).is_none() {
            return PumpExit::Gone;
        }
        warn!("Event stream for {}'s livestream closed", self.key);
        PumpExit::Signal
    }

    /// Run one outage to completion. Returns the new event channel on
    /// success, `None` once the subscription is gone or evicted.
    async fn reconnect(&self) -> Option<mpsc::Receiver<SourceEvent>> {
        let slot = self.registry.lookup(&self.key, self.session_id)?;
        let (begin, dead_handle) = {
            let mut sub = slot.inner.lock();
            let dead_handle = sub.take_handle();
            (sub.supervisor_mut().on_signal(), dead_handle)
        };
        drop(dead_handle);
        drop(slot);

        let Some(mut step) = begin else {
            warn!("Reconnect for {} already in progress", self.key);
            return None;
        };

        loop {
            let (attempt, delay) = match step {
                Step::Attempt { attempt, delay } => (attempt, delay),
                Step::Exhausted { attempts } => {
                    self.evict(attempts);
                    return None;
                }
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.registry.lookup(&self.key, self.session_id).is_none() {
                debug!("{} was disconnected; abandoning reconnect", self.key);
                return None;
            }

            info!(
                "Attempting to reconnect to {}'s livestream (attempt {attempt}/{})",
                self.key, self.options.policy.max_attempts
            );
            self.event_bus.publish(LifecycleEvent::Reconnecting {
                key: self.key.clone(),
                attempt,
            });

            let result = open_connection(
                self.source.as_ref(),
                &self.key,
                &self.options.connect,
                self.options.handshake_timeout,
            )
            .await;

            let Some(slot) = self.registry.lookup(&self.key, self.session_id) else {
                // Dropping `result` releases any connection that did open.
                debug!("{} was disconnected during reconnect; releasing", self.key);
                return None;
            };

            match result {
                Ok(LiveConnection {
                    handshake,
                    events,
                    handle,
                }) => {
                    let room_id = handshake.room_id.clone();
                    let resumed = slot.inner.lock().resume(handshake, handle);
                    match resumed {
                        Ok(previous) => drop(previous),
                        Err(rejected) => {
                            rejected.close();
                            return None;
                        }
                    }
                    info!("Successfully reconnected to {}'s livestream (room {room_id})", self.key);
                    self.event_bus.publish(LifecycleEvent::Reconnected {
                        key: self.key.clone(),
                        room_id,
                    });
                    return Some(events);
                }
                Err(e) => {
                    warn!("Failed to reconnect to {}'s livestream: {e}", self.key);
                    step = slot.inner.lock().supervisor_mut().on_failure();
                }
            }
        }
    }

    fn evict(&self, attempts: u32) {
        let Some(slot) = self.registry.remove_if(&self.key, self.session_id) else {
            return;
        };
        let handle = slot.inner.lock().retire();
        drop(handle);

        let err = LiveError::ReconnectExhausted(self.key.clone());
        error!("{err} ({attempts} failed attempts); evicting");
        self.event_bus.publish(LifecycleEvent::Evicted {
            key: self.key.clone(),
            attempts,
        });
    }
}
