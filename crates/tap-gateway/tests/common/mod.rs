//! Scripted event source shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, oneshot};

use tap_gateway::supervisor::ReconnectPolicy;
use tap_gateway::{ConnectOptions, EventSource, LiveConnection, ManagerOptions, SourceHandle};
use tap_types::event::UserIdentity;
use tap_types::source::{Handshake, SourceEvent};
use tap_types::subscription::LifecycleEvent;

/// What the next `open` call does.
pub enum Outcome {
    Accept(Handshake),
    Reject(String),
    /// Accept once the paired sender fires (or is dropped).
    Gated(oneshot::Receiver<()>, Handshake),
}

pub fn handshake(room_id: &str) -> Handshake {
    Handshake {
        room_id: room_id.to_string(),
        viewer_count: 7,
        stream_endpoint: Some(format!("https://cdn.example/{room_id}.flv")),
    }
}

#[derive(Default)]
struct Script {
    outcomes: VecDeque<Outcome>,
    senders: HashMap<String, mpsc::Sender<SourceEvent>>,
}

/// Event source whose handshakes follow a script. Once the script runs out
/// every open succeeds with room `room-<n>`.
#[derive(Default)]
pub struct ScriptedSource {
    script: Mutex<Script>,
    opens: AtomicUsize,
    closes: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
        let source = Self::default();
        source.script.lock().unwrap().outcomes = outcomes.into_iter().collect();
        Arc::new(source)
    }

    /// A source that accepts every handshake.
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Sender feeding the most recently opened connection for `key`.
    pub fn sender(&self, key: &str) -> mpsc::Sender<SourceEvent> {
        self.script.lock().unwrap().senders[key].clone()
    }

    pub async fn emit(&self, key: &str, event: SourceEvent) {
        self.sender(key).send(event).await.unwrap();
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn open(&self, key: &str, _options: &ConnectOptions) -> Result<LiveConnection> {
        let n = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self.script.lock().unwrap().outcomes.pop_front();

        let handshake = match outcome {
            None => handshake(&format!("room-{n}")),
            Some(Outcome::Accept(handshake)) => handshake,
            Some(Outcome::Reject(reason)) => anyhow::bail!(reason),
            Some(Outcome::Gated(gate, handshake)) => {
                let _ = gate.await;
                handshake
            }
        };

        let (tx, rx) = mpsc::channel(64);
        self.script
            .lock()
            .unwrap()
            .senders
            .insert(key.to_string(), tx);

        let closes = Arc::clone(&self.closes);
        Ok(LiveConnection {
            handshake,
            events: rx,
            handle: SourceHandle::new(move || {
                closes.fetch_add(1, Ordering::SeqCst);
            }),
        })
    }
}

pub fn options(capacity: usize, max_attempts: u32) -> ManagerOptions {
    ManagerOptions {
        history_capacity: capacity,
        handshake_timeout: Duration::from_secs(2),
        policy: ReconnectPolicy {
            max_attempts,
            delay: Duration::from_millis(10),
        },
        connect: ConnectOptions::default(),
    }
}

pub fn viewer(name: &str) -> UserIdentity {
    UserIdentity {
        unique_id: name.to_string(),
        user_id: format!("{name}-id"),
        nickname: name.to_uppercase(),
    }
}

pub fn chat(name: &str, comment: &str) -> SourceEvent {
    SourceEvent::Chat {
        user: viewer(name),
        comment: comment.to_string(),
    }
}

/// Wait for the first lifecycle event matching `pred`.
pub async fn wait_for(
    rx: &mut broadcast::Receiver<LifecycleEvent>,
    pred: impl Fn(&LifecycleEvent) -> bool,
) -> LifecycleEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for lifecycle event")
}

/// Poll `check` until it holds.
pub async fn eventually(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}
