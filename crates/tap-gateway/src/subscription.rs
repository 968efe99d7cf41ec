//! Aggregate state of one monitored broadcast.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use tap_types::event::{EventKind, EventRecord};
use tap_types::source::{Handshake, SourceEvent};
use tap_types::subscription::{HistoryCounts, SubscriptionListing, SubscriptionSummary};

use crate::history::HistoryBuffer;
use crate::source::SourceHandle;
use crate::supervisor::{ReconnectPolicy, ReconnectSupervisor};

/// One buffer per history kind.
#[derive(Debug, Clone)]
pub struct Histories {
    chat: HistoryBuffer,
    gift: HistoryBuffer,
    like: HistoryBuffer,
    roster: HistoryBuffer,
}

impl Histories {
    pub fn new(capacity: usize) -> Self {
        Self {
            chat: HistoryBuffer::new(capacity),
            gift: HistoryBuffer::new(capacity),
            like: HistoryBuffer::new(capacity),
            roster: HistoryBuffer::new(capacity),
        }
    }

    pub fn get(&self, kind: EventKind) -> &HistoryBuffer {
        match kind {
            EventKind::Chat => &self.chat,
            EventKind::Gift => &self.gift,
            EventKind::Like => &self.like,
            EventKind::Roster => &self.roster,
        }
    }

    fn get_mut(&mut self, kind: EventKind) -> &mut HistoryBuffer {
        match kind {
            EventKind::Chat => &mut self.chat,
            EventKind::Gift => &mut self.gift,
            EventKind::Like => &mut self.like,
            EventKind::Roster => &mut self.roster,
        }
    }

    pub fn append(&mut self, record: EventRecord) {
        self.get_mut(record.kind()).append(record);
    }

    pub fn counts(&self) -> HistoryCounts {
        HistoryCounts {
            chat: self.chat.len(),
            gift: self.gift.len(),
            like: self.like.len(),
            roster: self.roster.len(),
        }
    }
}

#[derive(Debug)]
pub struct Subscription {
    key: String,
    session_id: Uuid,
    room_id: String,
    viewer_count: u64,
    stream_endpoint: Option<String>,
    connected_at: DateTime<Utc>,
    histories: Histories,
    supervisor: ReconnectSupervisor,
    handle: Option<SourceHandle>,
    retired: bool,
}

impl Subscription {
    pub fn new(
        key: impl Into<String>,
        handshake: Handshake,
        capacity: usize,
        policy: ReconnectPolicy,
        handle: SourceHandle,
    ) -> Self {
        Self {
            key: key.into(),
            session_id: Uuid::new_v4(),
            room_id: handshake.room_id,
            viewer_count: handshake.viewer_count,
            stream_endpoint: handshake.stream_endpoint,
            connected_at: Utc::now(),
            histories: Histories::new(capacity),
            supervisor: ReconnectSupervisor::new(policy),
            handle: Some(handle),
            retired: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn viewer_count(&self) -> u64 {
        self.viewer_count
    }

    pub fn histories(&self) -> &Histories {
        &self.histories
    }

    pub fn supervisor_mut(&mut self) -> &mut ReconnectSupervisor {
        &mut self.supervisor
    }

    /// Buffer a non-terminal event. Roster events also move the viewer gauge.
    /// Returns `false` for disconnect/error signals, which are not buffered.
    pub fn record(&mut self, event: SourceEvent) -> bool {
        if self.retired {
            return false;
        }
        if let SourceEvent::Roster { viewer_count, .. } = &event {
            self.viewer_count = *viewer_count;
        }
        match event.into_record() {
            Some(record) => {
                self.histories.append(record);
                true
            }
            None => false,
        }
    }

    /// Start a new connection epoch after a successful reconnect. Histories
    /// are kept. Returns the previous handle so the caller can drop it
    /// outside the lock, or hands the new handle back if the subscription
    /// was torn down while the handshake was in flight.
    pub fn resume(
        &mut self,
        handshake: Handshake,
        handle: SourceHandle,
    ) -> Result<Option<SourceHandle>, SourceHandle> {
        if self.retired {
            return Err(handle);
        }
        self.room_id = handshake.room_id;
        self.viewer_count = handshake.viewer_count;
        if handshake.stream_endpoint.is_some() {
            self.stream_endpoint = handshake.stream_endpoint;
        }
        self.supervisor.on_success();
        Ok(self.handle.replace(handle))
    }

    /// Mark the subscription as torn down and give up its connection. Later
    /// events and reconnects are refused.
    pub fn retire(&mut self) -> Option<SourceHandle> {
        self.retired = true;
        self.handle.take()
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Give up ownership of the current connection.
    pub fn take_handle(&mut self) -> Option<SourceHandle> {
        self.handle.take()
    }

    pub fn summary(&self) -> SubscriptionSummary {
        SubscriptionSummary {
            key: self.key.clone(),
            room_id: self.room_id.clone(),
            viewer_count: self.viewer_count,
            stream_endpoint: self.stream_endpoint.clone(),
            state: self.supervisor.connection_state(),
            reconnect_attempts: self.supervisor.failed_attempts(),
            counts: self.histories.counts(),
            connected_at: self.connected_at,
        }
    }

    pub fn listing(&self) -> SubscriptionListing {
        SubscriptionListing {
            key: self.key.clone(),
            room_id: self.room_id.clone(),
            viewer_count: self.viewer_count,
        }
    }
}
