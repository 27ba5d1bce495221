/// Domain events and the notification boundary.
///
/// Events are produced by membership transitions and handed to a
/// [`NotificationEmitter`] only after the change has been committed.
/// Delivery is fire-and-forget: an emitter error is logged and counted,
/// never propagated back into the mutation.
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::group::GroupId;
use crate::types::Identity;

// ── GroupEvent ───────────────────────────────────────────────────────────

/// Kind of membership notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    JoinRequested,
    JoinApproved,
    JoinRejected,
    MemberKicked,
}

/// A notification emitted after a committed membership change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEvent {
    pub kind: EventKind,
    pub group_id: GroupId,
    /// Who the notification is addressed to.
    pub recipient: Identity,
    /// Whose membership changed.
    pub subject: Identity,
    pub message: String,
    pub at: u64,
}

// ── Emitters ─────────────────────────────────────────────────────────────

/// Why an emitter could not accept an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("notification queue full")]
    Full,
    #[error("notification sink closed")]
    Closed,
    #[error("notification sink failed: {0}")]
    Sink(String),
}

/// External delivery mechanism (inbox, push, email...).
///
/// `emit` must not block; implementations hand the event off and return.
pub trait NotificationEmitter: Send + Sync {
    fn emit(&self, event: GroupEvent) -> Result<(), EmitError>;
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEmitter;

impl NotificationEmitter for NullEmitter {
    fn emit(&self, _event: GroupEvent) -> Result<(), EmitError> {
        Ok(())
    }
}

/// Queues events on a bounded tokio channel for an async consumer.
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: mpsc::Sender<GroupEvent>,
}

impl ChannelEmitter {
    /// Create an emitter and the receiving end of its queue.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<GroupEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

impl NotificationEmitter for ChannelEmitter {
    fn emit(&self, event: GroupEvent) -> Result<(), EmitError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EmitError::Full,
            mpsc::error::TrySendError::Closed(_) => EmitError::Closed,
        })
    }
}

/// Delivers each event to several sinks; reports the first failure
/// after trying all of them.
#[derive(Clone, Default)]
pub struct FanoutEmitter {
    sinks: Vec<Arc<dyn NotificationEmitter>>,
}

impl FanoutEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn NotificationEmitter>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl NotificationEmitter for FanoutEmitter {
    fn emit(&self, event: GroupEvent) -> Result<(), EmitError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.emit(event.clone()) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

// ── RecordingEmitter (tests) ─────────────────────────────────────────────
