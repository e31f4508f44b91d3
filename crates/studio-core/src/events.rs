//! Typed cross-panel signals
//!
//! Panels never talk to each other directly. The shell publishes
//! [`StudioEvent`]s on the [`EventBus`]; each panel subscribes and acts only
//! on events addressed to its own tool id.

use crate::types::{ProjectRecord, ToolId};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Default channel capacity
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Severity of a user-visible notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Informational
    Info,
    /// Operation succeeded
    Success,
    /// Operation failed; auto-dismissed by the UI
    Error,
}

/// Transient user-visible message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Panel that raised it, if any
    pub tool: Option<ToolId>,
    /// Severity
    pub level: NotificationLevel,
    /// Text shown to the user
    pub message: String,
}

impl Notification {
    /// Error notification from a panel
    #[must_use]
    pub fn error(tool: &ToolId, message: impl Into<String>) -> Self {
        Self {
            tool: Some(tool.clone()),
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    /// Success notification from a panel
    #[must_use]
    pub fn success(tool: &ToolId, message: impl Into<String>) -> Self {
        Self {
            tool: Some(tool.clone()),
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }
}

/// Message carried on the studio bus
#[derive(Debug, Clone)]
pub enum StudioEvent {
    /// Active panel should snapshot itself into the vault
    RequestSave {
        /// Panel the request is addressed to
        tool: ToolId,
    },
    /// Panel matching `record.tool` should restore the record
    LoadProject(Arc<ProjectRecord>),
    /// Vault contents changed
    HistoryUpdated,
    /// Transient notification for the UI
    Notification(Notification),
}

impl StudioEvent {
    /// Panel the event is addressed to; `None` for broadcasts
    #[must_use]
    pub fn target(&self) -> Option<&ToolId> {
        match self {
            StudioEvent::RequestSave { tool } => Some(tool),
            StudioEvent::LoadProject(record) => Some(&record.tool),
            StudioEvent::HistoryUpdated | StudioEvent::Notification(_) => None,
        }
    }

    /// True when a panel with `tool` must act on this event
    #[must_use]
    pub fn is_for(&self, tool: &ToolId) -> bool {
        self.target() == Some(tool)
    }
}

/// Publish/subscribe channel shared by the shell, the vault and all panels
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StudioEvent>,
}

impl EventBus {
    /// Create a bus with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event; returns the number of subscribers that received it
    pub fn publish(&self, event: StudioEvent) -> usize {
        // No subscribers is not an error: nobody is listening yet.
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events published after this call
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.tx.subscribe()
    }

    /// Current subscriber count
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}
