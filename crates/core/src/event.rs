//! Domain event system: decoupled observation of agent runs.
//!
//! Events are published as a run moves through its states. Observers
//! (loggers, UIs, tests) subscribe without the loop knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A run started and is about to discover capabilities
    RunStarted {
        run_id: String,
        request_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// The remote session listed its capabilities
    CapabilitiesDiscovered {
        run_id: String,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// The oracle returned a valid decision
    DecisionMade {
        run_id: String,
        iteration: usize,
        is_final: bool,
        capability: String,
        timestamp: DateTime<Utc>,
    },

    /// A capability was invoked on the remote session
    CapabilityInvoked {
        run_id: String,
        capability: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A run reached a terminal state
    RunFinished {
        run_id: String,
        completed: bool,
        iterations: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
