// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Runtime Event Bus - Pub/Sub for authorization diagnostics
//
// Streams RuntimeEvents over a tokio broadcast channel so dashboards, SSE
// endpoints or a debugging CLI can watch requests being authorized.
//
// In-memory only: events published while nobody subscribes are dropped.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::events::RuntimeEvent;
use crate::domain::security_context::CorrelationId;
use crate::infrastructure::event_log::RuntimeEventListener;

/// Event bus for publishing and subscribing to runtime events
#[derive(Clone)]
pub struct RuntimeEventBus {
    sender: Arc<broadcast::Sender<RuntimeEvent>>,
}

impl RuntimeEventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish(&self, event: RuntimeEvent) {
        // send() only fails when there are no receivers
        if self.sender.send(event).is_err() {
            debug!("No subscribers listening to runtime events");
        }
    }

    /// Subscribe to all runtime events
    pub fn subscribe(&self) -> RuntimeEventReceiver {
        RuntimeEventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to the events of a single request
    pub fn subscribe_request(&self, correlation_id: CorrelationId) -> RequestEventReceiver {
        RequestEventReceiver {
            receiver: self.sender.subscribe(),
            correlation_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RuntimeEventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl RuntimeEventListener for RuntimeEventBus {
    fn on_event(&self, event: &RuntimeEvent) {
        self.publish(event.clone());
    }
}

/// Receiver for all runtime events
pub struct RuntimeEventReceiver {
    receiver: broadcast::Receiver<RuntimeEvent>,
}

impl RuntimeEventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<RuntimeEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<RuntimeEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Runtime event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver filtered to one correlation id
pub struct RequestEventReceiver {
    receiver: broadcast::Receiver<RuntimeEvent>,
    correlation_id: CorrelationId,
}

impl RequestEventReceiver {
    /// Receive the next event of the watched request, skipping all others
    pub async fn recv(&mut self) -> Result<RuntimeEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.correlation_id == self.correlation_id {
                return Ok(event);
            }
        }
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Runtime event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}
