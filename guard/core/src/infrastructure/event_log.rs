// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Event Log
//!
//! Diagnostics port for [`RuntimeEvent`]s. An [`EventLog`] is created by the
//! host at startup and handed to the [`crate::application::SecurityHandler`];
//! clones share the same listener slot, so a listener set (or cleared) later
//! is seen by every handler holding a clone.
//!
//! Without a listener every call degrades to a no-op: messages are never
//! formatted and [`EventLog::timing_of`] does not read the clock.
//!
//! Listener implementations in this crate:
//!
//! | Listener | Destination |
//! |----------|-------------|
//! | [`TracingEventListener`] | `tracing` events with structured fields |
//! | [`InMemoryEventListener`] | in-process buffer, for tests and debugging |
//! | [`crate::infrastructure::event_bus::RuntimeEventBus`] | tokio broadcast channel |

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Instant;

use crate::domain::events::RuntimeEvent;
use crate::domain::security_context::CorrelationId;

/// Receives every runtime event emitted while a listener is installed.
pub trait RuntimeEventListener: Send + Sync {
    fn on_event(&self, event: &RuntimeEvent);
}

impl<F> RuntimeEventListener for F
where
    F: Fn(&RuntimeEvent) + Send + Sync,
{
    fn on_event(&self, event: &RuntimeEvent) {
        self(event)
    }
}

#[derive(Clone, Default)]
pub struct EventLog {
    listener: Arc<RwLock<Option<Arc<dyn RuntimeEventListener>>>>,
}

impl EventLog {
    /// Event log with no listener installed.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_listener(listener: Arc<dyn RuntimeEventListener>) -> Self {
        let log = Self::default();
        log.set_listener(listener);
        log
    }

    pub fn set_listener(&self, listener: Arc<dyn RuntimeEventListener>) {
        *self.listener.write() = Some(listener);
    }

    pub fn clear_listener(&self) {
        *self.listener.write() = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.listener.read().is_some()
    }

    fn current(&self) -> Option<Arc<dyn RuntimeEventListener>> {
        self.listener.read().clone()
    }

    /// Emits an event. `message` is only evaluated when a listener is installed.
    pub fn runtime_event<M>(&self, correlation_id: CorrelationId, message: M)
    where
        M: FnOnce() -> String,
    {
        if let Some(listener) = self.current() {
            listener.on_event(&RuntimeEvent::new(correlation_id, message()));
        }
    }

    /// Runs `operation` and, when a listener is installed and the operation
    /// succeeds, emits one timing event. A failed operation emits nothing. The
    /// operation's output is returned untouched either way.
    pub fn timing_of<T, E, O, M>(
        &self,
        operation: O,
        message: M,
        correlation_id: CorrelationId,
    ) -> Result<T, E>
    where
        O: FnOnce() -> Result<T, E>,
        M: FnOnce() -> String,
    {
        let Some(listener) = self.current() else {
            return operation();
        };

        let started = Instant::now();
        let value = operation()?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        listener.on_event(&RuntimeEvent::timed(correlation_id, message(), elapsed_ms));
        Ok(value)
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Forwards runtime events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventListener;

impl RuntimeEventListener for TracingEventListener {
    fn on_event(&self, event: &RuntimeEvent) {
        match event.completed_in_ms {
            Some(ms) => tracing::info!(
                correlation_id = %event.correlation_id,
                completed_in_ms = ms,
                "{}",
                event.message
            ),
            None => tracing::info!(correlation_id = %event.correlation_id, "{}", event.message),
        }
    }
}

/// Buffers runtime events in memory.
#[derive(Default)]
pub struct InMemoryEventListener {
    events: Mutex<Vec<RuntimeEvent>>,
}

impl InMemoryEventListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RuntimeEvent> {
        self.events.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.message.clone()).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl RuntimeEventListener for InMemoryEventListener {
    fn on_event(&self, event: &RuntimeEvent) {
        self.events.lock().push(event.clone());
    }
}
