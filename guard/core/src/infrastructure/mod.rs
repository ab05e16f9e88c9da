// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod catalog;
pub mod event_bus;
pub mod event_log;
pub mod manifest;

pub use catalog::{HandlerCatalog, PolicyCatalog};
pub use event_bus::{EventBusError, RuntimeEventBus};
pub use event_log::{EventLog, InMemoryEventListener, RuntimeEventListener, TracingEventListener};
pub use manifest::SecurityManifest;
