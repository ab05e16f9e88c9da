// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Aegis Guard Core
//!
//! Declarative authorization for controller actions: every protected
//! operation is bound to an ordered policy chain, and the first violation is
//! turned into a response by a selected violation handler.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Policy model, security handler and configuration loading

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
pub use application::{ConfigurationProvider, SecurityConfiguration, SecurityHandler};
pub use infrastructure::EventLog;
