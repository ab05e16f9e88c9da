// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Authorization model: identities, contexts, policies, chains, the registry
//! and violation handling.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and rules; no I/O, no global state

pub mod error;
pub mod events;
pub mod identity;
pub mod policy;
pub mod policy_chain;
pub mod registry;
pub mod security_context;
pub mod violation;

pub use error::{SecurityError, SecurityResult};
pub use events::RuntimeEvent;
pub use identity::{IdentityMatching, OperationIdentity};
pub use policy::{
    LazyPolicy, PolicyFactory, PolicyKind, PolicyRef, PolicyResult, PolicyViolation, SecurityPolicy,
};
pub use policy_chain::PolicyChain;
pub use registry::{PolicyRegistry, PolicyRegistryBuilder};
pub use security_context::{CorrelationId, Principal, SecurityContext, SecurityContextBuilder};
pub use violation::{
    FnViolationHandler, OrderedViolationHandlerSelector, UnhandledViolationHandler, ViolationHandler,
    ViolationHandlerSelector, ViolationMatcher, ViolationRecord,
};
