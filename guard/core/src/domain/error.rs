// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Security Errors
//!
//! Every fatal condition the engine can raise. A policy *violation* is not an
//! error: it is reported through [`crate::domain::policy::PolicyResult`] and
//! routed to a violation handler. Only the conditions below abort a request.

use thiserror::Error;

use crate::domain::identity::OperationIdentity;
use crate::domain::policy::PolicyKind;
use crate::domain::violation::ViolationRecord;

#[derive(Debug, Clone, Error)]
pub enum SecurityError {
    /// An entry-point argument was rejected before any lookup took place.
    #[error("Invalid argument '{argument}': {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: String,
    },

    /// No policy chain is bound to the identity and missing configuration is not ignored.
    #[error("Security has not been configured for {}, action {}", .0.namespace(), .0.action())]
    MissingConfiguration(OperationIdentity),

    /// The same identity was registered twice while building a registry.
    #[error("Security is configured more than once for {}, action {}", .0.namespace(), .0.action())]
    DuplicateConfiguration(OperationIdentity),

    /// The factory of a lazily loaded policy failed.
    #[error("Failed to load policy {kind}: {reason}")]
    PolicyMaterialization { kind: PolicyKind, reason: String },

    /// A violation reached the default handler because no configured handler matched it.
    #[error("Unhandled policy violation: {0}")]
    UnhandledViolation(ViolationRecord),
}

impl SecurityError {
    pub(crate) fn invalid_argument(argument: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }
}

pub type SecurityResult<T> = Result<T, SecurityError>;
