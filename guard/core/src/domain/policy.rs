// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Security Policies
//!
//! A policy is a pluggable rule that inspects a [`SecurityContext`] and either
//! passes or reports a violation. The engine never knows what a policy checks;
//! it only runs it and reads the [`PolicyResult`].
//!
//! Policies are bound into chains as [`PolicyRef`] values:
//!
//! | Variant | Instance | Kind known before enforcement |
//! |---------|----------|-------------------------------|
//! | `Eager` | constructed at configuration time | yes, from the instance |
//! | `Lazy`  | built by a factory on first enforcement, then memoized | yes, declared |

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::domain::error::{SecurityError, SecurityResult};
use crate::domain::security_context::SecurityContext;

/// Identifier of a policy type, used for handler selection and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyKind(String);

impl PolicyKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PolicyKind {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Payload describing why a policy denied access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyViolation {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of one policy in one enforcement pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyResult {
    pub policy_kind: PolicyKind,
    pub violation: Option<PolicyViolation>,
}

impl PolicyResult {
    pub fn success(policy_kind: PolicyKind) -> Self {
        Self {
            policy_kind,
            violation: None,
        }
    }

    pub fn violation(policy_kind: PolicyKind, message: impl Into<String>) -> Self {
        Self {
            policy_kind,
            violation: Some(PolicyViolation {
                message: message.into(),
                details: None,
            }),
        }
    }

    pub fn violation_with_details(
        policy_kind: PolicyKind,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            policy_kind,
            violation: Some(PolicyViolation {
                message: message.into(),
                details: Some(details),
            }),
        }
    }

    pub fn violation_occurred(&self) -> bool {
        self.violation.is_some()
    }
}

/// A pluggable authorization rule.
///
/// Implementations must be safe to call from several requests at once when
/// their chain is shared; the engine adds no locking around `enforce`.
pub trait SecurityPolicy: Send + Sync {
    fn kind(&self) -> PolicyKind;

    fn enforce(&self, context: &SecurityContext) -> PolicyResult;
}

/// Deferred constructor for a lazily loaded policy.
pub type PolicyFactory = Arc<dyn Fn() -> anyhow::Result<Arc<dyn SecurityPolicy>> + Send + Sync>;

/// Policy wrapper that builds its instance on first enforcement.
///
/// Once loaded, enforcements only take a shared read lock. The factory runs
/// under the write lock with a re-check, so concurrent first calls on the same
/// wrapper still construct exactly one instance. A failed factory call is not
/// cached; the next enforcement tries again.
pub struct LazyPolicy {
    kind: PolicyKind,
    factory: PolicyFactory,
    instance: RwLock<Option<Arc<dyn SecurityPolicy>>>,
}

impl LazyPolicy {
    pub fn new<F>(kind: impl Into<PolicyKind>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn SecurityPolicy>> + Send + Sync + 'static,
    {
        Self::from_factory(kind.into(), Arc::new(factory))
    }

    pub fn from_factory(kind: PolicyKind, factory: PolicyFactory) -> Self {
        Self {
            kind,
            factory,
            instance: RwLock::new(None),
        }
    }

    pub fn kind(&self) -> &PolicyKind {
        &self.kind
    }

    pub fn is_loaded(&self) -> bool {
        self.instance.read().is_some()
    }

    /// Returns the memoized instance, running the factory if this is the first call.
    pub fn load(&self) -> SecurityResult<Arc<dyn SecurityPolicy>> {
        if let Some(policy) = self.instance.read().as_ref() {
            return Ok(Arc::clone(policy));
        }

        let mut slot = self.instance.write();
        if let Some(policy) = slot.as_ref() {
            return Ok(Arc::clone(policy));
        }

        debug!("Loading lazy policy {}", self.kind);
        let policy = (self.factory)().map_err(|e| SecurityError::PolicyMaterialization {
            kind: self.kind.clone(),
            reason: format!("{:#}", e),
        })?;
        *slot = Some(Arc::clone(&policy));
        Ok(policy)
    }
}

impl fmt::Debug for LazyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyPolicy")
            .field("kind", &self.kind)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// A policy as bound into a [`crate::domain::policy_chain::PolicyChain`].
pub enum PolicyRef {
    Eager(Arc<dyn SecurityPolicy>),
    Lazy(LazyPolicy),
}

impl PolicyRef {
    pub fn eager<P: SecurityPolicy + 'static>(policy: P) -> Self {
        Self::Eager(Arc::new(policy))
    }

    pub fn lazy<F>(kind: impl Into<PolicyKind>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn SecurityPolicy>> + Send + Sync + 'static,
    {
        Self::Lazy(LazyPolicy::new(kind, factory))
    }

    /// Kind of the policy, available without materializing a lazy policy.
    pub fn kind(&self) -> PolicyKind {
        match self {
            PolicyRef::Eager(policy) => policy.kind(),
            PolicyRef::Lazy(lazy) => lazy.kind().clone(),
        }
    }

    /// Resolves the concrete policy, loading it if lazy.
    pub fn resolve(&self) -> SecurityResult<Arc<dyn SecurityPolicy>> {
        match self {
            PolicyRef::Eager(policy) => Ok(Arc::clone(policy)),
            PolicyRef::Lazy(lazy) => lazy.load(),
        }
    }

    /// Runs the policy. The result always carries the declared kind, so
    /// handler selection matches the name the policy was bound under even when
    /// the instance reports a different one.
    pub fn enforce(&self, context: &SecurityContext) -> SecurityResult<PolicyResult> {
        let mut result = self.resolve()?.enforce(context);
        result.policy_kind = self.kind();
        Ok(result)
    }
}

impl fmt::Debug for PolicyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyRef::Eager(policy) => f.debug_tuple("Eager").field(&policy.kind()).finish(),
            PolicyRef::Lazy(lazy) => f.debug_tuple("Lazy").field(lazy).finish(),
        }
    }
}
