// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Security Context
//!
//! Per-request data carrier handed to every policy in a chain. The engine only
//! reads the [`CorrelationId`], and only for diagnostics; the principal and the
//! data bag are there for policies to inspect.
//!
//! ## Lifecycle
//!
//! ```text
//! host receives request
//!   └─ SecurityContext::builder()            ← principal + application data
//!         └─ AdvancedConfiguration context builders (optional)
//!         └─ build()                          ← correlation id assigned here, never changed
//!               └─ SecurityHandler::handle_security_for(.., &context)
//! ```

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Stable per-request identifier shared by every diagnostic event of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The authenticated caller, as established by the host before enforcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Request-scoped security context.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityContext {
    id: CorrelationId,
    principal: Option<Principal>,
    data: HashMap<String, Value>,
    created_at: DateTime<Utc>,
}

impl SecurityContext {
    pub fn builder() -> SecurityContextBuilder {
        SecurityContextBuilder::default()
    }

    /// Context for a caller that has not been authenticated.
    pub fn anonymous() -> Self {
        Self::builder().build()
    }

    pub fn id(&self) -> CorrelationId {
        self.id
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    /// Roles of the current principal; empty when anonymous.
    pub fn roles(&self) -> &[String] {
        self.principal
            .as_ref()
            .map(|p| p.roles.as_slice())
            .unwrap_or(&[])
    }

    pub fn data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Typed view of a data entry. Returns `None` when the key is absent or the
    /// stored value does not deserialize into `T`.
    pub fn data_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, Default)]
pub struct SecurityContextBuilder {
    principal: Option<Principal>,
    data: HashMap<String, Value>,
}

impl SecurityContextBuilder {
    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// In-place variant of [`Self::data`], used by context builders.
    pub fn insert_data(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn has_principal(&self) -> bool {
        self.principal.is_some()
    }

    pub fn build(self) -> SecurityContext {
        SecurityContext {
            id: CorrelationId::new(),
            principal: self.principal,
            data: self.data,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_anonymous_context() {
        let ctx = SecurityContext::anonymous();
        assert!(!ctx.is_authenticated());
        assert!(ctx.roles().is_empty());
        assert!(ctx.principal().is_none());
    }

    #[test]
    fn test_each_context_gets_its_own_id() {
        let a = SecurityContext::anonymous();
        let b = SecurityContext::anonymous();
        assert_ne!(a.id(), b.id());

        let cloned = a.clone();
        assert_eq!(cloned.id(), a.id());
    }

    #[test]
    fn test_principal_and_roles() {
        let ctx = SecurityContext::builder()
            .principal(Principal::new("alice").with_roles(["Editor", "Reviewer"]))
            .build();
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.roles(), &["Editor".to_string(), "Reviewer".to_string()]);
        assert!(ctx.principal().unwrap().has_role("Editor"));
        assert!(!ctx.principal().unwrap().has_role("Admin"));
    }

    #[test]
    fn test_typed_data_access() {
        let ctx = SecurityContext::builder()
            .data("account_id", 42)
            .data("tags", json!(["a", "b"]))
            .build();
        assert_eq!(ctx.data_as::<u64>("account_id"), Some(42));
        assert_eq!(
            ctx.data_as::<Vec<String>>("tags"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(ctx.data_as::<String>("account_id"), None);
        assert!(ctx.data("missing").is_none());
    }
}
