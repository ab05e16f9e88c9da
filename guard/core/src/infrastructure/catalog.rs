// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Policy and Handler Catalogs
//!
//! Name-indexed collections the host fills at startup so a declarative
//! [`crate::infrastructure::manifest::SecurityManifest`] can refer to policies
//! and violation handlers by name.
//!
//! Every policy resolved from the catalog is bound as a
//! [`PolicyRef::Lazy`] wrapper: the policy is only constructed when a request
//! first reaches it, once per chain entry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::policy::{LazyPolicy, PolicyFactory, PolicyKind, PolicyRef, SecurityPolicy};
use crate::domain::violation::ViolationHandler;

#[derive(Default, Clone)]
pub struct PolicyCatalog {
    factories: HashMap<PolicyKind, PolicyFactory>,
}

impl PolicyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, kind: impl Into<PolicyKind>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn SecurityPolicy>> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
        self
    }

    /// Registers a policy that needs no dependencies to be built.
    pub fn register_default<P>(self, kind: impl Into<PolicyKind>) -> Self
    where
        P: SecurityPolicy + Default + 'static,
    {
        self.register(kind, || Ok(Arc::new(P::default()) as Arc<dyn SecurityPolicy>))
    }

    pub fn contains(&self, kind: &PolicyKind) -> bool {
        self.factories.contains_key(kind)
    }

    /// Creates a fresh lazy wrapper for `kind`, or `None` if it is unknown.
    pub fn policy_ref(&self, kind: &PolicyKind) -> Option<PolicyRef> {
        self.factories
            .get(kind)
            .map(|factory| PolicyRef::Lazy(LazyPolicy::from_factory(kind.clone(), Arc::clone(factory))))
    }

    pub fn kinds(&self) -> Vec<PolicyKind> {
        let mut kinds: Vec<PolicyKind> = self.factories.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

pub struct HandlerCatalog<R> {
    handlers: HashMap<String, Arc<dyn ViolationHandler<R>>>,
}

impl<R> Default for HandlerCatalog<R> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<R> HandlerCatalog<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: impl Into<String>, handler: Arc<dyn ViolationHandler<R>>) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ViolationHandler<R>>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::PolicyResult;
    use crate::domain::security_context::SecurityContext;
    use crate::domain::violation::UnhandledViolationHandler;

    #[derive(Default)]
    struct RequireLogin;

    impl SecurityPolicy for RequireLogin {
        fn kind(&self) -> PolicyKind {
            PolicyKind::new("RequireLogin")
        }

        fn enforce(&self, context: &SecurityContext) -> PolicyResult {
            if context.is_authenticated() {
                PolicyResult::success(self.kind())
            } else {
                PolicyResult::violation(self.kind(), "Anonymous access denied")
            }
        }
    }

    #[test]
    fn test_policy_refs_are_lazy_and_independent() {
        let catalog = PolicyCatalog::new().register_default::<RequireLogin>("RequireLogin");
        let kind = PolicyKind::new("RequireLogin");

        let first = catalog.policy_ref(&kind).unwrap();
        let second = catalog.policy_ref(&kind).unwrap();
        match (&first, &second) {
            (PolicyRef::Lazy(a), PolicyRef::Lazy(b)) => {
                assert!(!a.is_loaded());
                first.enforce(&SecurityContext::anonymous()).unwrap();
                assert!(a.is_loaded());
                assert!(!b.is_loaded());
            }
            _ => panic!("catalog policies must be lazy"),
        }
    }

    #[test]
    fn test_unknown_kind() {
        let catalog = PolicyCatalog::new();
        assert!(catalog.policy_ref(&PolicyKind::new("Missing")).is_none());
        assert!(catalog.kinds().is_empty());
    }

    #[test]
    fn test_handler_catalog_lookup() {
        let handlers: HandlerCatalog<String> =
            HandlerCatalog::new().register("Fail", Arc::new(UnhandledViolationHandler));
        assert!(handlers.contains("Fail"));
        assert!(handlers.get("Other").is_none());
    }
}
