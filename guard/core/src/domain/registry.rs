// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Policy Registry
//!
//! Lookup table from [`OperationIdentity`] to [`PolicyChain`]. Built once by
//! [`PolicyRegistryBuilder`] and read-only afterwards, so concurrent lookups
//! need no locking.
//!
//! A missing entry and an entry bound to an empty chain are different things:
//! the first is a configuration gap, the second explicitly allows everyone.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::error::{SecurityError, SecurityResult};
use crate::domain::identity::{IdentityMatching, OperationIdentity};
use crate::domain::policy_chain::PolicyChain;

#[derive(Debug, Default)]
pub struct PolicyRegistry {
    chains: HashMap<OperationIdentity, Arc<PolicyChain>>,
    /// Configured identities in registration order, as declared.
    identities: Vec<OperationIdentity>,
    matching: IdentityMatching,
}

impl PolicyRegistry {
    pub fn builder() -> PolicyRegistryBuilder {
        PolicyRegistryBuilder::default()
    }

    pub fn lookup(&self, identity: &OperationIdentity) -> Option<Arc<PolicyChain>> {
        self.chains.get(&self.matching.key_for(identity)).cloned()
    }

    pub fn contains(&self, identity: &OperationIdentity) -> bool {
        self.chains.contains_key(&self.matching.key_for(identity))
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn matching(&self) -> IdentityMatching {
        self.matching
    }

    /// Configured entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (&OperationIdentity, &Arc<PolicyChain>)> + '_ {
        self.identities.iter().filter_map(move |identity| {
            self.chains
                .get(&self.matching.key_for(identity))
                .map(|chain| (identity, chain))
        })
    }
}

#[derive(Debug, Default)]
pub struct PolicyRegistryBuilder {
    entries: Vec<(OperationIdentity, PolicyChain)>,
    matching: IdentityMatching,
}

impl PolicyRegistryBuilder {
    pub fn matching(mut self, matching: IdentityMatching) -> Self {
        self.matching = matching;
        self
    }

    pub fn register(mut self, identity: OperationIdentity, chain: PolicyChain) -> Self {
        self.entries.push((identity, chain));
        self
    }

    /// Freezes the registry.
    ///
    /// # Errors
    ///
    /// [`SecurityError::DuplicateConfiguration`] when two entries resolve to the
    /// same key under the configured [`IdentityMatching`].
    pub fn build(self) -> SecurityResult<PolicyRegistry> {
        let mut chains = HashMap::with_capacity(self.entries.len());
        let mut identities = Vec::with_capacity(self.entries.len());
        for (identity, chain) in self.entries {
            let key = self.matching.key_for(&identity);
            if chains.contains_key(&key) {
                return Err(SecurityError::DuplicateConfiguration(identity));
            }
            debug!("Registered {} policies for {}", chain.len(), identity);
            chains.insert(key, Arc::new(chain));
            identities.push(identity);
        }
        Ok(PolicyRegistry {
            chains,
            identities,
            matching: self.matching,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::{PolicyKind, PolicyRef, PolicyResult, SecurityPolicy};
    use crate::domain::security_context::SecurityContext;

    struct Allow;

    impl SecurityPolicy for Allow {
        fn kind(&self) -> PolicyKind {
            PolicyKind::new("Allow")
        }

        fn enforce(&self, _context: &SecurityContext) -> PolicyResult {
            PolicyResult::success(self.kind())
        }
    }

    fn identity(namespace: &str, action: &str) -> OperationIdentity {
        OperationIdentity::new(namespace, action).unwrap()
    }

    #[test]
    fn test_lookup_is_exact_by_default() {
        let registry = PolicyRegistry::builder()
            .register(
                identity("HomeController", "Index"),
                PolicyChain::empty().with(PolicyRef::eager(Allow)),
            )
            .build()
            .unwrap();

        assert!(registry.lookup(&identity("HomeController", "Index")).is_some());
        assert!(registry.lookup(&identity("homecontroller", "index")).is_none());
        assert!(registry.lookup(&identity("HomeController", "About")).is_none());
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let registry = PolicyRegistry::builder()
            .matching(IdentityMatching::CaseInsensitive)
            .register(identity("HomeController", "Index"), PolicyChain::empty())
            .build()
            .unwrap();

        assert!(registry.contains(&identity("homecontroller", "INDEX")));
        let (declared, _) = registry.entries().next().unwrap();
        assert_eq!(declared.namespace(), "HomeController");
    }

    #[test]
    fn test_empty_chain_is_distinct_from_missing() {
        let registry = PolicyRegistry::builder()
            .register(identity("PublicController", "Index"), PolicyChain::empty())
            .build()
            .unwrap();

        let chain = registry.lookup(&identity("PublicController", "Index")).unwrap();
        assert!(chain.is_empty());
        assert!(registry.lookup(&identity("PublicController", "Other")).is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let err = PolicyRegistry::builder()
            .matching(IdentityMatching::CaseInsensitive)
            .register(identity("A", "B"), PolicyChain::empty())
            .register(identity("a", "b"), PolicyChain::empty())
            .build()
            .unwrap_err();
        assert!(matches!(err, SecurityError::DuplicateConfiguration(id) if id.namespace() == "a"));
    }

    #[test]
    fn test_entries_preserve_registration_order() {
        let registry = PolicyRegistry::builder()
            .register(identity("Z", "1"), PolicyChain::empty())
            .register(identity("A", "2"), PolicyChain::empty())
            .register(identity("M", "3"), PolicyChain::empty())
            .build()
            .unwrap();
        let order: Vec<String> = registry.entries().map(|(id, _)| id.to_string()).collect();
        assert_eq!(order, vec!["Z/1", "A/2", "M/3"]);
        assert_eq!(registry.len(), 3);
    }
}
