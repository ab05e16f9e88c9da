// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::error::SecurityResult;
use crate::domain::policy::{PolicyKind, PolicyRef, PolicyResult};
use crate::domain::security_context::SecurityContext;

/// Ordered policies bound to one operation.
///
/// Declaration order is both execution order and violation precedence. Every
/// policy is enforced on every pass, even after an earlier one has reported a
/// violation; policies with side effects rely on this.
#[derive(Debug, Default)]
pub struct PolicyChain {
    policies: Vec<PolicyRef>,
}

impl PolicyChain {
    pub fn new(policies: Vec<PolicyRef>) -> Self {
        Self { policies }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, policy: PolicyRef) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn policies(&self) -> &[PolicyRef] {
        &self.policies
    }

    pub fn kinds(&self) -> Vec<PolicyKind> {
        self.policies.iter().map(PolicyRef::kind).collect()
    }

    /// Enforces every policy in order and returns one result per policy.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::SecurityError::PolicyMaterialization`] as soon as a
    /// lazy policy cannot be loaded; the remaining policies are not run and no
    /// partial results are returned.
    pub fn enforce_policies(&self, context: &SecurityContext) -> SecurityResult<Vec<PolicyResult>> {
        let mut results = Vec::with_capacity(self.policies.len());
        for policy in &self.policies {
            results.push(policy.enforce(context)?);
        }
        Ok(results)
    }
}

impl FromIterator<PolicyRef> for PolicyChain {
    fn from_iter<I: IntoIterator<Item = PolicyRef>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
