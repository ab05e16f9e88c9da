// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::{SecurityError, SecurityResult};

/// Composite key naming a protected operation, e.g. a controller/action pair.
///
/// Both components are non-empty. Equality is exact; case folding is applied
/// by the registry only when it is configured with
/// [`IdentityMatching::CaseInsensitive`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OperationIdentity {
    namespace: String,
    action: String,
}

impl OperationIdentity {
    pub fn new(namespace: impl Into<String>, action: impl Into<String>) -> SecurityResult<Self> {
        let namespace = namespace.into();
        let action = action.into();
        if namespace.is_empty() {
            return Err(SecurityError::invalid_argument(
                "namespace",
                "Namespace must not be empty",
            ));
        }
        if action.is_empty() {
            return Err(SecurityError::invalid_argument(
                "action",
                "Action must not be empty",
            ));
        }
        Ok(Self { namespace, action })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub(crate) fn to_lowercase(&self) -> Self {
        Self {
            namespace: self.namespace.to_lowercase(),
            action: self.action.to_lowercase(),
        }
    }
}

impl fmt::Display for OperationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.action)
    }
}

/// How the registry compares an incoming identity with its configured keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityMatching {
    #[default]
    Exact,
    CaseInsensitive,
}

impl IdentityMatching {
    pub(crate) fn key_for(&self, identity: &OperationIdentity) -> OperationIdentity {
        match self {
            IdentityMatching::Exact => identity.clone(),
            IdentityMatching::CaseInsensitive => identity.to_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_components() {
        let err = OperationIdentity::new("", "Index").unwrap_err();
        assert!(matches!(
            err,
            SecurityError::InvalidArgument { argument: "namespace", .. }
        ));

        let err = OperationIdentity::new("HomeController", "").unwrap_err();
        assert!(matches!(
            err,
            SecurityError::InvalidArgument { argument: "action", .. }
        ));
    }

    #[test]
    fn test_equality_is_case_sensitive() {
        let a = OperationIdentity::new("HomeController", "Index").unwrap();
        let b = OperationIdentity::new("homecontroller", "index").unwrap();
        assert_ne!(a, b);
        assert_eq!(
            IdentityMatching::CaseInsensitive.key_for(&a),
            IdentityMatching::CaseInsensitive.key_for(&b)
        );
        assert_ne!(
            IdentityMatching::Exact.key_for(&a),
            IdentityMatching::Exact.key_for(&b)
        );
    }

    #[test]
    fn test_display() {
        let identity = OperationIdentity::new("AccountController", "Edit").unwrap();
        assert_eq!(identity.to_string(), "AccountController/Edit");
    }
}
