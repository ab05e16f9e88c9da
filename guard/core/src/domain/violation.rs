// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Violation Handling
//!
//! Turns the first violation of a chain into a response. The response type
//! `R` is chosen by the host (an HTTP response, a redirect, a JSON body...) and
//! is never inspected by the engine.
//!
//! ## Selection
//!
//! [`OrderedViolationHandlerSelector`] holds an explicit list of
//! `(matcher, handler)` bindings. Bindings are tried in registration order and
//! the first matcher that accepts the record wins, so when several handlers
//! could apply, the one registered earliest is used. When nothing matches, the
//! orchestrator falls back to [`UnhandledViolationHandler`], which turns the
//! violation into [`SecurityError::UnhandledViolation`].

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::domain::error::{SecurityError, SecurityResult};
use crate::domain::policy::{PolicyKind, PolicyResult, PolicyViolation};

/// The first violation reported by a chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationRecord {
    policy_kind: PolicyKind,
    violation: PolicyViolation,
}

impl ViolationRecord {
    /// Wraps a result that reports a violation; `None` for a passing result.
    pub fn from_result(result: PolicyResult) -> Option<Self> {
        let PolicyResult {
            policy_kind,
            violation,
        } = result;
        violation.map(|violation| Self {
            policy_kind,
            violation,
        })
    }

    pub fn policy_kind(&self) -> &PolicyKind {
        &self.policy_kind
    }

    pub fn violation(&self) -> &PolicyViolation {
        &self.violation
    }

    pub fn message(&self) -> &str {
        &self.violation.message
    }
}

impl fmt::Display for ViolationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.policy_kind, self.violation.message)
    }
}

/// Produces a response for a violation.
pub trait ViolationHandler<R>: Send + Sync {
    /// Name used in diagnostics. Defaults to the implementing type's name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn handle(&self, violation: &ViolationRecord) -> SecurityResult<R>;
}

/// Adapts a closure into a named [`ViolationHandler`].
pub struct FnViolationHandler<F> {
    name: String,
    handler: F,
}

impl<F> FnViolationHandler<F> {
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<R, F> ViolationHandler<R> for FnViolationHandler<F>
where
    F: Fn(&ViolationRecord) -> SecurityResult<R> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, violation: &ViolationRecord) -> SecurityResult<R> {
        (self.handler)(violation)
    }
}

/// Default handler used when no binding matches. Never produces a response.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnhandledViolationHandler;

impl<R> ViolationHandler<R> for UnhandledViolationHandler {
    fn name(&self) -> &str {
        "UnhandledViolationHandler"
    }

    fn handle(&self, violation: &ViolationRecord) -> SecurityResult<R> {
        Err(SecurityError::UnhandledViolation(violation.clone()))
    }
}

/// Maps a violation to the handler that should produce the response.
pub trait ViolationHandlerSelector<R>: Send + Sync {
    fn find_handler_for(&self, violation: &ViolationRecord) -> Option<Arc<dyn ViolationHandler<R>>>;
}

pub type ViolationPredicate = Arc<dyn Fn(&ViolationRecord) -> bool + Send + Sync>;

/// Condition under which a handler binding applies.
#[derive(Clone)]
pub enum ViolationMatcher {
    /// Violations reported by the given policy kind.
    Policy(PolicyKind),
    /// Violations accepted by an arbitrary predicate.
    Predicate {
        description: String,
        predicate: ViolationPredicate,
    },
    /// Every violation.
    Any,
}

impl ViolationMatcher {
    pub fn matches(&self, violation: &ViolationRecord) -> bool {
        match self {
            ViolationMatcher::Policy(kind) => violation.policy_kind() == kind,
            ViolationMatcher::Predicate { predicate, .. } => predicate(violation),
            ViolationMatcher::Any => true,
        }
    }
}

impl fmt::Debug for ViolationMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationMatcher::Policy(kind) => f.debug_tuple("Policy").field(kind).finish(),
            ViolationMatcher::Predicate { description, .. } => {
                f.debug_tuple("Predicate").field(description).finish()
            }
            ViolationMatcher::Any => f.write_str("Any"),
        }
    }
}

impl fmt::Display for ViolationMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationMatcher::Policy(kind) => write!(f, "policy {}", kind),
            ViolationMatcher::Predicate { description, .. } => write!(f, "predicate {}", description),
            ViolationMatcher::Any => f.write_str("any violation"),
        }
    }
}

/// First-match-wins selector over an explicit list of bindings.
pub struct OrderedViolationHandlerSelector<R> {
    bindings: Vec<(ViolationMatcher, Arc<dyn ViolationHandler<R>>)>,
}

impl<R> Default for OrderedViolationHandlerSelector<R> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }
}

impl<R> fmt::Debug for OrderedViolationHandlerSelector<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.describe()).finish()
    }
}

impl<R> OrderedViolationHandlerSelector<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, matcher: ViolationMatcher, handler: Arc<dyn ViolationHandler<R>>) -> Self {
        self.bindings.push((matcher, handler));
        self
    }

    pub fn on_policy(self, kind: impl Into<PolicyKind>, handler: Arc<dyn ViolationHandler<R>>) -> Self {
        self.bind(ViolationMatcher::Policy(kind.into()), handler)
    }

    pub fn on_match<P>(
        self,
        description: impl Into<String>,
        predicate: P,
        handler: Arc<dyn ViolationHandler<R>>,
    ) -> Self
    where
        P: Fn(&ViolationRecord) -> bool + Send + Sync + 'static,
    {
        self.bind(
            ViolationMatcher::Predicate {
                description: description.into(),
                predicate: Arc::new(predicate),
            },
            handler,
        )
    }

    pub fn on_any(self, handler: Arc<dyn ViolationHandler<R>>) -> Self {
        self.bind(ViolationMatcher::Any, handler)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings as `(matcher, handler name)`, in evaluation order.
    pub fn describe(&self) -> Vec<(String, String)> {
        self.bindings
            .iter()
            .map(|(matcher, handler)| (matcher.to_string(), handler.name().to_string()))
            .collect()
    }
}

impl<R> ViolationHandlerSelector<R> for OrderedViolationHandlerSelector<R> {
    fn find_handler_for(&self, violation: &ViolationRecord) -> Option<Arc<dyn ViolationHandler<R>>> {
        self.bindings
            .iter()
            .find(|(matcher, _)| matcher.matches(violation))
            .map(|(_, handler)| Arc::clone(handler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str, message: &str) -> ViolationRecord {
        ViolationRecord::from_result(PolicyResult::violation(PolicyKind::new(kind), message)).unwrap()
    }

    fn named(name: &'static str) -> Arc<dyn ViolationHandler<String>> {
        Arc::new(FnViolationHandler::new(name, move |_: &ViolationRecord| {
            Ok::<_, SecurityError>(name.to_string())
        }))
    }

    #[test]
    fn test_record_only_from_violations() {
        assert!(ViolationRecord::from_result(PolicyResult::success(PolicyKind::new("A"))).is_none());
        let r = record("A", "denied");
        assert_eq!(r.policy_kind().as_str(), "A");
        assert_eq!(r.message(), "denied");
        assert_eq!(r.to_string(), "A (denied)");
    }

    #[test]
    fn test_selects_by_policy_kind() {
        let selector = OrderedViolationHandlerSelector::new()
            .on_policy("RequireLogin", named("RedirectToLogin"))
            .on_policy("RequireRole", named("Forbidden"));

        let handler = selector.find_handler_for(&record("RequireRole", "x")).unwrap();
        assert_eq!(handler.name(), "Forbidden");
        assert_eq!(handler.handle(&record("RequireRole", "x")).unwrap(), "Forbidden");
    }

    #[test]
    fn test_first_registered_binding_wins() {
        let selector = OrderedViolationHandlerSelector::new()
            .on_match(
                "message mentions admin",
                |v: &ViolationRecord| v.message().contains("Admin"),
                named("AdminOnly"),
            )
            .on_policy("RequireRole", named("Forbidden"))
            .on_any(named("CatchAll"));

        let admin = selector
            .find_handler_for(&record("RequireRole", "requires Admin"))
            .unwrap();
        assert_eq!(admin.name(), "AdminOnly");

        let role = selector
            .find_handler_for(&record("RequireRole", "requires Editor"))
            .unwrap();
        assert_eq!(role.name(), "Forbidden");

        let other = selector.find_handler_for(&record("Other", "x")).unwrap();
        assert_eq!(other.name(), "CatchAll");
    }

    #[test]
    fn test_no_match_returns_none() {
        let selector = OrderedViolationHandlerSelector::new().on_policy("A", named("H"));
        assert!(selector.find_handler_for(&record("B", "x")).is_none());
    }

    #[test]
    fn test_unhandled_handler_resignals_violation() {
        let handler: &dyn ViolationHandler<String> = &UnhandledViolationHandler;
        let err = handler.handle(&record("RequireLogin", "anonymous")).unwrap_err();
        match err {
            SecurityError::UnhandledViolation(r) => assert_eq!(r.policy_kind().as_str(), "RequireLogin"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_describe_lists_bindings_in_order() {
        let selector = OrderedViolationHandlerSelector::new()
            .on_policy("RequireLogin", named("RedirectToLogin"))
            .on_any(named("CatchAll"));
        assert_eq!(
            selector.describe(),
            vec![
                ("policy RequireLogin".to_string(), "RedirectToLogin".to_string()),
                ("any violation".to_string(), "CatchAll".to_string()),
            ]
        );
    }

    #[test]
    fn test_debug_lists_bindings() {
        let selector = OrderedViolationHandlerSelector::new().on_policy("A", named("H"));
        assert_eq!(format!("{:?}", selector), r#"[("policy A", "H")]"#);
    }
}
