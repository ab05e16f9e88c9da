// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Security Handler
//!
//! Single entry point the web binding calls for every protected operation.
//!
//! ## Processing Pipeline
//!
//! ```text
//! handle_security_for(namespace, action, &context)
//!   └─ OperationIdentity::new(..)                  ← InvalidArgument on empty components
//!   └─ PolicyRegistry::lookup(identity)
//!         ├─ Some(chain)
//!         │    └─ PolicyChain::enforce_policies   ← timed, every policy runs
//!         │    └─ first violation?
//!         │          ├─ yes → selector → handler.handle(record) → Some(response)
//!         │          └─ no  → None (allowed)
//!         └─ None
//!              ├─ ignore_missing_configuration → None
//!              └─ otherwise → MissingConfiguration
//! ```
//!
//! Runtime events emitted for a request carry the context's correlation id.
//! Emission never changes the outcome.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::configuration::ConfigurationProvider;
use crate::domain::error::{SecurityError, SecurityResult};
use crate::domain::identity::OperationIdentity;
use crate::domain::security_context::SecurityContext;
use crate::domain::violation::{
    UnhandledViolationHandler, ViolationHandler, ViolationHandlerSelector, ViolationRecord,
};
use crate::infrastructure::event_log::EventLog;

pub struct SecurityHandler<R> {
    configuration: Arc<dyn ConfigurationProvider>,
    selector: Arc<dyn ViolationHandlerSelector<R>>,
    event_log: EventLog,
}

impl<R> SecurityHandler<R> {
    pub fn new(
        configuration: Arc<dyn ConfigurationProvider>,
        selector: Arc<dyn ViolationHandlerSelector<R>>,
        event_log: EventLog,
    ) -> Self {
        Self {
            configuration,
            selector,
            event_log,
        }
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// Authorizes one request.
    ///
    /// Returns `Ok(None)` when access is allowed (or the missing configuration is
    /// ignored) and `Ok(Some(response))` when a violation handler produced a
    /// response.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` - `namespace` or `action` is empty
    /// - `MissingConfiguration` - no chain is bound and missing configuration is not ignored
    /// - `PolicyMaterialization` - a lazy policy in the chain could not be loaded
    /// - `UnhandledViolation` - a policy was violated and no handler matched
    pub fn handle_security_for(
        &self,
        namespace: &str,
        action: &str,
        context: &SecurityContext,
    ) -> SecurityResult<Option<R>> {
        let identity = OperationIdentity::new(namespace, action)?;
        self.handle_security_for_identity(&identity, context)
    }

    pub fn handle_security_for_identity(
        &self,
        identity: &OperationIdentity,
        context: &SecurityContext,
    ) -> SecurityResult<Option<R>> {
        let correlation_id = context.id();
        self.event_log.runtime_event(correlation_id, || {
            format!(
                "Handling security for {} action {}.",
                identity.namespace(),
                identity.action()
            )
        });

        let configuration = self.configuration.current_configuration();

        if let Some(chain) = configuration.registry().lookup(identity) {
            let results = self.event_log.timing_of(
                || chain.enforce_policies(context),
                || "Enforcing policies.".to_string(),
                correlation_id,
            )?;

            if let Some(violation) = results.into_iter().find_map(ViolationRecord::from_result) {
                self.event_log.runtime_event(correlation_id, || {
                    format!("Policy violation occurred! {}.", violation.policy_kind())
                });
                debug!(
                    correlation_id = %correlation_id,
                    "Policy {} violated for {}: {}",
                    violation.policy_kind(),
                    identity,
                    violation.message()
                );
                metrics::counter!(
                    "aegis_guard_policy_violations_total",
                    "policy" => violation.policy_kind().to_string()
                )
                .increment(1);

                let handler: Arc<dyn ViolationHandler<R>> = match self.selector.find_handler_for(&violation) {
                    Some(handler) => handler,
                    None => {
                        warn!("No violation handler matches policy {}", violation.policy_kind());
                        Arc::new(UnhandledViolationHandler)
                    }
                };
                self.event_log.runtime_event(correlation_id, || {
                    format!("Handling policy violation with {}.", handler.name())
                });
                record_outcome("violation");
                return handler.handle(&violation).map(Some);
            }

            self.event_log
                .runtime_event(correlation_id, || "Success! All policies were met.".to_string());
            record_outcome("allowed");
            return Ok(None);
        }

        if configuration.should_ignore_missing_configuration() {
            self.event_log
                .runtime_event(correlation_id, || "Missing configuration. Ignored.".to_string());
            record_outcome("ignored");
            return Ok(None);
        }

        warn!("Security has not been configured for {}", identity);
        record_outcome("misconfigured");
        Err(SecurityError::MissingConfiguration(identity.clone()))
    }
}

fn record_outcome(outcome: &'static str) {
    metrics::counter!("aegis_guard_requests_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::configuration::{
        AdvancedConfiguration, SecurityConfiguration, StaticConfigurationProvider,
    };
    use crate::domain::policy::{PolicyKind, PolicyRef, PolicyResult, SecurityPolicy};
    use crate::domain::policy_chain::PolicyChain;
    use crate::domain::registry::PolicyRegistry;
    use crate::domain::violation::{FnViolationHandler, OrderedViolationHandlerSelector};
    use crate::infrastructure::event_log::InMemoryEventListener;

    struct Deny(&'static str);

    impl SecurityPolicy for Deny {
        fn kind(&self) -> PolicyKind {
            PolicyKind::new(self.0)
        }

        fn enforce(&self, _context: &SecurityContext) -> PolicyResult {
            PolicyResult::violation(self.kind(), "denied")
        }
    }

    fn handler_for(
        chain: PolicyChain,
        selector: OrderedViolationHandlerSelector<String>,
        ignore_missing: bool,
    ) -> (SecurityHandler<String>, Arc<InMemoryEventListener>) {
        let registry = PolicyRegistry::builder()
            .register(OperationIdentity::new("Blog", "Post").unwrap(), chain)
            .build()
            .unwrap();
        let configuration = SecurityConfiguration::new(
            registry,
            AdvancedConfiguration::default().ignore_missing_configuration(ignore_missing),
        );
        let listener = Arc::new(InMemoryEventListener::new());
        let handler = SecurityHandler::new(
            Arc::new(StaticConfigurationProvider::new(configuration)),
            Arc::new(selector),
            EventLog::with_listener(listener.clone()),
        );
        (handler, listener)
    }

    #[test]
    fn test_empty_arguments_rejected_before_lookup() {
        let (handler, listener) = handler_for(PolicyChain::empty(), OrderedViolationHandlerSelector::new(), false);
        let ctx = SecurityContext::anonymous();

        assert!(matches!(
            handler.handle_security_for("", "Post", &ctx),
            Err(SecurityError::InvalidArgument { argument: "namespace", .. })
        ));
        assert!(matches!(
            handler.handle_security_for("Blog", "", &ctx),
            Err(SecurityError::InvalidArgument { argument: "action", .. })
        ));
        assert!(listener.events().is_empty());
    }

    #[test]
    fn test_matched_handler_response_is_returned() {
        let selector = OrderedViolationHandlerSelector::new().on_policy(
            "Deny",
            Arc::new(FnViolationHandler::new("Forbidden", |v: &ViolationRecord| {
                Ok::<_, SecurityError>(format!("403 {}", v.policy_kind()))
            })),
        );
        let (handler, _) = handler_for(PolicyChain::empty().with(PolicyRef::eager(Deny("Deny"))), selector, false);

        let response = handler
            .handle_security_for("Blog", "Post", &SecurityContext::anonymous())
            .unwrap();
        assert_eq!(response.as_deref(), Some("403 Deny"));
    }

    #[test]
    fn test_unmatched_violation_is_fatal() {
        let (handler, listener) = handler_for(
            PolicyChain::empty().with(PolicyRef::eager(Deny("Deny"))),
            OrderedViolationHandlerSelector::new(),
            false,
        );

        let err = handler
            .handle_security_for("Blog", "Post", &SecurityContext::anonymous())
            .unwrap_err();
        assert!(matches!(err, SecurityError::UnhandledViolation(ref r) if r.policy_kind().as_str() == "Deny"));
        assert_eq!(
            listener.messages().last().map(String::as_str),
            Some("Handling policy violation with UnhandledViolationHandler.")
        );
    }

    #[test]
    fn test_missing_configuration_ignored_emits_event() {
        let (handler, listener) = handler_for(PolicyChain::empty(), OrderedViolationHandlerSelector::new(), true);
        let result = handler
            .handle_security_for("Other", "Index", &SecurityContext::anonymous())
            .unwrap();
        assert!(result.is_none());
        assert_eq!(
            listener.messages(),
            vec![
                "Handling security for Other action Index.".to_string(),
                "Missing configuration. Ignored.".to_string(),
            ]
        );
    }
}
