// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Security Configuration
//!
//! The built [`PolicyRegistry`] plus the advanced switches that change how the
//! orchestrator treats it. A configuration is immutable once built; hosts that
//! reconfigure at runtime swap whole configurations through
//! [`SharedConfigurationProvider`] instead of mutating a registry in use.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::domain::registry::PolicyRegistry;
use crate::domain::security_context::{SecurityContext, SecurityContextBuilder};

/// Hook that enriches every context created through
/// [`SecurityConfiguration::create_context`].
pub type ContextBuilder = Arc<dyn Fn(&mut SecurityContextBuilder) + Send + Sync>;

#[derive(Clone, Default)]
pub struct AdvancedConfiguration {
    /// Treat operations without a policy chain as allowed instead of failing.
    pub ignore_missing_configuration: bool,
    /// Applied in order by [`SecurityConfiguration::create_context`].
    pub context_builders: Vec<ContextBuilder>,
}

impl AdvancedConfiguration {
    pub fn ignore_missing_configuration(mut self, ignore: bool) -> Self {
        self.ignore_missing_configuration = ignore;
        self
    }

    pub fn context_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(&mut SecurityContextBuilder) + Send + Sync + 'static,
    {
        self.context_builders.push(Arc::new(builder));
        self
    }
}

impl fmt::Debug for AdvancedConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvancedConfiguration")
            .field("ignore_missing_configuration", &self.ignore_missing_configuration)
            .field("context_builders", &self.context_builders.len())
            .finish()
    }
}

#[derive(Debug)]
pub struct SecurityConfiguration {
    registry: PolicyRegistry,
    advanced: AdvancedConfiguration,
}

impl SecurityConfiguration {
    pub fn new(registry: PolicyRegistry, advanced: AdvancedConfiguration) -> Self {
        Self { registry, advanced }
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub fn advanced(&self) -> &AdvancedConfiguration {
        &self.advanced
    }

    pub fn should_ignore_missing_configuration(&self) -> bool {
        self.advanced.ignore_missing_configuration
    }

    /// Runs the configured context builders over `builder` and builds the context.
    pub fn create_context(&self, mut builder: SecurityContextBuilder) -> SecurityContext {
        for context_builder in &self.advanced.context_builders {
            context_builder(&mut builder);
        }
        builder.build()
    }
}

/// Supplies the configuration in force for the current request.
pub trait ConfigurationProvider: Send + Sync {
    fn current_configuration(&self) -> Arc<SecurityConfiguration>;
}

/// Provider for a configuration fixed at startup.
#[derive(Debug, Clone)]
pub struct StaticConfigurationProvider {
    configuration: Arc<SecurityConfiguration>,
}

impl StaticConfigurationProvider {
    pub fn new(configuration: SecurityConfiguration) -> Self {
        Self {
            configuration: Arc::new(configuration),
        }
    }
}

impl ConfigurationProvider for StaticConfigurationProvider {
    fn current_configuration(&self) -> Arc<SecurityConfiguration> {
        Arc::clone(&self.configuration)
    }
}

/// Provider whose configuration can be replaced while requests are in flight.
///
/// Requests that already obtained a configuration keep using it; the next
/// request sees the replacement.
#[derive(Debug)]
pub struct SharedConfigurationProvider {
    current: RwLock<Arc<SecurityConfiguration>>,
}

impl SharedConfigurationProvider {
    pub fn new(configuration: SecurityConfiguration) -> Self {
        Self {
            current: RwLock::new(Arc::new(configuration)),
        }
    }

    /// Installs `configuration` and returns the one it replaced.
    pub fn replace(&self, configuration: SecurityConfiguration) -> Arc<SecurityConfiguration> {
        info!(
            "Replacing security configuration ({} configured operations)",
            configuration.registry().len()
        );
        std::mem::replace(&mut *self.current.write(), Arc::new(configuration))
    }
}

impl ConfigurationProvider for SharedConfigurationProvider {
    fn current_configuration(&self) -> Arc<SecurityConfiguration> {
        self.current.read().clone()
    }
}
