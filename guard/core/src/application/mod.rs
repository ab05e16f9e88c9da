// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod configuration;
pub mod security_handler;

pub use configuration::{
    AdvancedConfiguration, ConfigurationProvider, ContextBuilder, SecurityConfiguration,
    SharedConfigurationProvider, StaticConfigurationProvider,
};
pub use security_handler::SecurityHandler;
