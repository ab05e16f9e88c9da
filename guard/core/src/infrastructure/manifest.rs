// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Security Manifest - declarative policy configuration
//
// Kubernetes-style YAML document (apiVersion/kind/metadata/spec) describing:
// - which policies protect which operations, in order
// - which violation handler answers which policy, in order
// - the advanced switches (ignore missing configuration, identity matching)
//
// Policy and handler names are resolved against a PolicyCatalog and a
// HandlerCatalog supplied by the host.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::application::configuration::{AdvancedConfiguration, SecurityConfiguration};
use crate::domain::identity::{IdentityMatching, OperationIdentity};
use crate::domain::policy::PolicyKind;
use crate::domain::policy_chain::PolicyChain;
use crate::domain::registry::PolicyRegistry;
use crate::domain::violation::{OrderedViolationHandlerSelector, ViolationMatcher};
use crate::infrastructure::catalog::{HandlerCatalog, PolicyCatalog};

pub const API_VERSION: &str = "100monkeys.ai/v1";
pub const MANIFEST_KIND: &str = "SecurityConfiguration";
pub const CONFIG_PATH_ENV: &str = "AEGIS_GUARD_CONFIG_PATH";
pub const IGNORE_MISSING_ENV: &str = "AEGIS_GUARD_IGNORE_MISSING_CONFIGURATION";

/// Top-level security manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityManifest {
    /// API version (must be "100monkeys.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "SecurityConfiguration")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: SecurityManifestSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityManifestSpec {
    /// Allow operations that have no policy chain instead of failing
    #[serde(default)]
    pub ignore_missing_configuration: bool,

    /// "exact" (default) or "case-insensitive"
    #[serde(default)]
    pub identity_matching: IdentityMatching,

    /// Protected operations, each with its ordered policy chain
    #[serde(default)]
    pub operations: Vec<OperationConfig>,

    /// Ordered handler bindings; the first matching binding wins
    #[serde(default)]
    pub violation_handlers: Vec<HandlerBindingConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationConfig {
    pub namespace: String,
    pub action: String,

    /// Policy kinds in enforcement order. Empty means "allow everyone".
    #[serde(default)]
    pub policies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerBindingConfig {
    /// Policy kind this binding answers. Omitted: every violation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,

    /// Handler name registered in the HandlerCatalog
    pub handler: String,
}

impl Default for SecurityManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: MANIFEST_KIND.to_string(),
            metadata: ManifestMetadata {
                name: "default".to_string(),
                version: None,
                labels: None,
            },
            spec: SecurityManifestSpec::default(),
        }
    }
}

impl SecurityManifest {
    /// Load manifest from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read security manifest {:?}", path))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse security manifest {:?}", path))
    }

    /// Parse manifest from YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let manifest = serde_yaml::from_str(yaml)?;
        Ok(manifest)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover the manifest using precedence order
    /// 1. AEGIS_GUARD_CONFIG_PATH environment variable
    /// 2. ./aegis-guard.yaml (working directory)
    /// 3. ~/.aegis/guard.yaml (user home)
    /// 4. /etc/aegis/guard.yaml (system, Unix) or C:\ProgramData\Aegis\guard.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./aegis-guard.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".aegis").join("guard.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/aegis/guard.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Aegis\\guard.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load the manifest from an explicit path or by discovery.
    ///
    /// An explicit path must exist and parse. Without one, a missing manifest
    /// yields an empty default, which protects nothing and fails every request
    /// unless missing configuration is ignored.
    pub fn load(cli_path: Option<PathBuf>) -> Result<Self> {
        let mut manifest = if let Some(path) = cli_path {
            tracing::info!("Loading security manifest from explicit path: {:?}", path);
            Self::from_yaml_file(&path)?
        } else if let Some(path) = Self::discover_config() {
            tracing::info!("Loading security manifest from discovered path: {:?}", path);
            Self::from_yaml_file(path)?
        } else {
            tracing::warn!("No security manifest found in standard locations. Using empty defaults.");
            Self::default()
        };
        manifest.apply_env_overrides();
        Ok(manifest)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(IGNORE_MISSING_ENV) {
            match parse_bool(&val) {
                Some(ignore) => {
                    tracing::info!("Environment override: {}={}", IGNORE_MISSING_ENV, ignore);
                    self.spec.ignore_missing_configuration = ignore;
                }
                None => {
                    tracing::warn!(
                        "Invalid value for {}: '{}'. Expected true/false. Ignoring.",
                        IGNORE_MISSING_ENV,
                        val
                    );
                }
            }
        }
    }

    /// Validate the manifest structure
    pub fn validate(&self) -> Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != MANIFEST_KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, MANIFEST_KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let mut seen = HashSet::new();
        let mut declared_policies = HashSet::new();
        for operation in &self.spec.operations {
            let identity = operation.identity()?;
            if !seen.insert(self.spec.identity_matching.key_for(&identity)) {
                anyhow::bail!("Operation {} is configured more than once", identity);
            }
            for policy in &operation.policies {
                if policy.is_empty() {
                    anyhow::bail!("Policy name cannot be empty in operation {}", identity);
                }
                declared_policies.insert(policy.as_str());
            }
        }

        for binding in &self.spec.violation_handlers {
            if binding.handler.is_empty() {
                anyhow::bail!("Violation handler name cannot be empty");
            }
            if let Some(policy) = &binding.policy {
                if !declared_policies.contains(policy.as_str()) {
                    anyhow::bail!(
                        "Violation handler '{}' is bound to policy '{}', which no operation uses",
                        binding.handler,
                        policy
                    );
                }
            }
        }

        Ok(())
    }

    /// Find the configured operation a request for `identity` would resolve to.
    pub fn find_operation(&self, identity: &OperationIdentity) -> Option<&OperationConfig> {
        let matching = self.spec.identity_matching;
        let key = matching.key_for(identity);
        self.spec.operations.iter().find(|operation| {
            operation
                .identity()
                .map(|candidate| matching.key_for(&candidate) == key)
                .unwrap_or(false)
        })
    }

    /// Build the policy registry, binding every policy as a lazy catalog entry.
    pub fn build_registry(&self, catalog: &PolicyCatalog) -> Result<PolicyRegistry> {
        self.validate()?;

        let mut builder = PolicyRegistry::builder().matching(self.spec.identity_matching);
        for operation in &self.spec.operations {
            let identity = operation.identity()?;
            let chain = operation
                .policies
                .iter()
                .map(|name| {
                    let kind = PolicyKind::new(name.as_str());
                    catalog.policy_ref(&kind).with_context(|| {
                        format!("Unknown policy '{}' configured for {}", name, identity)
                    })
                })
                .collect::<Result<PolicyChain>>()?;
            builder = builder.register(identity, chain);
        }
        Ok(builder.build()?)
    }

    pub fn into_configuration(&self, catalog: &PolicyCatalog) -> Result<SecurityConfiguration> {
        let registry = self.build_registry(catalog)?;
        let advanced =
            AdvancedConfiguration::default().ignore_missing_configuration(self.spec.ignore_missing_configuration);
        Ok(SecurityConfiguration::new(registry, advanced))
    }

    /// Build the ordered handler selector from the manifest bindings.
    pub fn build_selector<R>(&self, handlers: &HandlerCatalog<R>) -> Result<OrderedViolationHandlerSelector<R>> {
        let mut selector = OrderedViolationHandlerSelector::new();
        for binding in &self.spec.violation_handlers {
            let handler = handlers
                .get(&binding.handler)
                .with_context(|| format!("Unknown violation handler '{}'", binding.handler))?;
            let matcher = match &binding.policy {
                Some(policy) => ViolationMatcher::Policy(PolicyKind::new(policy.as_str())),
                None => ViolationMatcher::Any,
            };
            selector = selector.bind(matcher, handler);
        }
        Ok(selector)
    }
}

impl OperationConfig {
    pub fn identity(&self) -> Result<OperationIdentity> {
        OperationIdentity::new(self.namespace.as_str(), self.action.as_str())
            .with_context(|| format!("Invalid operation '{}/{}'", self.namespace, self.action))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
apiVersion: 100monkeys.ai/v1
kind: SecurityConfiguration
metadata:
  name: web-app
spec:
  ignoreMissingConfiguration: false
  identityMatching: case-insensitive
  operations:
    - namespace: AccountController
      action: Edit
      policies: [RequireLogin, RequireOwner]
    - namespace: HomeController
      action: Index
  violationHandlers:
    - policy: RequireLogin
      handler: RedirectToLogin
    - handler: Forbidden
"#;

    #[test]
    fn test_parse_sample() {
        let manifest = SecurityManifest::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(manifest.metadata.name, "web-app");
        assert_eq!(manifest.spec.identity_matching, IdentityMatching::CaseInsensitive);
        assert_eq!(manifest.spec.operations.len(), 2);
        assert_eq!(
            manifest.spec.operations[0].policies,
            vec!["RequireLogin".to_string(), "RequireOwner".to_string()]
        );
        assert!(manifest.spec.operations[1].policies.is_empty());
        assert_eq!(manifest.spec.violation_handlers[1].policy, None);
        manifest.validate().unwrap();
    }

    #[test]
    fn test_default_manifest_is_valid_and_empty() {
        let manifest = SecurityManifest::default();
        manifest.validate().unwrap();
        assert!(manifest.spec.operations.is_empty());
        assert!(!manifest.spec.ignore_missing_configuration);
    }

    #[test]
    fn test_validate_rejects_wrong_kind() {
        let mut manifest = SecurityManifest::default();
        manifest.kind = "NodeConfig".to_string();
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid kind"));
    }

    #[test]
    fn test_validate_rejects_duplicates_under_matching() {
        let mut manifest = SecurityManifest::from_yaml_str(SAMPLE).unwrap();
        manifest.spec.operations.push(OperationConfig {
            namespace: "accountcontroller".to_string(),
            action: "EDIT".to_string(),
            policies: vec![],
        });
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_validate_rejects_empty_operation() {
        let mut manifest = SecurityManifest::default();
        manifest.spec.operations.push(OperationConfig {
            namespace: "".to_string(),
            action: "Index".to_string(),
            policies: vec![],
        });
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_binding_to_unused_policy() {
        let mut manifest = SecurityManifest::from_yaml_str(SAMPLE).unwrap();
        manifest.spec.violation_handlers.push(HandlerBindingConfig {
            policy: Some("RequireAdmin".to_string()),
            handler: "Forbidden".to_string(),
        });
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("RequireAdmin"));
    }

    #[test]
    fn test_find_operation_honours_matching() {
        let manifest = SecurityManifest::from_yaml_str(SAMPLE).unwrap();
        let identity = OperationIdentity::new("accountcontroller", "edit").unwrap();
        let operation = manifest.find_operation(&identity).unwrap();
        assert_eq!(operation.namespace, "AccountController");

        let missing = OperationIdentity::new("AccountController", "Delete").unwrap();
        assert!(manifest.find_operation(&missing).is_none());
    }

    #[test]
    fn test_build_registry_fails_on_unknown_policy() {
        let manifest = SecurityManifest::from_yaml_str(SAMPLE).unwrap();
        let err = manifest.build_registry(&PolicyCatalog::new()).unwrap_err();
        assert!(format!("{:#}", err).contains("Unknown policy 'RequireLogin'"));
    }

    #[test]
    fn test_parse_bool_values() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_yaml_roundtrip_keeps_order() {
        let manifest = SecurityManifest::from_yaml_str(SAMPLE).unwrap();
        let yaml = manifest.to_yaml_string().unwrap();
        let reparsed = SecurityManifest::from_yaml_str(&yaml).unwrap();
        assert_eq!(reparsed.spec.operations, manifest.spec.operations);
        assert_eq!(reparsed.spec.violation_handlers, manifest.spec.violation_handlers);
    }
}
