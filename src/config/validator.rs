//! Configuration validation.
//!
//! A document that fails validation is rejected before any instance is
//! contacted: every desired object must belong to a configured instance, and
//! keys must be unique per kind and instance, since the diff engine assumes
//! both.

use crate::error::{ConfigError, Result};
use crate::item::normalize_path;
use crate::toplevel::{is_default_mount, is_default_policy};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{ConvergeConfig, InstanceConfig};

/// Validator for reconciler configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all issues found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Errors, in document order.
    pub errors: Vec<ConfigError>,
    /// Non-fatal issues.
    pub warnings: Vec<String>,
}

/// Tracks keys already seen for one object kind.
struct KeySet<'a> {
    kind: &'static str,
    known: &'a HashSet<&'a str>,
    seen: HashSet<(String, String)>,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns the first error found.
    pub fn validate(&self, config: &ConvergeConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_instances(&config.instances, &mut result);
        let known: HashSet<&str> = config.instances.iter().map(|i| i.address.as_str()).collect();

        Self::validate_audit_devices(config, &known, &mut result);
        Self::validate_secrets_engines(config, &known, &mut result);
        Self::validate_policies(config, &known, &mut result);
        Self::warn_unmanaged_instances(config, &mut result);

        if result.errors.is_empty() {
            debug!(warnings = result.warnings.len(), "Configuration validation passed");
            return Ok(result);
        }

        let first = result.errors.swap_remove(0);
        Err(first.into())
    }

    fn validate_instances(instances: &[InstanceConfig], result: &mut ValidationResult) {
        if instances.is_empty() {
            result.errors.push(ConfigError::validation(
                "At least one instance must be configured",
                "instances",
            ));
        }

        let mut seen = HashSet::new();
        for (i, instance) in instances.iter().enumerate() {
            let field = format!("instances[{i}]");

            if !instance.address.starts_with("http://")
                && !instance.address.starts_with("https://")
            {
                result.errors.push(ConfigError::validation(
                    format!("Address '{}' must start with http:// or https://", instance.address),
                    format!("{field}.address"),
                ));
            }
            if instance.address.ends_with('/') {
                result.warnings.push(format!(
                    "{field}.address: trailing slash in '{}' is part of the instance key",
                    instance.address
                ));
            }
            if instance.token_env.trim().is_empty() {
                result.errors.push(ConfigError::validation(
                    "Token variable name cannot be empty",
                    format!("{field}.token_env"),
                ));
            }
            if !seen.insert(instance.address.as_str()) {
                result.errors.push(ConfigError::validation(
                    format!("Instance '{}' is listed twice", instance.address),
                    format!("{field}.address"),
                ));
            }
        }
    }

    fn validate_audit_devices(
        config: &ConvergeConfig,
        known: &HashSet<&str>,
        result: &mut ValidationResult,
    ) {
        let mut keys = KeySet::new("audit device", known);

        for (i, device) in config.audit_devices.iter().enumerate() {
            let field = format!("vault_audit_backends[{i}]");
            require(&device.path, &field, "_path", result);
            require(&device.device_type, &field, "type", result);
            keys.check(&device.instance.address, &normalize_path(&device.path), result);
        }
    }

    fn validate_secrets_engines(
        config: &ConvergeConfig,
        known: &HashSet<&str>,
        result: &mut ValidationResult,
    ) {
        let mut keys = KeySet::new("secrets engine", known);

        for (i, engine) in config.secrets_engines.iter().enumerate() {
            let field = format!("vault_secret_engines[{i}]");
            require(&engine.path, &field, "_path", result);
            require(&engine.engine_type, &field, "type", result);

            let path = normalize_path(&engine.path);
            if is_default_mount(&path) {
                result.warnings.push(format!(
                    "{field}: '{path}' is a built-in mount and is never disabled"
                ));
            }
            keys.check(&engine.instance.address, &path, result);
        }
    }

    fn validate_policies(
        config: &ConvergeConfig,
        known: &HashSet<&str>,
        result: &mut ValidationResult,
    ) {
        let mut keys = KeySet::new("policy", known);

        for (i, policy) in config.policies.iter().enumerate() {
            let field = format!("vault_policies[{i}]");
            require(&policy.name, &field, "name", result);

            if policy.policy_type != "acl" {
                result.errors.push(ConfigError::validation(
                    format!(
                        "Unsupported policy type '{}', only 'acl' is managed",
                        policy.policy_type
                    ),
                    format!("{field}.type"),
                ));
            }
            if policy.rules.trim().is_empty() {
                result.warnings.push(format!("{field}: policy '{}' has no rules", policy.name));
            }
            if is_default_policy(&policy.name) {
                result.warnings.push(format!(
                    "{field}: '{}' is a built-in policy and is never deleted",
                    policy.name
                ));
            }
            keys.check(&policy.instance.address, &policy.name, result);
        }
    }

    /// Warns about instances with no desired objects at all: a live run
    /// deletes every unprotected object on them.
    fn warn_unmanaged_instances(config: &ConvergeConfig, result: &mut ValidationResult) {
        for instance in &config.instances {
            let address = instance.address.as_str();
            let owned = config.audit_devices.iter().any(|d| d.instance.address == address)
                || config.secrets_engines.iter().any(|e| e.instance.address == address)
                || config.policies.iter().any(|p| p.instance.address == address);

            if !owned {
                result.warnings.push(format!(
                    "instance {address} has no desired objects; \
                     all unprotected objects on it will be removed"
                ));
            }
        }
    }
}

impl<'a> KeySet<'a> {
    fn new(kind: &'static str, known: &'a HashSet<&'a str>) -> Self {
        Self {
            kind,
            known,
            seen: HashSet::new(),
        }
    }

    fn check(&mut self, address: &str, key: &str, result: &mut ValidationResult) {
        if !self.known.contains(address) {
            result.errors.push(ConfigError::UnknownInstance {
                kind: self.kind.to_string(),
                key: key.to_string(),
                address: address.to_string(),
            });
            return;
        }

        if !self.seen.insert((address.to_string(), key.to_string())) {
            result.errors.push(ConfigError::DuplicateKey {
                kind: self.kind.to_string(),
                instance: address.to_string(),
                key: key.to_string(),
            });
        }
    }
}

fn require(value: &str, field: &str, name: &str, result: &mut ValidationResult) {
    if value.trim().is_empty() {
        result.errors.push(ConfigError::validation(
            format!("{name} cannot be empty"),
            format!("{field}.{name}"),
        ));
    }
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}
