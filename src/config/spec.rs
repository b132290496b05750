//! Configuration document types for the reconciler.
//!
//! This module defines the structs that map to `vault-converge.yaml`. The
//! document lists the managed instances and, per object kind, the desired
//! objects each tagged with the instance it belongs to.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConvergeConfig {
    /// Managed Vault instances.
    pub instances: Vec<InstanceConfig>,
    /// Desired audit devices.
    #[serde(default, rename = "vault_audit_backends")]
    pub audit_devices: Vec<AuditDeviceConfig>,
    /// Desired secrets engines.
    #[serde(default, rename = "vault_secret_engines")]
    pub secrets_engines: Vec<SecretsEngineConfig>,
    /// Desired ACL policies.
    #[serde(default, rename = "vault_policies")]
    pub policies: Vec<PolicyConfig>,
}

/// A managed Vault instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceConfig {
    /// Base address, e.g. `https://vault.example.com:8200`.
    pub address: String,
    /// Environment variable holding the token for this instance.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

/// Reference from a desired object to the instance it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceRef {
    /// Instance address.
    pub address: String,
}

/// A desired audit device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditDeviceConfig {
    /// Device path.
    #[serde(rename = "_path")]
    pub path: String,
    /// Device type (`file`, `syslog`, `socket`).
    #[serde(rename = "type")]
    pub device_type: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Owning instance.
    pub instance: InstanceRef,
    /// Device options.
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

/// A desired secrets engine mount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecretsEngineConfig {
    /// Mount path.
    #[serde(rename = "_path")]
    pub path: String,
    /// Engine type (`kv`, `pki`, `transit`, ...).
    #[serde(rename = "type")]
    pub engine_type: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Owning instance.
    pub instance: InstanceRef,
    /// Engine options.
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

/// A desired ACL policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Policy name.
    pub name: String,
    /// Policy type; only `acl` is managed.
    #[serde(rename = "type", default = "default_policy_type")]
    pub policy_type: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Owning instance.
    pub instance: InstanceRef,
    /// Policy rules in HCL.
    pub rules: String,
}

fn default_token_env() -> String {
    String::from("VAULT_TOKEN")
}

fn default_policy_type() -> String {
    String::from("acl")
}

impl ConvergeConfig {
    /// Returns the configured instance addresses in document order.
    #[must_use]
    pub fn addresses(&self) -> Vec<String> {
        self.instances.iter().map(|i| i.address.clone()).collect()
    }

    /// Returns the total number of desired objects across all kinds.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.audit_devices.len() + self.secrets_engines.len() + self.policies.len()
    }
}

impl InstanceRef {
    /// Creates a reference to the instance at `address`.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}
