//! ACL policies.
//!
//! Observed policies need one read per name, so fetching fans out through the
//! bounded pool.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::config::{ConvergeConfig, PolicyConfig};
use crate::error::Result;
use crate::item::Reconcilable;
use crate::planner::{ObjectKind, ReconcileContext};
use crate::pool::BoundedPool;
use crate::vault::VaultApi;

/// Built-in policies that are never deleted.
const DEFAULT_POLICIES: &[&str] = &["root", "default"];

/// Length of the rules digest shown in dry-run output.
const DIGEST_LEN: usize = 12;

/// An ACL policy on one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEntry {
    /// Policy name.
    pub name: String,
    /// Policy rules in HCL.
    pub rules: String,
    /// Policy type.
    pub policy_type: String,
    /// Free-form description.
    pub description: String,
    /// Owning instance address.
    pub instance: String,
}

/// The policy object kind.
#[derive(Debug, Clone, Default)]
pub struct Policies {
    entries: Vec<PolicyEntry>,
}

impl PolicyEntry {
    /// Creates a desired ACL policy.
    #[must_use]
    pub fn desired(address: &str, name: &str, rules: &str) -> Self {
        Self {
            name: name.to_string(),
            rules: rules.to_string(),
            policy_type: String::from("acl"),
            description: String::new(),
            instance: address.to_string(),
        }
    }

    /// Creates a policy as read back from an instance.
    ///
    /// Vault does not store a description, so observed policies have none.
    #[must_use]
    pub fn observed(address: &str, name: &str, rules: String) -> Self {
        Self {
            name: name.to_string(),
            rules,
            policy_type: String::from("acl"),
            description: String::new(),
            instance: address.to_string(),
        }
    }
}

impl From<&PolicyConfig> for PolicyEntry {
    fn from(config: &PolicyConfig) -> Self {
        Self {
            name: config.name.clone(),
            rules: config.rules.clone(),
            policy_type: config.policy_type.clone(),
            description: config.description.clone(),
            instance: config.instance.address.clone(),
        }
    }
}

impl Reconcilable for PolicyEntry {
    fn key(&self) -> &str {
        &self.name
    }

    fn equals(&self, other: &Self) -> bool {
        self.name == other.name && self.rules == other.rules
    }

    fn key_for_type(&self) -> &str {
        &self.policy_type
    }

    fn key_for_description(&self) -> &str {
        &self.description
    }
}

impl Policies {
    /// Creates the kind from desired policies of all instances.
    #[must_use]
    pub const fn new(entries: Vec<PolicyEntry>) -> Self {
        Self { entries }
    }

    /// Creates the kind from the `vault_policies` section.
    #[must_use]
    pub fn from_config(config: &ConvergeConfig) -> Self {
        Self::new(config.policies.iter().map(PolicyEntry::from).collect())
    }
}

#[async_trait]
impl ObjectKind for Policies {
    type Item = PolicyEntry;

    const KIND: &'static str = "policy";

    fn desired(&self, address: &str) -> Vec<PolicyEntry> {
        self.entries
            .iter()
            .filter(|e| e.instance == address)
            .cloned()
            .collect()
    }

    async fn fetch(&self, ctx: &ReconcileContext, address: &str) -> Result<Vec<PolicyEntry>> {
        let names = ctx.vault.list_policies(address).await?;
        let pool = BoundedPool::new(ctx.thread_pool_size)?;

        let reads = pool
            .run(names, |name| {
                let vault = Arc::clone(&ctx.vault);
                let address = address.to_string();
                async move {
                    vault
                        .read_policy(&address, &name)
                        .await
                        .map(|rules| PolicyEntry::observed(&address, &name, rules))
                }
            })
            .await?;

        let mut policies = reads.into_iter().collect::<Result<Vec<_>>>()?;
        policies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(policies)
    }

    fn is_protected(&self, item: &PolicyEntry) -> bool {
        is_default_policy(&item.name)
    }

    fn describe(&self, item: &PolicyEntry) -> Option<String> {
        Some(format!("rules sha256:{}", rules_digest(&item.rules)))
    }

    async fn create(&self, vault: &dyn VaultApi, address: &str, item: &PolicyEntry) -> Result<()> {
        vault.write_policy(address, &item.name, &item.rules).await
    }

    async fn update(&self, vault: &dyn VaultApi, address: &str, item: &PolicyEntry) -> Result<()> {
        vault.write_policy(address, &item.name, &item.rules).await
    }

    async fn delete(&self, vault: &dyn VaultApi, address: &str, item: &PolicyEntry) -> Result<()> {
        vault.delete_policy(address, &item.name).await
    }
}

/// Returns true for the built-in `root` and `default` policies.
#[must_use]
pub fn is_default_policy(name: &str) -> bool {
    DEFAULT_POLICIES.contains(&name)
}

/// Returns a short hex SHA-256 digest of policy rules.
#[must_use]
pub fn rules_digest(rules: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rules.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(DIGEST_LEN);
    digest
}
