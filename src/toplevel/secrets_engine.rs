//! Secrets engines (mounts).

use async_trait::async_trait;

use crate::config::{ConvergeConfig, SecretsEngineConfig};
use crate::error::Result;
use crate::item::{
    Options, Reconcilable, ambiguous_options, equal_path_names, normalize_path, options_equal,
};
use crate::planner::{ObjectKind, ReconcileContext};
use crate::vault::{BackendInfo, BackendRequest, VaultApi};

/// Mount path prefixes owned by Vault itself.
const DEFAULT_MOUNTS: &[&str] = &["cubbyhole/", "identity/", "secret/", "sys/"];

/// A secrets engine mounted on one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsEngineEntry {
    /// Mount path, with exactly one trailing slash.
    pub path: String,
    /// Engine type.
    pub engine_type: String,
    /// Free-form description.
    pub description: String,
    /// Normalized options.
    pub options: Options,
    /// Owning instance address.
    pub instance: String,
}

/// The secrets engine object kind.
#[derive(Debug, Clone, Default)]
pub struct SecretsEngines {
    entries: Vec<SecretsEngineEntry>,
}

impl SecretsEngineEntry {
    /// Creates an entry from a mount listed by an instance.
    #[must_use]
    pub fn observed(address: &str, path: &str, info: &BackendInfo) -> Self {
        Self {
            path: normalize_path(path),
            engine_type: info.backend_type.clone(),
            description: info.description.clone(),
            options: info.normalized_options(),
            instance: address.to_string(),
        }
    }

    fn request(&self) -> BackendRequest {
        BackendRequest {
            backend_type: self.engine_type.clone(),
            description: self.description.clone(),
            options: self.options.clone(),
        }
    }
}

impl From<&SecretsEngineConfig> for SecretsEngineEntry {
    fn from(config: &SecretsEngineConfig) -> Self {
        Self {
            path: normalize_path(&config.path),
            engine_type: config.engine_type.clone(),
            description: config.description.clone(),
            options: ambiguous_options(&config.options),
            instance: config.instance.address.clone(),
        }
    }
}

impl Reconcilable for SecretsEngineEntry {
    fn key(&self) -> &str {
        &self.path
    }

    fn equals(&self, other: &Self) -> bool {
        equal_path_names(&self.path, &other.path)
            && self.engine_type == other.engine_type
            && self.description == other.description
            && options_equal(&self.options, &other.options)
    }

    fn key_for_type(&self) -> &str {
        &self.engine_type
    }

    fn key_for_description(&self) -> &str {
        &self.description
    }
}

impl SecretsEngines {
    /// Creates the kind from desired mounts of all instances.
    #[must_use]
    pub const fn new(entries: Vec<SecretsEngineEntry>) -> Self {
        Self { entries }
    }

    /// Creates the kind from the `vault_secret_engines` section.
    #[must_use]
    pub fn from_config(config: &ConvergeConfig) -> Self {
        Self::new(config.secrets_engines.iter().map(SecretsEngineEntry::from).collect())
    }
}

#[async_trait]
impl ObjectKind for SecretsEngines {
    type Item = SecretsEngineEntry;

    const KIND: &'static str = "secrets engine";

    fn desired(&self, address: &str) -> Vec<SecretsEngineEntry> {
        self.entries
            .iter()
            .filter(|e| e.instance == address)
            .cloned()
            .collect()
    }

    async fn fetch(
        &self,
        ctx: &ReconcileContext,
        address: &str,
    ) -> Result<Vec<SecretsEngineEntry>> {
        let mounts = ctx.vault.list_secrets_engines(address).await?;
        Ok(mounts
            .iter()
            .map(|(path, info)| SecretsEngineEntry::observed(address, path, info))
            .collect())
    }

    fn is_protected(&self, item: &SecretsEngineEntry) -> bool {
        is_default_mount(&item.path)
    }

    async fn create(
        &self,
        vault: &dyn VaultApi,
        address: &str,
        item: &SecretsEngineEntry,
    ) -> Result<()> {
        vault.enable_secrets_engine(address, &item.path, &item.request()).await
    }

    async fn update(
        &self,
        vault: &dyn VaultApi,
        address: &str,
        item: &SecretsEngineEntry,
    ) -> Result<()> {
        // Tuning cannot change the engine type; only description and options move.
        let request = BackendRequest {
            backend_type: String::new(),
            ..item.request()
        };
        vault.tune_secrets_engine(address, &item.path, &request).await
    }

    async fn delete(
        &self,
        vault: &dyn VaultApi,
        address: &str,
        item: &SecretsEngineEntry,
    ) -> Result<()> {
        vault.disable_secrets_engine(address, &item.path).await
    }
}

/// Returns true for mounts under Vault's built-in paths.
#[must_use]
pub fn is_default_mount(path: &str) -> bool {
    let path = normalize_path(path);
    DEFAULT_MOUNTS.iter().any(|prefix| path.starts_with(prefix))
}
