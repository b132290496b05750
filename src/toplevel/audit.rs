//! Audit devices.
//!
//! Vault cannot modify an audit device in place, so an update disables the
//! device and enables it again with the desired settings.

use async_trait::async_trait;
use tracing::warn;

use crate::config::{AuditDeviceConfig, ConvergeConfig};
use crate::error::Result;
use crate::item::{
    Options, Reconcilable, ambiguous_options, equal_path_names, normalize_path, options_equal,
};
use crate::planner::{ObjectKind, ReconcileContext};
use crate::vault::{BackendInfo, BackendRequest, VaultApi};

/// An audit device enabled on one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditDeviceEntry {
    /// Device path, with exactly one trailing slash.
    pub path: String,
    /// Device type.
    pub device_type: String,
    /// Free-form description.
    pub description: String,
    /// Normalized options.
    pub options: Options,
    /// Owning instance address.
    pub instance: String,
}

/// The audit device object kind.
#[derive(Debug, Clone, Default)]
pub struct AuditDevices {
    entries: Vec<AuditDeviceEntry>,
}

impl AuditDeviceEntry {
    /// Creates an entry from a device listed by an instance.
    #[must_use]
    pub fn observed(address: &str, path: &str, info: &BackendInfo) -> Self {
        Self {
            path: normalize_path(path),
            device_type: info.backend_type.clone(),
            description: info.description.clone(),
            options: info.normalized_options(),
            instance: address.to_string(),
        }
    }

    fn request(&self) -> BackendRequest {
        BackendRequest {
            backend_type: self.device_type.clone(),
            description: self.description.clone(),
            options: self.options.clone(),
        }
    }
}

impl From<&AuditDeviceConfig> for AuditDeviceEntry {
    fn from(config: &AuditDeviceConfig) -> Self {
        Self {
            path: normalize_path(&config.path),
            device_type: config.device_type.clone(),
            description: config.description.clone(),
            options: ambiguous_options(&config.options),
            instance: config.instance.address.clone(),
        }
    }
}

impl Reconcilable for AuditDeviceEntry {
    fn key(&self) -> &str {
        &self.path
    }

    fn equals(&self, other: &Self) -> bool {
        equal_path_names(&self.path, &other.path)
            && self.device_type == other.device_type
            && self.description == other.description
            && options_equal(&self.options, &other.options)
    }

    fn key_for_type(&self) -> &str {
        &self.device_type
    }

    fn key_for_description(&self) -> &str {
        &self.description
    }
}

impl AuditDevices {
    /// Creates the kind from desired devices of all instances.
    #[must_use]
    pub const fn new(entries: Vec<AuditDeviceEntry>) -> Self {
        Self { entries }
    }

    /// Creates the kind from the `vault_audit_backends` section.
    #[must_use]
    pub fn from_config(config: &ConvergeConfig) -> Self {
        Self::new(config.audit_devices.iter().map(AuditDeviceEntry::from).collect())
    }
}

#[async_trait]
impl ObjectKind for AuditDevices {
    type Item = AuditDeviceEntry;

    const KIND: &'static str = "audit device";

    fn desired(&self, address: &str) -> Vec<AuditDeviceEntry> {
        self.entries
            .iter()
            .filter(|e| e.instance == address)
            .cloned()
            .collect()
    }

    async fn fetch(&self, ctx: &ReconcileContext, address: &str) -> Result<Vec<AuditDeviceEntry>> {
        let devices = ctx.vault.list_audit_devices(address).await?;
        Ok(devices
            .iter()
            .map(|(path, info)| AuditDeviceEntry::observed(address, path, info))
            .collect())
    }

    async fn create(
        &self,
        vault: &dyn VaultApi,
        address: &str,
        item: &AuditDeviceEntry,
    ) -> Result<()> {
        vault.enable_audit_device(address, &item.path, &item.request()).await
    }

    async fn update(
        &self,
        vault: &dyn VaultApi,
        address: &str,
        item: &AuditDeviceEntry,
    ) -> Result<()> {
        warn!(path = %item.path, "re-creating audit device; events are not logged to it meanwhile");
        vault.disable_audit_device(address, &item.path).await?;
        vault.enable_audit_device(address, &item.path, &item.request()).await
    }

    async fn delete(
        &self,
        vault: &dyn VaultApi,
        address: &str,
        item: &AuditDeviceEntry,
    ) -> Result<()> {
        vault.disable_audit_device(address, &item.path).await
    }
}
