//! The remote-call surface the object kinds depend on.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::Result;

use super::types::{BackendInfo, BackendRequest};

/// Operations on the `sys/` endpoints of Vault instances.
///
/// Every call names the instance it targets, so one implementation serves
/// all configured instances.
#[async_trait]
pub trait VaultApi: Send + Sync {
    /// Lists the names of all ACL policies.
    async fn list_policies(&self, address: &str) -> Result<Vec<String>>;

    /// Reads the rules of one ACL policy.
    async fn read_policy(&self, address: &str, name: &str) -> Result<String>;

    /// Creates or replaces an ACL policy.
    async fn write_policy(&self, address: &str, name: &str, rules: &str) -> Result<()>;

    /// Deletes an ACL policy.
    async fn delete_policy(&self, address: &str, name: &str) -> Result<()>;

    /// Lists enabled secrets engines keyed by mount path.
    async fn list_secrets_engines(&self, address: &str) -> Result<BTreeMap<String, BackendInfo>>;

    /// Enables a secrets engine at `path`.
    async fn enable_secrets_engine(
        &self,
        address: &str,
        path: &str,
        request: &BackendRequest,
    ) -> Result<()>;

    /// Tunes the description and options of a mounted secrets engine.
    async fn tune_secrets_engine(
        &self,
        address: &str,
        path: &str,
        request: &BackendRequest,
    ) -> Result<()>;

    /// Disables the secrets engine at `path`.
    async fn disable_secrets_engine(&self, address: &str, path: &str) -> Result<()>;

    /// Lists enabled audit devices keyed by path.
    async fn list_audit_devices(&self, address: &str) -> Result<BTreeMap<String, BackendInfo>>;

    /// Enables an audit device at `path`.
    async fn enable_audit_device(
        &self,
        address: &str,
        path: &str,
        request: &BackendRequest,
    ) -> Result<()>;

    /// Disables the audit device at `path`.
    async fn disable_audit_device(&self, address: &str, path: &str) -> Result<()>;
}
