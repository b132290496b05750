//! In-memory [`VaultApi`] used by orchestration tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Result, VaultError};

use super::api::VaultApi;
use super::types::{BackendInfo, BackendRequest};

/// Configuration held by one fake instance.
#[derive(Debug, Clone, Default)]
pub(crate) struct InstanceState {
    pub policies: BTreeMap<String, String>,
    pub mounts: BTreeMap<String, BackendInfo>,
    pub audits: BTreeMap<String, BackendInfo>,
}

/// Fake Vault holding several instances in memory.
#[derive(Debug, Default)]
pub(crate) struct MemoryVault {
    instances: Mutex<HashMap<String, InstanceState>>,
    unreachable: Mutex<HashSet<String>>,
    read_only: Mutex<HashSet<String>>,
    mutations: AtomicUsize,
}

impl InstanceState {
    /// State of a freshly initialized server: built-in policies and mounts.
    pub fn fresh() -> Self {
        let builtin = |t: &str| BackendInfo {
            backend_type: t.to_string(),
            description: String::new(),
            options: None,
        };

        Self {
            policies: BTreeMap::from([
                (String::from("default"), String::from("# default")),
                (String::from("root"), String::new()),
            ]),
            mounts: BTreeMap::from([
                (String::from("cubbyhole/"), builtin("cubbyhole")),
                (String::from("identity/"), builtin("identity")),
                (String::from("sys/"), builtin("system")),
            ]),
            audits: BTreeMap::new(),
        }
    }
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance(self, address: &str, state: InstanceState) -> Self {
        self.lock_instances().insert(address.to_string(), state);
        self
    }

    /// Makes every call against `address` fail.
    pub fn set_unreachable(&self, address: &str) {
        self.unreachable
            .lock()
            .unwrap()
            .insert(address.to_string());
    }

    /// Makes every mutating call against `address` fail.
    pub fn fail_writes(&self, address: &str) {
        self.read_only.lock().unwrap().insert(address.to_string());
    }

    pub fn state(&self, address: &str) -> InstanceState {
        self.lock_instances()
            .get(address)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of successful mutating calls.
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn lock_instances(&self) -> std::sync::MutexGuard<'_, HashMap<String, InstanceState>> {
        self.instances.lock().unwrap()
    }

    fn read<R>(&self, address: &str, f: impl FnOnce(&InstanceState) -> R) -> Result<R> {
        if self.unreachable.lock().unwrap().contains(address) {
            return Err(VaultError::network(address, "connection refused").into());
        }
        let instances = self.lock_instances();
        let state = instances
            .get(address)
            .ok_or_else(|| VaultError::network(address, "unknown instance"))?;
        Ok(f(state))
    }

    fn mutate(
        &self,
        address: &str,
        f: impl FnOnce(&mut InstanceState) -> std::result::Result<(), String>,
    ) -> Result<()> {
        if self.unreachable.lock().unwrap().contains(address) {
            return Err(VaultError::network(address, "connection refused").into());
        }
        if self.read_only.lock().unwrap().contains(address) {
            return Err(VaultError::api_error(address, 503, "sealed").into());
        }
        let mut instances = self.lock_instances();
        let state = instances
            .get_mut(address)
            .ok_or_else(|| VaultError::network(address, "unknown instance"))?;
        f(state).map_err(|message| VaultError::api_error(address, 400, message))?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stored(request: &BackendRequest) -> BackendInfo {
        BackendInfo {
            backend_type: request.backend_type.clone(),
            description: request.description.clone(),
            options: Some(
                request
                    .options
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl VaultApi for MemoryVault {
    async fn list_policies(&self, address: &str) -> Result<Vec<String>> {
        self.read(address, |s| s.policies.keys().cloned().collect())
    }

    async fn read_policy(&self, address: &str, name: &str) -> Result<String> {
        self.read(address, |s| s.policies.get(name).cloned())?
            .ok_or_else(|| VaultError::api_error(address, 404, "no such policy").into())
    }

    async fn write_policy(&self, address: &str, name: &str, rules: &str) -> Result<()> {
        self.mutate(address, |s| {
            s.policies.insert(name.to_string(), rules.to_string());
            Ok(())
        })
    }

    async fn delete_policy(&self, address: &str, name: &str) -> Result<()> {
        self.mutate(address, |s| {
            s.policies
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| format!("policy {name} not found"))
        })
    }

    async fn list_secrets_engines(&self, address: &str) -> Result<BTreeMap<String, BackendInfo>> {
        self.read(address, |s| s.mounts.clone())
    }

    async fn enable_secrets_engine(
        &self,
        address: &str,
        path: &str,
        request: &BackendRequest,
    ) -> Result<()> {
        self.mutate(address, |s| {
            if s.mounts.contains_key(path) {
                return Err(format!("path is already in use at {path}"));
            }
            s.mounts.insert(path.to_string(), Self::stored(request));
            Ok(())
        })
    }

    async fn tune_secrets_engine(
        &self,
        address: &str,
        path: &str,
        request: &BackendRequest,
    ) -> Result<()> {
        self.mutate(address, |s| {
            let mount = s
                .mounts
                .get_mut(path)
                .ok_or_else(|| format!("no mount at {path}"))?;
            mount.description.clone_from(&request.description);
            mount.options = Self::stored(request).options;
            Ok(())
        })
    }

    async fn disable_secrets_engine(&self, address: &str, path: &str) -> Result<()> {
        self.mutate(address, |s| {
            s.mounts.remove(path);
            Ok(())
        })
    }

    async fn list_audit_devices(&self, address: &str) -> Result<BTreeMap<String, BackendInfo>> {
        self.read(address, |s| s.audits.clone())
    }

    async fn enable_audit_device(
        &self,
        address: &str,
        path: &str,
        request: &BackendRequest,
    ) -> Result<()> {
        self.mutate(address, |s| {
            if s.audits.contains_key(path) {
                return Err(format!("path already in use at {path}"));
            }
            s.audits.insert(path.to_string(), Self::stored(request));
            Ok(())
        })
    }

    async fn disable_audit_device(&self, address: &str, path: &str) -> Result<()> {
        self.mutate(address, |s| {
            s.audits.remove(path);
            Ok(())
        })
    }
}
