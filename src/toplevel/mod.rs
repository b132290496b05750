//! Object kinds managed by the reconciler.
//!
//! Each kind maps one section of the configuration document onto the
//! [`ObjectKind`](crate::planner::ObjectKind) contract:
//! - `vault_audit_backends`: [`AuditDevices`]
//! - `vault_secret_engines`: [`SecretsEngines`]
//! - `vault_policies`: [`Policies`]

mod audit;
mod policy;
mod secrets_engine;

pub use audit::{AuditDeviceEntry, AuditDevices};
pub use policy::{Policies, PolicyEntry, is_default_policy, rules_digest};
pub use secrets_engine::{SecretsEngineEntry, SecretsEngines, is_default_mount};
