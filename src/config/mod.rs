//! Configuration module for the reconciler.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `vault-converge.yaml`
//! - Validation of configuration values
//! - Resolving per-instance tokens from the environment

mod parser;
mod spec;
mod validator;

pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use spec::{
    AuditDeviceConfig, ConvergeConfig, InstanceConfig, InstanceRef, PolicyConfig,
    SecretsEngineConfig,
};
pub use validator::{ConfigValidator, ValidationResult};
