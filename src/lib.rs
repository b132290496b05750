// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # vault-converge
//!
//! A declarative, idempotent reconciler for `HashiCorp` Vault configuration.
//!
//! ## Overview
//!
//! The operator describes, per Vault instance, the audit devices, secrets
//! engines and ACL policies it should carry. Each run fetches the actual
//! configuration, computes the difference and applies the minimal set of
//! create, update and delete operations, or reports them in dry-run mode.
//!
//! ## Architecture
//!
//! 1. **Desired State**: Defined in `vault-converge.yaml`
//! 2. **Observed State**: Queried from each instance's `sys/` API
//! 3. **Diff Engine**: Classifies items through the [`item::Reconcilable`] contract
//! 4. **Reconciler**: Runs object kinds in dependency order, dropping failing
//!    instances from the rest of the run
//!
//! ## Modules
//!
//! - [`item`]: The contract every reconcilable object implements
//! - [`planner`]: Diff computation, change plans and per-instance apply
//! - [`pool`]: Bounded concurrency for per-item remote calls
//! - [`registry`]: Instance validity tracking within a run
//! - [`toplevel`]: Audit devices, secrets engines and policies
//! - [`vault`]: Vault API client
//! - [`reconciler`]: Run orchestration
//! - [`config`]: Configuration parsing and validation
//! - [`metrics`]: Prometheus run metrics
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! instances:
//!   - address: https://vault.example.com:8200
//!
//! vault_secret_engines:
//!   - _path: kv/
//!     type: kv
//!     description: kv store
//!     instance: { address: "https://vault.example.com:8200" }
//!     options: { version: 2 }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod item;
pub mod metrics;
pub mod planner;
pub mod pool;
pub mod reconciler;
pub mod registry;
pub mod toplevel;
pub mod vault;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, ConvergeConfig};
pub use error::{ConvergeError, Result};
pub use item::Reconcilable;
pub use planner::{DiffEngine, DiffResult, ObjectKind, ReconcileContext, Toplevel};
pub use pool::BoundedPool;
pub use reconciler::{Reconciler, RunReport};
pub use registry::InstanceRegistry;
pub use vault::{VaultApi, VaultClient};
