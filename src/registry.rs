//! Instance validity registry.
//!
//! Object kinds are reconciled in dependency order. Once one of them fails to
//! talk to an instance, every later kind must skip that instance for the rest
//! of the run instead of acting on state it could not observe. The registry
//! records those failures. It is constructed explicitly and shared through an
//! `Arc`, so each run (and each test) owns an independent one.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use tracing::{info, warn};

/// Tracks which configured instances are still eligible for reconciliation.
#[derive(Debug)]
pub struct InstanceRegistry {
    /// Every configured address, in configured order.
    configured: Vec<String>,
    /// Addresses marked invalid during the current run.
    invalid: RwLock<HashSet<String>>,
}

impl InstanceRegistry {
    /// Creates a registry over the full configured instance list.
    #[must_use]
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            configured: addresses.into_iter().map(Into::into).collect(),
            invalid: RwLock::new(HashSet::new()),
        }
    }

    /// Returns every configured address, valid or not.
    #[must_use]
    pub fn configured(&self) -> &[String] {
        &self.configured
    }

    /// Marks an instance invalid for the remainder of the run.
    ///
    /// Returns true if the address was not already marked.
    pub fn mark_invalid(&self, address: &str) -> bool {
        let newly_marked = self
            .invalid
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.to_string());

        if newly_marked {
            warn!(instance = address, "instance removed from reconciliation");
        }
        newly_marked
    }

    /// Returns true if the address has not been marked invalid.
    #[must_use]
    pub fn is_valid(&self, address: &str) -> bool {
        !self
            .invalid
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(address)
    }

    /// Returns the configured addresses minus the invalid ones, in configured
    /// order.
    #[must_use]
    pub fn valid_addresses(&self) -> Vec<String> {
        let invalid = self.invalid.read().unwrap_or_else(PoisonError::into_inner);
        self.configured
            .iter()
            .filter(|a| !invalid.contains(a.as_str()))
            .cloned()
            .collect()
    }

    /// Returns the addresses marked invalid, in configured order.
    #[must_use]
    pub fn invalid_addresses(&self) -> Vec<String> {
        let invalid = self.invalid.read().unwrap_or_else(PoisonError::into_inner);
        self.configured
            .iter()
            .filter(|a| invalid.contains(a.as_str()))
            .cloned()
            .collect()
    }

    /// Clears the invalid set. Called once at the start of each run.
    pub fn reset(&self) {
        let mut invalid = self.invalid.write().unwrap_or_else(PoisonError::into_inner);
        if !invalid.is_empty() {
            info!(count = invalid.len(), "re-admitting invalid instances for new run");
        }
        invalid.clear();
    }
}
