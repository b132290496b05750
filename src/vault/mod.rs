//! Vault API integration module.
//!
//! This module provides the remote-call surface of the reconciler: the
//! [`VaultApi`] trait the object kinds are written against, and the HTTP
//! client that implements it.

mod api;
mod client;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use api::VaultApi;
pub use client::VaultClient;
pub use types::{BackendInfo, BackendRequest};
