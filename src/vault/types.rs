//! Vault API types.
//!
//! Request and response bodies of the `sys/` endpoints the reconciler uses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::item::Options;

/// A mounted backend as reported by `sys/mounts` or `sys/audit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackendInfo {
    /// Backend type (`kv`, `pki`, `file`, ...).
    #[serde(rename = "type")]
    pub backend_type: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Raw options; Vault reports `null` when none are set.
    #[serde(default)]
    pub options: Option<BTreeMap<String, Value>>,
}

/// Body used to enable or tune a backend.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BackendRequest {
    /// Backend type. Omitted for tune requests.
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub backend_type: String,
    /// Free-form description.
    pub description: String,
    /// Normalized options.
    pub options: Options,
}

/// Envelope around the `data` field of a Vault response.
#[derive(Debug, Deserialize)]
pub struct DataResponse<T> {
    /// Response payload.
    pub data: T,
}

/// Payload of a `LIST` style request.
#[derive(Debug, Deserialize)]
pub struct KeyList {
    /// Listed keys.
    #[serde(default)]
    pub keys: Vec<String>,
}

/// Payload of a policy read.
#[derive(Debug, Deserialize)]
pub struct PolicyBody {
    /// Policy rules in HCL.
    #[serde(default)]
    pub policy: String,
}

/// Body of a policy write.
#[derive(Debug, Serialize)]
pub struct PolicyWrite<'a> {
    /// Policy rules in HCL.
    pub policy: &'a str,
}

impl BackendInfo {
    /// Returns the options with values normalized to strings.
    #[must_use]
    pub fn normalized_options(&self) -> Options {
        self.options
            .as_ref()
            .map(crate::item::ambiguous_options)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backend_info_with_null_options() {
        let info: BackendInfo = serde_json::from_value(json!({
            "type": "file",
            "description": "",
            "options": null
        }))
        .unwrap();

        assert_eq!(info.backend_type, "file");
        assert!(info.normalized_options().is_empty());
    }

    #[test]
    fn test_tune_request_omits_type() {
        let request = BackendRequest {
            backend_type: String::new(),
            description: String::from("kv store"),
            options: Options::new(),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("type").is_none());
        assert_eq!(body["description"], "kv store");
    }
}
