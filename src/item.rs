//! The contract every reconcilable configuration object implements.
//!
//! The diff engine only ever sees values through [`Reconcilable`], which is
//! what lets one engine serve audit devices, secrets engines and policies
//! alike. The helpers below hold the normalization rules shared by the
//! path-keyed kinds.

use std::collections::BTreeMap;

use serde_json::Value;

/// A configuration object of one specific kind, identified by a unique key
/// within its instance.
///
/// Equality is deliberately left to each kind. The trait only compares values
/// of the same concrete type, so two different kinds can never be considered
/// equal.
pub trait Reconcilable {
    /// Diff join key, unique within one instance and one kind.
    fn key(&self) -> &str;

    /// Kind-specific deep equality. Two items sharing a key are unchanged
    /// exactly when this returns true.
    fn equals(&self, other: &Self) -> bool;

    /// Type label used when reporting pending changes.
    fn key_for_type(&self) -> &str;

    /// Description used when reporting pending changes.
    fn key_for_description(&self) -> &str;
}

/// Normalized option map used for equality of mounts and audit devices.
pub type Options = BTreeMap<String, String>;

/// Normalizes a mount or audit path so it carries exactly one trailing slash.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("{trimmed}/")
}

/// Compares two mount paths, ignoring surrounding and trailing slashes.
#[must_use]
pub fn equal_path_names(a: &str, b: &str) -> bool {
    a.trim().trim_matches('/') == b.trim().trim_matches('/')
}

/// Reduces a loosely typed option map to plain strings.
///
/// The declarative document and the Vault API disagree on how option values
/// are typed (`version: 2` against `"version": "2"`). Strings are kept
/// verbatim, numbers and booleans use their textual form, `null` entries are
/// dropped and nested values are rendered as compact JSON.
#[must_use]
pub fn ambiguous_options<'a, I>(raw: I) -> Options
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    raw.into_iter()
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                nested @ (Value::Array(_) | Value::Object(_)) => nested.to_string(),
            };
            Some((key.clone(), rendered))
        })
        .collect()
}

/// Compares two normalized option maps.
#[must_use]
pub fn options_equal(a: &Options, b: &Options) -> bool {
    a == b
}
