//! Diff engine for comparing desired vs observed items.
//!
//! This module classifies the items of one object kind on one instance into
//! the ones to create, update and delete. It knows nothing about Vault, about
//! concrete kinds, or about protected objects.

use std::collections::HashMap;
use tracing::trace;

use crate::item::Reconcilable;

/// Engine for computing diffs between desired and observed items.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

/// Type of difference detected for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    /// Key only exists in the desired items.
    Create,
    /// Key exists on both sides but the items differ.
    Update,
    /// Key only exists in the observed items.
    Delete,
    /// Key exists on both sides and the items are equal.
    NoChange,
}

/// Complete diff result.
#[derive(Debug, Clone)]
pub struct DiffResult<T> {
    /// Desired items whose key is absent from the observed items.
    pub to_create: Vec<T>,
    /// Desired items whose observed counterpart differs.
    pub to_update: Vec<T>,
    /// Observed items whose key is absent from the desired items.
    pub to_delete: Vec<T>,
    /// Keys present on both sides with equal items, in desired order.
    pub unchanged: Vec<String>,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the diff between desired and observed items.
    ///
    /// `to_create` and `to_update` keep the order of `desired`; `to_delete`
    /// keeps the order of `observed`. Keys must be unique on each side.
    #[must_use]
    pub fn diff<T: Reconcilable>(&self, desired: Vec<T>, observed: Vec<T>) -> DiffResult<T> {
        let index: HashMap<String, usize> = observed
            .iter()
            .enumerate()
            .map(|(i, item)| (item.key().to_string(), i))
            .collect();
        let mut remaining: Vec<Option<T>> = observed.into_iter().map(Some).collect();

        let mut result = DiffResult {
            to_create: Vec::new(),
            to_update: Vec::new(),
            to_delete: Vec::new(),
            unchanged: Vec::new(),
        };

        for item in desired {
            let existing = index
                .get(item.key())
                .and_then(|&i| remaining.get_mut(i))
                .and_then(Option::take);

            match existing {
                None => {
                    trace!(key = item.key(), "to create");
                    result.to_create.push(item);
                }
                Some(current) if item.equals(&current) => {
                    result.unchanged.push(item.key().to_string());
                }
                Some(_) => {
                    trace!(key = item.key(), "to update");
                    result.to_update.push(item);
                }
            }
        }

        result.to_delete = remaining.into_iter().flatten().collect();
        result
    }
}

impl<T: Reconcilable> DiffResult<T> {
    /// Returns true if there are any changes.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.to_create.is_empty() || !self.to_update.is_empty() || !self.to_delete.is_empty()
    }

    /// Returns the total number of changes.
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len()
    }

    /// Returns how a key was classified, or `None` if neither side has it.
    #[must_use]
    pub fn classify(&self, key: &str) -> Option<DiffType> {
        let contains = |items: &[T]| items.iter().any(|i| i.key() == key);

        if contains(&self.to_create) {
            Some(DiffType::Create)
        } else if contains(&self.to_update) {
            Some(DiffType::Update)
        } else if contains(&self.to_delete) {
            Some(DiffType::Delete)
        } else if self.unchanged.iter().any(|k| k == key) {
            Some(DiffType::NoChange)
        } else {
            None
        }
    }
}

impl std::fmt::Display for DiffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::NoChange => "no change",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        key: String,
        v: u32,
    }

    fn entry(key: &str, v: u32) -> Entry {
        Entry {
            key: key.to_string(),
            v,
        }
    }

    impl Reconcilable for Entry {
        fn key(&self) -> &str {
            &self.key
        }

        fn equals(&self, other: &Self) -> bool {
            self.v == other.v
        }

        fn key_for_type(&self) -> &str {
            "entry"
        }

        fn key_for_description(&self) -> &str {
            ""
        }
    }

    fn keys(items: &[Entry]) -> Vec<&str> {
        items.iter().map(|i| i.key.as_str()).collect()
    }

    #[test]
    fn test_mixed_scenario() {
        let desired = vec![entry("a", 1), entry("b", 2)];
        let observed = vec![entry("b", 9), entry("c", 3)];

        let diff = DiffEngine::new().diff(desired, observed);

        assert_eq!(diff.to_create, vec![entry("a", 1)]);
        assert_eq!(diff.to_update, vec![entry("b", 2)]);
        assert_eq!(diff.to_delete, vec![entry("c", 3)]);
        assert!(diff.unchanged.is_empty());
        assert_eq!(diff.classify("b"), Some(DiffType::Update));
    }

    #[test]
    fn test_disjoint_keys() {
        let desired = vec![entry("a", 1), entry("b", 2)];
        let observed = vec![entry("x", 1), entry("y", 2), entry("z", 3)];

        let diff = DiffEngine::new().diff(desired.clone(), observed.clone());

        assert_eq!(diff.to_create, desired);
        assert_eq!(diff.to_delete, observed);
        assert!(diff.to_update.is_empty());
    }

    #[test]
    fn test_identical_sets_produce_no_changes() {
        let items = vec![entry("a", 1), entry("b", 2), entry("c", 3)];
        let mut shuffled = items.clone();
        shuffled.reverse();

        let diff = DiffEngine::new().diff(items, shuffled);

        assert!(!diff.has_changes());
        assert_eq!(diff.unchanged, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_inputs() {
        let diff = DiffEngine::new().diff(Vec::<Entry>::new(), Vec::new());
        assert!(!diff.has_changes());
        assert_eq!(diff.total_changes(), 0);
    }

    #[test]
    fn test_delete_keeps_observed_order() {
        let observed = vec![entry("q", 1), entry("a", 1), entry("m", 1)];
        let diff = DiffEngine::new().diff(vec![entry("a", 1)], observed);
        assert_eq!(keys(&diff.to_delete), vec!["q", "m"]);
    }

    #[test]
    fn test_every_key_lands_in_exactly_one_partition() {
        let desired = vec![entry("a", 1), entry("b", 2), entry("c", 3), entry("d", 4)];
        let observed = vec![entry("c", 3), entry("d", 0), entry("e", 5), entry("f", 6)];

        let diff = DiffEngine::new().diff(desired, observed);

        let mut seen = HashSet::new();
        for key in keys(&diff.to_create)
            .into_iter()
            .chain(keys(&diff.to_update))
            .chain(keys(&diff.to_delete))
        {
            assert!(seen.insert(key), "key {key} classified twice");
        }
        assert!(!seen.contains("c"));
        assert_eq!(seen.len() + diff.unchanged.len(), 6);
    }

    #[test]
    fn test_rediff_after_apply_is_empty() {
        let desired = vec![entry("a", 1), entry("b", 2), entry("d", 4)];
        let mut observed = vec![entry("b", 9), entry("c", 3), entry("d", 4)];

        let diff = DiffEngine::new().diff(desired.clone(), observed.clone());

        for created in &diff.to_create {
            observed.push(created.clone());
        }
        for updated in &diff.to_update {
            if let Some(slot) = observed.iter_mut().find(|o| o.key == updated.key) {
                *slot = updated.clone();
            }
        }
        observed.retain(|o| !diff.to_delete.iter().any(|d| d.key == o.key));

        let second = DiffEngine::new().diff(desired, observed);
        assert!(!second.has_changes());
        assert_eq!(second.unchanged.len(), 3);
    }

    #[test]
    fn test_classify_tells_unchanged_from_unknown() {
        let desired = vec![entry("a", 1), entry("b", 2)];
        let observed = vec![entry("a", 1), entry("c", 3)];

        let diff = DiffEngine::new().diff(desired, observed);

        assert_eq!(diff.classify("a"), Some(DiffType::NoChange));
        assert_eq!(diff.classify("b"), Some(DiffType::Create));
        assert_eq!(diff.classify("c"), Some(DiffType::Delete));
        assert_eq!(diff.classify("zzz"), None);
        assert_eq!(DiffType::NoChange.to_string(), "no change");
    }
}
