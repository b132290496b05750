//! Change plan types and construction.
//!
//! This module turns a diff for one object kind on one instance into an
//! ordered plan: creates, then updates, then deletes. Deletes of protected
//! objects are filtered out here, after the diff, since the diff engine has no
//! notion of built-in objects.

use serde::Serialize;
use tracing::info;

use crate::item::Reconcilable;

use super::diff::DiffResult;

/// Ordered changes for one object kind on one instance.
#[derive(Debug, Clone)]
pub struct ChangePlan<T> {
    /// Object kind label.
    pub kind: &'static str,
    /// Instance address.
    pub instance: String,
    /// Items to create.
    pub creates: Vec<T>,
    /// Items to update, carrying the desired state.
    pub updates: Vec<T>,
    /// Items to delete, carrying the observed state.
    pub deletes: Vec<T>,
    /// Number of items already in sync.
    pub unchanged: usize,
    /// Number of protected items left alone although absent from the config.
    pub protected: usize,
}

/// A single pending change, as reported to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChange {
    /// Action type.
    pub action: ActionType,
    /// Object kind label.
    pub kind: &'static str,
    /// Instance address.
    pub instance: String,
    /// Item key.
    pub key: String,
    /// Item type.
    pub item_type: String,
    /// Item description.
    pub description: String,
    /// Kind-specific extra detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Types of actions in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Create a missing object.
    Create,
    /// Bring an existing object in line with the config.
    Update,
    /// Remove an object absent from the config.
    Delete,
}

impl<T: Reconcilable> ChangePlan<T> {
    /// Creates a plan from a diff result, dropping protected deletes.
    #[must_use]
    pub fn from_diff(
        kind: &'static str,
        instance: &str,
        diff: DiffResult<T>,
        is_protected: impl Fn(&T) -> bool,
    ) -> Self {
        let (protected, deletes): (Vec<T>, Vec<T>) =
            diff.to_delete.into_iter().partition(|item| is_protected(item));

        Self {
            kind,
            instance: instance.to_string(),
            creates: diff.to_create,
            updates: diff.to_update,
            deletes,
            unchanged: diff.unchanged.len(),
            protected: protected.len(),
        }
    }

    /// Returns true if the plan contains no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Returns the total number of actions.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len()
    }

    /// Lists the pending changes in execution order.
    #[must_use]
    pub fn changes(&self, detail: impl Fn(&T) -> Option<String>) -> Vec<PlannedChange> {
        let tagged = self
            .creates
            .iter()
            .map(|i| (ActionType::Create, i))
            .chain(self.updates.iter().map(|i| (ActionType::Update, i)))
            .chain(self.deletes.iter().map(|i| (ActionType::Delete, i)));

        tagged
            .map(|(action, item)| PlannedChange {
                action,
                kind: self.kind,
                instance: self.instance.clone(),
                key: item.key().to_string(),
                item_type: item.key_for_type().to_string(),
                description: item.key_for_description().to_string(),
                detail: detail(item),
            })
            .collect()
    }
}

impl PlannedChange {
    /// Logs the change as a dry-run notice.
    pub fn log_dry_run(&self) {
        info!(
            kind = self.kind,
            instance = %self.instance,
            key = %self.key,
            item_type = %self.item_type,
            description = %self.description,
            detail = self.detail.as_deref().unwrap_or(""),
            "[Dry Run] {} to be {}",
            self.kind,
            self.action.past_participle()
        );
    }
}

impl ActionType {
    /// Returns the verb used in change reports.
    #[must_use]
    pub const fn past_participle(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for PlannedChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} '{}' on {}", self.action, self.kind, self.key, self.instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::DiffEngine;

    #[derive(Debug, Clone)]
    struct Named(&'static str);

    impl Reconcilable for Named {
        fn key(&self) -> &str {
            self.0
        }

        fn equals(&self, other: &Self) -> bool {
            self.0 == other.0
        }

        fn key_for_type(&self) -> &str {
            "acl"
        }

        fn key_for_description(&self) -> &str {
            "test"
        }
    }

    fn plan(desired: Vec<Named>, observed: Vec<Named>) -> ChangePlan<Named> {
        let diff = DiffEngine::new().diff(desired, observed);
        ChangePlan::from_diff("policy", "https://v1", diff, |n| n.0 == "root")
    }

    #[test]
    fn test_protected_items_are_never_deleted() {
        let plan = plan(vec![Named("app")], vec![Named("root"), Named("stale")]);

        assert_eq!(plan.deletes.len(), 1);
        assert_eq!(plan.deletes[0].0, "stale");
        assert_eq!(plan.protected, 1);
        assert_eq!(plan.creates.len(), 1);
    }

    #[test]
    fn test_only_protected_leftovers_is_empty_plan() {
        let plan = plan(vec![Named("app")], vec![Named("app"), Named("root")]);
        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, 1);
    }

    #[test]
    fn test_changes_are_ordered_create_update_delete() {
        let mut plan = plan(vec![Named("new")], vec![Named("old")]);
        plan.updates.push(Named("changed"));

        let changes = plan.changes(|_| None);
        let actions: Vec<ActionType> = changes.iter().map(|c| c.action).collect();

        assert_eq!(
            actions,
            vec![ActionType::Create, ActionType::Update, ActionType::Delete]
        );
        assert_eq!(plan.action_count(), 3);
        assert_eq!(changes[0].item_type, "acl");
        assert_eq!(changes[2].to_string(), "delete policy 'old' on https://v1");
    }

    #[test]
    fn test_changes_carry_detail() {
        let plan = plan(vec![Named("new")], vec![]);
        let changes = plan.changes(|n| Some(format!("detail for {}", n.0)));
        assert_eq!(changes[0].detail.as_deref(), Some("detail for new"));
    }
}
