//! Apply orchestration shared by every object kind.
//!
//! An object kind only describes how to load, fetch and mutate its items
//! ([`ObjectKind`]). The loop in [`apply_kind`] does the rest: it walks the
//! still-valid instances, diffs, plans, applies or logs the plan, and removes
//! an instance from the run as soon as a remote call against it fails.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::{ConvergeError, Result};
use crate::item::Reconcilable;
use crate::registry::InstanceRegistry;
use crate::vault::VaultApi;

use super::diff::DiffEngine;
use super::plan::{ActionType, ChangePlan, PlannedChange};

/// Everything an object kind needs during one run.
#[derive(Clone)]
pub struct ReconcileContext {
    /// Remote-call client.
    pub vault: Arc<dyn VaultApi>,
    /// Shared instance validity registry.
    pub registry: Arc<InstanceRegistry>,
    /// Report changes without applying them.
    pub dry_run: bool,
    /// Maximum concurrent remote calls per fan-out.
    pub thread_pool_size: usize,
}

/// A configuration-object kind that can be reconciled.
#[async_trait]
pub trait ObjectKind: Send + Sync {
    /// Item type of this kind.
    type Item: Reconcilable + Send + Sync + 'static;

    /// Label used in logs and reports.
    const KIND: &'static str;

    /// Returns the desired items for one instance.
    fn desired(&self, address: &str) -> Vec<Self::Item>;

    /// Fetches the observed items from one instance.
    async fn fetch(&self, ctx: &ReconcileContext, address: &str) -> Result<Vec<Self::Item>>;

    /// Returns true for built-in objects that must never be deleted.
    fn is_protected(&self, _item: &Self::Item) -> bool {
        false
    }

    /// Extra detail shown next to a pending change.
    fn describe(&self, _item: &Self::Item) -> Option<String> {
        None
    }

    /// Creates an item on an instance.
    async fn create(&self, vault: &dyn VaultApi, address: &str, item: &Self::Item) -> Result<()>;

    /// Updates an item on an instance to its desired state.
    async fn update(&self, vault: &dyn VaultApi, address: &str, item: &Self::Item) -> Result<()>;

    /// Deletes an item from an instance.
    async fn delete(&self, vault: &dyn VaultApi, address: &str, item: &Self::Item) -> Result<()>;
}

/// Object-safe view of an [`ObjectKind`], so the reconciler can hold an
/// ordered list of heterogeneous kinds.
#[async_trait]
pub trait Toplevel: Send + Sync {
    /// Label of the object kind.
    fn name(&self) -> &'static str;

    /// Reconciles this kind on every still-valid instance.
    async fn apply(&self, ctx: &ReconcileContext) -> KindReport;
}

#[async_trait]
impl<K: ObjectKind> Toplevel for K {
    fn name(&self) -> &'static str {
        K::KIND
    }

    async fn apply(&self, ctx: &ReconcileContext) -> KindReport {
        apply_kind(self, ctx).await
    }
}

/// Outcome of reconciling one kind on one instance.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceOutcome {
    /// Instance address.
    pub instance: String,
    /// Whether changes were only reported.
    pub dry_run: bool,
    /// Planned changes in execution order.
    pub changes: Vec<PlannedChange>,
    /// Number of changes applied before finishing or failing.
    pub applied: usize,
    /// Number of items already in sync.
    pub unchanged: usize,
    /// Number of protected items left alone.
    pub protected: usize,
    /// Failure that removed the instance from the run.
    pub error: Option<String>,
}

/// Result of reconciling one kind across all instances.
#[derive(Debug, Clone, Serialize)]
pub struct KindReport {
    /// Object kind label.
    pub kind: &'static str,
    /// One outcome per attempted instance.
    pub instances: Vec<InstanceOutcome>,
    /// Instances skipped because an earlier kind failed on them.
    pub skipped: Vec<String>,
}

/// Reconciles one object kind on every still-valid instance.
///
/// Any error raised while reconciling an instance marks it invalid and the
/// loop moves on to the next one.
pub async fn apply_kind<K: ObjectKind>(kind: &K, ctx: &ReconcileContext) -> KindReport {
    let addresses = ctx.registry.valid_addresses();
    let skipped: Vec<String> = ctx
        .registry
        .configured()
        .iter()
        .filter(|a| !addresses.contains(*a))
        .cloned()
        .collect();

    for address in &skipped {
        warn!(kind = K::KIND, instance = %address, "skipping invalid instance");
    }

    let mut report = KindReport {
        kind: K::KIND,
        instances: Vec::with_capacity(addresses.len()),
        skipped,
    };

    for address in addresses {
        if !ctx.registry.is_valid(&address) {
            warn!(kind = K::KIND, instance = %address, "skipping invalid instance");
            report.skipped.push(address);
            continue;
        }

        let span = info_span!("instance", kind = K::KIND, instance = %address);
        let outcome = reconcile_instance(kind, ctx, &address).instrument(span).await;

        if let Some(reason) = &outcome.error {
            error!(kind = K::KIND, instance = %address, error = %reason, "reconciliation failed");
            ctx.registry.mark_invalid(&address);
        }
        report.instances.push(outcome);
    }

    report
}

/// Fetches, diffs and applies (or reports) one kind on one instance.
async fn reconcile_instance<K: ObjectKind>(
    kind: &K,
    ctx: &ReconcileContext,
    address: &str,
) -> InstanceOutcome {
    let observed = match kind.fetch(ctx, address).await {
        Ok(observed) => observed,
        Err(err) => return InstanceOutcome::failed(address, ctx.dry_run, &err),
    };

    let desired = kind.desired(address);
    debug!(desired = desired.len(), observed = observed.len(), "fetched items");

    let diff = DiffEngine::new().diff(desired, observed);
    let plan = ChangePlan::from_diff(K::KIND, address, diff, |item| kind.is_protected(item));

    let mut outcome = InstanceOutcome {
        instance: address.to_string(),
        dry_run: ctx.dry_run,
        changes: plan.changes(|item| kind.describe(item)),
        applied: 0,
        unchanged: plan.unchanged,
        protected: plan.protected,
        error: None,
    };

    if plan.is_empty() {
        debug!(unchanged = plan.unchanged, "in sync");
        return outcome;
    }

    if ctx.dry_run {
        for change in &outcome.changes {
            change.log_dry_run();
        }
        return outcome;
    }

    if let Err(err) = execute_plan(kind, ctx.vault.as_ref(), &plan, &mut outcome.applied).await {
        outcome.error = Some(err.to_string());
    }
    outcome
}

/// Applies creates, then updates, then deletes. Stops at the first failure.
async fn execute_plan<K: ObjectKind>(
    kind: &K,
    vault: &dyn VaultApi,
    plan: &ChangePlan<K::Item>,
    applied: &mut usize,
) -> Result<()> {
    let address = plan.instance.as_str();
    let steps: Vec<(ActionType, &K::Item)> = plan
        .creates
        .iter()
        .map(|i| (ActionType::Create, i))
        .chain(plan.updates.iter().map(|i| (ActionType::Update, i)))
        .chain(plan.deletes.iter().map(|i| (ActionType::Delete, i)))
        .collect();

    for (action, item) in steps {
        info!(key = item.key(), item_type = item.key_for_type(), "{} {}", action, K::KIND);
        match action {
            ActionType::Create => kind.create(vault, address, item).await?,
            ActionType::Update => kind.update(vault, address, item).await?,
            ActionType::Delete => kind.delete(vault, address, item).await?,
        }
        *applied += 1;
    }

    Ok(())
}

impl InstanceOutcome {
    /// Creates the outcome of an instance whose fetch failed.
    fn failed(address: &str, dry_run: bool, err: &ConvergeError) -> Self {
        Self {
            instance: address.to_string(),
            dry_run,
            changes: Vec::new(),
            applied: 0,
            unchanged: 0,
            protected: 0,
            error: Some(err.to_string()),
        }
    }

    /// Returns true if the instance was reconciled without error.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Counts planned changes of one action type.
    #[must_use]
    pub fn count(&self, action: ActionType) -> usize {
        self.changes.iter().filter(|c| c.action == action).count()
    }
}

impl KindReport {
    /// Returns the instances this kind failed on.
    #[must_use]
    pub fn failed_instances(&self) -> Vec<&str> {
        self.instances
            .iter()
            .filter(|o| !o.succeeded())
            .map(|o| o.instance.as_str())
            .collect()
    }

    /// Returns the number of planned changes across instances.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.instances.iter().map(|o| o.changes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toplevel::Policies;
    use crate::vault::testing::{InstanceState, MemoryVault};

    fn context(vault: Arc<MemoryVault>, addresses: &[&str], dry_run: bool) -> ReconcileContext {
        ReconcileContext {
            vault,
            registry: Arc::new(InstanceRegistry::new(addresses.iter().copied())),
            dry_run,
            thread_pool_size: 2,
        }
    }

    fn policies(address: &str, names: &[&str]) -> Policies {
        Policies::new(
            names
                .iter()
                .map(|n| crate::toplevel::PolicyEntry::desired(address, n, &format!("# {n}")))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_fetch_failure_marks_instance_invalid_and_continues() {
        let vault = Arc::new(
            MemoryVault::new()
                .with_instance("x", InstanceState::fresh())
                .with_instance("y", InstanceState::fresh()),
        );
        vault.set_unreachable("x");
        let ctx = context(Arc::clone(&vault), &["x", "y"], false);

        let report = apply_kind(&policies("y", &["app"]), &ctx).await;

        assert_eq!(report.failed_instances(), vec!["x"]);
        assert_eq!(ctx.registry.valid_addresses(), vec!["y"]);
        assert!(vault.state("y").policies.contains_key("app"));
    }

    #[tokio::test]
    async fn test_dry_run_applies_nothing() {
        let vault = Arc::new(MemoryVault::new().with_instance("x", InstanceState::fresh()));
        let ctx = context(Arc::clone(&vault), &["x"], true);

        let report = apply_kind(&policies("x", &["app", "ops"]), &ctx).await;

        assert_eq!(report.change_count(), 2);
        assert_eq!(report.instances[0].applied, 0);
        assert_eq!(vault.mutations(), 0);
    }

    #[tokio::test]
    async fn test_skips_instances_already_invalid() {
        let vault = Arc::new(
            MemoryVault::new()
                .with_instance("x", InstanceState::fresh())
                .with_instance("y", InstanceState::fresh()),
        );
        let ctx = context(Arc::clone(&vault), &["x", "y"], false);
        ctx.registry.mark_invalid("x");

        let report = apply_kind(&policies("x", &["app"]), &ctx).await;

        assert_eq!(report.skipped, vec!["x"]);
        assert_eq!(report.instances.len(), 1);
        assert!(!vault.state("x").policies.contains_key("app"));
    }

    #[tokio::test]
    async fn test_apply_failure_stops_remaining_changes() {
        let vault = Arc::new(MemoryVault::new().with_instance("x", InstanceState::fresh()));
        vault.fail_writes("x");
        let ctx = context(Arc::clone(&vault), &["x"], false);

        let report = apply_kind(&policies("x", &["a", "b"]), &ctx).await;
        let outcome = &report.instances[0];

        assert!(!outcome.succeeded());
        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.count(ActionType::Create), 2);
        assert!(!ctx.registry.is_valid("x"));
    }
}
