//! Reconciler for converging Vault instances on the desired configuration.
//!
//! This module sequences the object kinds of one run. Kinds run in
//! dependency order, and an instance that fails in one kind is left out of
//! every later kind of the same run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::config::ConvergeConfig;
use crate::planner::{KindReport, ReconcileContext, Toplevel};
use crate::toplevel::{AuditDevices, Policies, SecretsEngines};

/// Runs the registered object kinds against every configured instance.
pub struct Reconciler {
    /// Object kinds in execution order.
    kinds: Vec<Box<dyn Toplevel>>,
    /// Shared run context.
    ctx: ReconcileContext,
}

/// Result of a reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// Start time of the run.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in seconds.
    pub duration_secs: f64,
    /// Whether changes were only reported.
    pub dry_run: bool,
    /// Per-kind reports in execution order.
    pub kinds: Vec<KindReport>,
    /// Configured instance addresses.
    pub instances: Vec<String>,
    /// Instances that failed during the run.
    pub invalid_instances: Vec<String>,
}

impl Reconciler {
    /// Creates a reconciler with no object kinds.
    #[must_use]
    pub fn new(ctx: ReconcileContext) -> Self {
        Self {
            kinds: Vec::new(),
            ctx,
        }
    }

    /// Creates a reconciler for every kind of the document.
    ///
    /// Audit devices come first so that later changes are audited, then
    /// secrets engines, then the policies that may refer to their paths.
    #[must_use]
    pub fn from_config(config: &ConvergeConfig, ctx: ReconcileContext) -> Self {
        Self::new(ctx)
            .with_toplevel(AuditDevices::from_config(config))
            .with_toplevel(SecretsEngines::from_config(config))
            .with_toplevel(Policies::from_config(config))
    }

    /// Appends an object kind to the run.
    #[must_use]
    pub fn with_toplevel(mut self, kind: impl Toplevel + 'static) -> Self {
        self.kinds.push(Box::new(kind));
        self
    }

    /// Returns the kind labels in execution order.
    #[must_use]
    pub fn kind_names(&self) -> Vec<&'static str> {
        self.kinds.iter().map(|k| k.name()).collect()
    }

    /// Performs one full run.
    ///
    /// Every instance starts the run valid. Instance failures never abort the
    /// run; they are recorded in the report.
    pub async fn run(&self) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Instant::now();
        let registry = &self.ctx.registry;

        let span = info_span!("run", %run_id, dry_run = self.ctx.dry_run);
        let kinds = async {
            registry.reset();
            info!(
                instances = registry.configured().len(),
                kinds = self.kinds.len(),
                "Starting reconciliation"
            );

            let mut kinds = Vec::with_capacity(self.kinds.len());
            for kind in &self.kinds {
                info!(kind = kind.name(), "Reconciling");
                kinds.push(kind.apply(&self.ctx).await);
            }
            kinds
        }
        .instrument(span)
        .await;

        let report = RunReport {
            run_id,
            started_at,
            duration_secs: timer.elapsed().as_secs_f64(),
            dry_run: self.ctx.dry_run,
            kinds,
            instances: registry.configured().to_vec(),
            invalid_instances: registry.invalid_addresses(),
        };

        if report.success() {
            info!(%run_id, changes = report.change_count(), "Reconciliation finished");
        } else {
            warn!(
                %run_id,
                invalid = ?report.invalid_instances,
                "Reconciliation finished with failures"
            );
        }
        report
    }
}

impl RunReport {
    /// Returns true if no instance failed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.invalid_instances.is_empty()
    }

    /// Returns the number of planned changes across kinds.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.kinds.iter().map(KindReport::change_count).sum()
    }

    /// Returns the number of changes actually applied.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.kinds
            .iter()
            .flat_map(|k| &k.instances)
            .map(|o| o.applied)
            .sum()
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = if self.dry_run { "dry run" } else { "run" };
        write!(
            f,
            "{mode} {}: {} change(s), {} applied, {}/{} instance(s) healthy",
            self.run_id,
            self.change_count(),
            self.applied_count(),
            self.instances.len() - self.invalid_instances.len(),
            self.instances.len()
        )
    }
}
