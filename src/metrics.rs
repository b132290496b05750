//! Prometheus metrics for reconciliation runs.
//!
//! One series per configured instance, labelled with its address, records
//! whether the last run succeeded on it, how many runs succeeded so far and
//! how long the last run took.

use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::path::Path;
use tracing::info;

use crate::error::{ConvergeError, Result};
use crate::reconciler::RunReport;

/// Value of the `integration` label.
pub const INTEGRATION: &str = "vault-converge";

const LABELS: &[&str] = &["address", "integration"];

/// Run outcome metrics.
#[derive(Clone)]
pub struct ReconcileMetrics {
    registry: Registry,
    last_run_status: GaugeVec,
    execution_counter: IntCounterVec,
    last_run_seconds: GaugeVec,
}

impl ReconcileMetrics {
    /// Creates the metrics in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric cannot be created or registered.
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Creates the metrics and registers them in `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric cannot be created or registered.
    pub fn with_registry(registry: Registry) -> Result<Self> {
        let last_run_status = GaugeVec::new(
            Opts::new(
                "vault_converge_last_run_status",
                "Whether the last reconcile of an instance succeeded. 0 = success, 1 = failure.",
            ),
            LABELS,
        )?;
        registry.register(Box::new(last_run_status.clone()))?;

        let execution_counter = IntCounterVec::new(
            Opts::new(
                "vault_converge_execution_counter",
                "Incremented on each successful reconcile of an instance.",
            ),
            LABELS,
        )?;
        registry.register(Box::new(execution_counter.clone()))?;

        let last_run_seconds = GaugeVec::new(
            Opts::new(
                "vault_converge_last_run_seconds",
                "Duration of the last run over all instances, in seconds.",
            ),
            LABELS,
        )?;
        registry.register(Box::new(last_run_seconds.clone()))?;

        Ok(Self {
            registry,
            last_run_status,
            execution_counter,
            last_run_seconds,
        })
    }

    /// Records the outcome of one instance.
    pub fn record(&self, address: &str, success: bool, duration_secs: f64) {
        let labels = [address, INTEGRATION];

        self.last_run_status
            .with_label_values(&labels)
            .set(if success { 0.0 } else { 1.0 });
        if success {
            self.execution_counter.with_label_values(&labels).inc();
        }
        self.last_run_seconds
            .with_label_values(&labels)
            .set(duration_secs);
    }

    /// Records every configured instance of a finished run.
    pub fn record_run(&self, report: &RunReport) {
        for address in &report.instances {
            let success = !report.invalid_instances.contains(address);
            self.record(address, success, report.duration_secs);
        }
    }

    /// Encodes all metrics in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| ConvergeError::internal(format!("metrics are not UTF-8: {e}")))
    }

    /// Writes the encoded metrics to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.encode()?)?;
        info!("Metrics written to: {}", path.display());
        Ok(())
    }
}
