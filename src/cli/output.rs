//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying run reports
//! and validation results in text or JSON form.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{ConvergeConfig, ValidationResult};
use crate::planner::{ActionType, PlannedChange};
use crate::reconciler::RunReport;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Change row for table display.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Instance")]
    instance: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Type")]
    item_type: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a run report for display.
    #[must_use]
    pub fn format_report(&self, report: &RunReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_report_text(report),
        }
    }

    fn format_report_text(report: &RunReport) -> String {
        let mut output = String::new();

        let rows: Vec<ChangeRow> = report
            .kinds
            .iter()
            .flat_map(|k| &k.instances)
            .flat_map(|o| &o.changes)
            .map(ChangeRow::from)
            .collect();

        if rows.is_empty() {
            let _ = writeln!(
                output,
                "{} No changes required, every instance is in sync.",
                "✓".green()
            );
        } else {
            let title = if report.dry_run { "Planned changes" } else { "Changes" };
            let _ = writeln!(output, "\n{title}\n");
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        for kind in &report.kinds {
            for outcome in &kind.instances {
                if let Some(reason) = &outcome.error {
                    let _ = writeln!(
                        output,
                        "{} {} on {}: {reason}",
                        "✗".red(),
                        kind.kind,
                        outcome.instance
                    );
                }
            }
        }

        let count = |action| {
            report
                .kinds
                .iter()
                .flat_map(|k| &k.instances)
                .map(|o| o.count(action))
                .sum::<usize>()
        };
        let _ = writeln!(
            output,
            "\n{}: {} to create, {} to update, {} to delete, {} applied",
            if report.dry_run { "Plan" } else { "Run" },
            count(ActionType::Create).to_string().green(),
            count(ActionType::Update).to_string().yellow(),
            count(ActionType::Delete).to_string().red(),
            report.applied_count()
        );

        if !report.success() {
            let _ = writeln!(
                output,
                "{} Failed instances: {}",
                "⚠".yellow(),
                report.invalid_instances.join(", ")
            );
        }

        output
    }

    /// Formats a validation result for display.
    #[must_use]
    pub fn format_validation(&self, config: &ConvergeConfig, result: &ValidationResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "valid": result.is_valid(),
                "warnings": result.warnings,
                "instances": config.addresses(),
                "audit_devices": config.audit_devices.len(),
                "secrets_engines": config.secrets_engines.len(),
                "policies": config.policies.len(),
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!("{} Configuration is valid!\n", "✓".green());
                if result.warning_count() > 0 {
                    output.push_str("\nWarnings:\n");
                    for warning in &result.warnings {
                        let _ = writeln!(output, "  {} {warning}", "⚠".yellow());
                    }
                }
                let _ = write!(
                    output,
                    "\nConfiguration summary:\n  Instances: {}\n  Audit devices: {}\n  Secrets engines: {}\n  Policies: {}\n",
                    config.instances.len(),
                    config.audit_devices.len(),
                    config.secrets_engines.len(),
                    config.policies.len()
                );
                output
            }
        }
    }

    /// Formats an action type with color.
    fn format_action_type(action_type: ActionType) -> String {
        match action_type {
            ActionType::Create => "+create".green().to_string(),
            ActionType::Update => "~update".yellow().to_string(),
            ActionType::Delete => "-delete".red().to_string(),
        }
    }
}

impl From<&PlannedChange> for ChangeRow {
    fn from(change: &PlannedChange) -> Self {
        Self {
            action: OutputFormatter::format_action_type(change.action),
            kind: change.kind,
            instance: change.instance.clone(),
            key: change.key.clone(),
            item_type: change.item_type.clone(),
            detail: change.detail.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{InstanceOutcome, KindReport};
    use chrono::Utc;
    use uuid::Uuid;

    fn report(dry_run: bool, error: Option<&str>) -> RunReport {
        let change = PlannedChange {
            action: ActionType::Create,
            kind: "policy",
            instance: String::from("https://v1:8200"),
            key: String::from("app"),
            item_type: String::from("acl"),
            description: String::new(),
            detail: Some(String::from("rules sha256:abc")),
        };
        RunReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            duration_secs: 0.1,
            dry_run,
            kinds: vec![KindReport {
                kind: "policy",
                instances: vec![InstanceOutcome {
                    instance: String::from("https://v1:8200"),
                    dry_run,
                    changes: vec![change],
                    applied: 0,
                    unchanged: 0,
                    protected: 2,
                    error: error.map(String::from),
                }],
                skipped: Vec::new(),
            }],
            instances: vec![String::from("https://v1:8200")],
            invalid_instances: error.map(|_| String::from("https://v1:8200")).into_iter().collect(),
        }
    }

    #[test]
    fn test_text_report_lists_changes() {
        colored::control::set_override(false);
        let text = OutputFormatter::new(OutputFormat::Text).format_report(&report(true, None));

        assert!(text.contains("Planned changes"));
        assert!(text.contains("+create"));
        assert!(text.contains("rules sha256:abc"));
        assert!(text.contains("1 to create"));
        assert!(!text.contains("Failed instances"));
    }

    #[test]
    fn test_text_report_shows_failures() {
        colored::control::set_override(false);
        let text =
            OutputFormatter::new(OutputFormat::Text).format_report(&report(false, Some("sealed")));

        assert!(text.contains("policy on https://v1:8200: sealed"));
        assert!(text.contains("Failed instances: https://v1:8200"));
    }

    #[test]
    fn test_json_report() {
        let json = OutputFormatter::new(OutputFormat::Json).format_report(&report(true, None));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["dry_run"], true);
        assert_eq!(value["kinds"][0]["instances"][0]["changes"][0]["action"], "create");
        assert_eq!(value["kinds"][0]["instances"][0]["protected"], 2);
    }
}
