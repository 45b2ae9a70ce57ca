//! Text rendering of reports.

use colored::Colorize;
use std::fmt::Write as _;

use super::list::TemplateStatus;
use crate::chain::ChainEntry;
use crate::inspector::IntrospectionReport;
use crate::validation::{RuleStatus, Severity, ValidationReport, ValidationResult};

pub fn introspection(report: &IntrospectionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "Template:".bold(), report.template.cyan());
    let names: Vec<&str> = report.chain.iter().map(|e| e.template.as_str()).collect();
    let _ = writeln!(out, "{} {}", "Chain:".bold(), names.join(" -> "));

    let metadata = &report.metadata;
    let version = metadata.version.as_ref().map_or_else(|| "-".to_string(), ToString::to_string);
    let _ = writeln!(
        out,
        "{} {} (version {}, enforcement {})",
        "Metadata:".bold(),
        metadata.template_id,
        version,
        metadata.enforcement
    );

    let _ = writeln!(out, "\n{} ({})", "Required variables".bold(), report.required_variables.len());
    for name in &report.required_variables {
        let provenance = report.variables.provenance(name).unwrap_or_default();
        let doc = metadata.variables.get(name).map(|d| format!(" - {d}")).unwrap_or_default();
        let _ = writeln!(out, "  {} {}{doc}", name.green(), format!("[{provenance}]").dimmed());
    }

    let _ = writeln!(out, "\n{} ({})", "Optional variables".bold(), report.optional_variables.len());
    for variable in &report.optional_variables {
        let provenance = report.variables.provenance(&variable.name).unwrap_or_default();
        let default = match &variable.default {
            Some(default) if !default.is_empty() => format!(" (default: {default})"),
            Some(_) => " (default)".to_string(),
            None => " (conditional)".to_string(),
        };
        let _ = writeln!(out, "  {}{default} {}", variable.name.yellow(), format!("[{provenance}]").dimmed());
    }

    let _ = writeln!(out, "\n{} ({})", "Blocks".bold(), report.blocks.len());
    for block in report.blocks.blocks.values() {
        let mut line = format!("  {} defined in {}", block.name.cyan(), block.defined_in);
        for o in &block.overrides {
            let _ = write!(line, ", overridden in {}{}", o.template, if o.calls_super { " (super)" } else { "" });
        }
        let _ = writeln!(out, "{line}");
    }

    if !metadata.rules.is_empty() {
        let _ = writeln!(out, "\n{} ({})", "Rules".bold(), metadata.rules.len());
        for rule in metadata.rules.values() {
            let _ = writeln!(
                out,
                "  {} [{}] {} {}",
                rule.id,
                rule.enforcement,
                rule.description,
                format!("(from {})", rule.declared_in).dimmed()
            );
        }
    }

    if report.has_warnings() {
        let _ = writeln!(out, "\n{} ({})", "Warnings".yellow().bold(), report.warnings.len());
        for warning in &report.warnings {
            let _ = writeln!(out, "  {} {warning}", "warning:".yellow());
        }
    }
    out
}

fn status_label(result: &ValidationResult) -> String {
    match (result.status, result.severity) {
        (RuleStatus::Passed, _) => "PASS".green().to_string(),
        (RuleStatus::Skipped, _) => "SKIP".dimmed().to_string(),
        (RuleStatus::Failed, Severity::Blocking) => "FAIL".red().bold().to_string(),
        (RuleStatus::Failed, Severity::Advisory) => "WARN".yellow().to_string(),
        (RuleStatus::Failed, Severity::Info) => "INFO".blue().to_string(),
    }
}

pub fn validation(report: &ValidationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "Validating".bold(), report.template.cyan());

    if report.results.is_empty() {
        let _ = writeln!(out, "  no rules declared");
    }
    for result in &report.results {
        let _ = writeln!(
            out,
            "  {} {} [{}] {} {}",
            status_label(result),
            result.rule_id,
            result.severity,
            result.message,
            format!("(from {})", result.declared_in).dimmed()
        );
    }

    let failures = report.failures().count();
    let blocking = report.blocking_failures().count();
    let summary = if report.blocking {
        format!("{blocking} blocking failure(s), {} non-blocking", failures - blocking).red().bold()
    } else if failures > 0 {
        format!("{failures} non-blocking failure(s)").yellow()
    } else {
        "all rules passed".green()
    };
    let _ = writeln!(out, "\n{summary}");
    out
}

pub fn chain(entries: &[ChainEntry]) -> String {
    let mut out = String::new();
    for (depth, entry) in entries.iter().enumerate() {
        let indent = "  ".repeat(depth);
        let _ = writeln!(out, "{indent}{} {}", entry.template.cyan(), entry.content_id.dimmed());
    }
    out
}

pub fn statuses(statuses: &[TemplateStatus]) -> String {
    if statuses.is_empty() {
        return format!("{}\n", "No templates found".yellow());
    }
    let mut out = String::new();
    for status in statuses {
        let detail = match (&status.error, status.chain_length) {
            (Some(error), _) => format!("{} {error}", "error".red()),
            (None, Some(len)) if status.warnings > 0 => {
                format!("{} ({len} tiers, {} warning(s))", "ok".yellow(), status.warnings)
            }
            (None, len) => format!("{} ({} tiers)", "ok".green(), len.unwrap_or_default()),
        };
        let _ = writeln!(out, "{} {detail}", status.template);
    }
    out
}

pub fn list(names: &[String]) -> String {
    if names.is_empty() {
        return format!("{}\n", "No templates found".yellow());
    }
    names.iter().fold(String::new(), |mut out, name| {
        let _ = writeln!(out, "{name}");
        out
    })
}
