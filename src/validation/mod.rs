//! Rule evaluation against the merged analysis of a chain.
//!
//! [`validate`] is pure: it reads the chain's classification, block index and
//! merged metadata (plus optional generated content) and returns one
//! [`ValidationResult`] per merged rule, in merged rule order. Whether a
//! failure halts scaffolding is left to the caller; [`ValidationReport`]
//! only records whether any failure is [`Severity::Blocking`].
//!
//! # Severity
//!
//! | Enforcement of the declaring tier | Severity |
//! |-----------------------------------|----------|
//! | ARCHITECTURAL, STRICT | BLOCKING |
//! | ADVISORY | ADVISORY |
//! | NONE | INFO |

mod stamp;

pub use stamp::{Stamp, find_stamps};

use serde::Serialize;
use std::fmt;

use crate::blocks::BlockIndex;
use crate::chain::InheritanceChain;
use crate::metadata::{EnforcementLevel, RuleCheck, RuleKind, RulePattern, TemplateMetadata, ValidationRule};
use crate::variables::Classification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Advisory,
    Blocking,
}

impl From<EnforcementLevel> for Severity {
    fn from(level: EnforcementLevel) -> Self {
        match level {
            EnforcementLevel::Architectural | EnforcementLevel::Strict => Self::Blocking,
            EnforcementLevel::Advisory => Self::Advisory,
            EnforcementLevel::None => Self::Info,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Advisory => "ADVISORY",
            Self::Blocking => "BLOCKING",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStatus {
    Passed,
    Failed,
    /// Content rule evaluated without content.
    Skipped,
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub rule_id: String,
    pub status: RuleStatus,
    pub severity: Severity,
    pub message: String,
    pub declared_in: String,
}

impl ValidationResult {
    pub fn is_failure(&self) -> bool {
        self.status == RuleStatus::Failed
    }

    pub fn is_blocking(&self) -> bool {
        self.is_failure() && self.severity == Severity::Blocking
    }
}

/// Ordered results plus the blocking verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub template: String,
    pub results: Vec<ValidationResult>,
    /// True iff some failed result is BLOCKING.
    pub blocking: bool,
}

impl ValidationReport {
    pub fn new(template: impl Into<String>, results: Vec<ValidationResult>) -> Self {
        let blocking = results.iter().any(ValidationResult::is_blocking);
        Self {
            template: template.into(),
            results,
            blocking,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| r.is_failure())
    }

    pub fn blocking_failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| r.is_blocking())
    }

    /// Failures that do not block.
    pub fn non_blocking_failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| r.is_failure() && !r.is_blocking())
    }

    pub fn get(&self, rule_id: &str) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.rule_id == rule_id)
    }
}

/// Evaluate every merged rule.
pub fn validate(
    chain: &InheritanceChain,
    classification: &Classification,
    blocks: &BlockIndex,
    metadata: &TemplateMetadata,
    content: Option<&str>,
) -> Vec<ValidationResult> {
    let results: Vec<ValidationResult> = metadata
        .rules
        .values()
        .map(|rule| {
            let (status, message) = match &rule.kind {
                RuleKind::Pattern(pattern) => match content {
                    Some(content) => check_pattern(pattern, content),
                    None => skipped(),
                },
                RuleKind::Check(check) => {
                    check_structure(check, classification, blocks, metadata, content)
                }
            };
            finish(rule, status, message)
        })
        .collect();

    tracing::debug!(
        template = %chain.leaf().name,
        rules = results.len(),
        failed = results.iter().filter(|r| r.is_failure()).count(),
        "validated chain"
    );
    results
}

fn skipped() -> (RuleStatus, String) {
    (RuleStatus::Skipped, "no content supplied".to_string())
}

fn finish(rule: &ValidationRule, status: RuleStatus, message: String) -> ValidationResult {
    ValidationResult {
        rule_id: rule.id.clone(),
        status,
        severity: rule.enforcement.into(),
        message: if rule.description.is_empty() || status != RuleStatus::Failed {
            message
        } else {
            format!("{}: {message}", rule.description)
        },
        declared_in: rule.declared_in.clone(),
    }
}

fn check_pattern(pattern: &RulePattern, content: &str) -> (RuleStatus, String) {
    let found = pattern.regex.find(content);
    match (found, pattern.forbidden) {
        (Some(_), false) => (RuleStatus::Passed, format!("content matches '{}'", pattern.source)),
        (None, false) => {
            (RuleStatus::Failed, format!("content does not match required pattern '{}'", pattern.source))
        }
        (None, true) => {
            (RuleStatus::Passed, format!("content does not match forbidden pattern '{}'", pattern.source))
        }
        (Some(m), true) => {
            let line = content[..m.start()].matches('\n').count() + 1;
            (
                RuleStatus::Failed,
                format!("content matches forbidden pattern '{}' at line {line}", pattern.source),
            )
        }
    }
}

fn check_structure(
    check: &RuleCheck,
    classification: &Classification,
    blocks: &BlockIndex,
    metadata: &TemplateMetadata,
    content: Option<&str>,
) -> (RuleStatus, String) {
    match check {
        RuleCheck::RequiredVariablesDocumented => {
            let missing: Vec<&str> =
                classification.required().filter(|name| !metadata.variables.contains_key(name)).collect();
            undocumented(missing, "required variables")
        }
        RuleCheck::VariablesDocumented => {
            let missing: Vec<&str> = classification
                .variables
                .keys()
                .filter(|name| !metadata.variables.contains_key(name))
                .collect();
            undocumented(missing, "variables")
        }
        RuleCheck::NoDeadOverrides => {
            if blocks.warnings.is_empty() {
                (RuleStatus::Passed, "every block overrides an inherited block".to_string())
            } else {
                let dead: Vec<String> =
                    blocks.warnings.iter().map(|w| format!("'{}' in '{}'", w.block, w.template)).collect();
                (RuleStatus::Failed, format!("blocks never rendered: {}", dead.join(", ")))
            }
        }
        RuleCheck::BlockDefined {
            block,
        } => match blocks.get(block) {
            Some(definition) => {
                (RuleStatus::Passed, format!("block '{block}' defined in '{}'", definition.defined_in))
            }
            None => (RuleStatus::Failed, format!("block '{block}' is not defined by any tier")),
        },
        RuleCheck::ScaffoldStamp => match content {
            Some(content) => check_stamp(content, metadata),
            None => skipped(),
        },
    }
}

fn undocumented(missing: Vec<&str>, what: &str) -> (RuleStatus, String) {
    if missing.is_empty() {
        (RuleStatus::Passed, format!("all {what} are documented"))
    } else {
        (RuleStatus::Failed, format!("undocumented {what}: {}", missing.join(", ")))
    }
}

fn check_stamp(content: &str, metadata: &TemplateMetadata) -> (RuleStatus, String) {
    let expected_version = metadata.version.as_ref().map(ToString::to_string);
    let stamps = find_stamps(content);

    if stamps.iter().any(|stamp| stamp.matches(&metadata.template_id, expected_version.as_deref())) {
        return (RuleStatus::Passed, format!("stamp for '{}' present", metadata.template_id));
    }

    let expected = match &expected_version {
        Some(version) => format!("template={} version={version}", metadata.template_id),
        None => format!("template={}", metadata.template_id),
    };
    match stamps.first() {
        None => (RuleStatus::Failed, format!("no SCAFFOLD stamp found (expected {expected})")),
        Some(found) => (RuleStatus::Failed, format!("stamp {found} does not match expected {expected}")),
    }
}
