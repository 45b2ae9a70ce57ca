//! Template metadata: identity, version, enforcement level and rules.
//!
//! Each tier may embed one metadata block (see [`extractor`]). [`collect`]
//! merges the blocks of a chain root → leaf:
//!
//! - rules merge by id; a leafward rule replaces an earlier one with the same
//!   id in place, other rules accumulate
//! - each rule takes its severity from the enforcement level of the tier that
//!   declares it; a tier without `enforcement` inherits the nearest
//!   ancestor's level (ADVISORY when no tier declares one)
//! - the leaf's enforcement level is authoritative for the merged result;
//!   `template_id` and `version` come from the leaf, or from the nearest
//!   ancestor declaring them
//! - per-tier declarations are kept for audit

pub mod extractor;

pub use extractor::{DeclaredRule, MetadataExtractor, TierMetadata};

use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::chain::InheritanceChain;
use crate::core::ScaffoldError;
use crate::utils::OrderedMap;

/// How strictly a tier's rules are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnforcementLevel {
    None,
    #[default]
    Advisory,
    Strict,
    Architectural,
}

impl FromStr for EnforcementLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "ADVISORY" => Ok(Self::Advisory),
            "STRICT" => Ok(Self::Strict),
            "ARCHITECTURAL" => Ok(Self::Architectural),
            _ => Err(format!(
                "unknown enforcement level '{s}' (expected NONE, ADVISORY, STRICT or ARCHITECTURAL)"
            )),
        }
    }
}

impl fmt::Display for EnforcementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::Advisory => "ADVISORY",
            Self::Strict => "STRICT",
            Self::Architectural => "ARCHITECTURAL",
        };
        f.write_str(name)
    }
}

/// Structural predicate evaluated against the merged analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum RuleCheck {
    /// Every required variable has a `variables` description.
    RequiredVariablesDocumented,
    /// Every classified variable has a `variables` description.
    VariablesDocumented,
    /// No tier introduces a block that can never render.
    NoDeadOverrides,
    /// The chain defines the named block.
    BlockDefined {
        block: String,
    },
    /// Content carries `SCAFFOLD: template=<id> version=<v>`.
    ScaffoldStamp,
}

impl RuleCheck {
    /// Build a check from its metadata name and optional `block` key.
    pub fn from_parts(name: &str, block: Option<String>) -> Result<Self, String> {
        let check = match name {
            "required_variables_documented" => Self::RequiredVariablesDocumented,
            "variables_documented" => Self::VariablesDocumented,
            "no_dead_overrides" => Self::NoDeadOverrides,
            "scaffold_stamp" => Self::ScaffoldStamp,
            "block_defined" => {
                return match block {
                    Some(block) if !block.trim().is_empty() => Ok(Self::BlockDefined {
                        block,
                    }),
                    _ => Err("block_defined requires a 'block' name".to_string()),
                };
            }
            other => return Err(format!("unknown check '{other}'")),
        };
        if block.is_some() {
            return Err(format!("'block' does not apply to check '{name}'"));
        }
        Ok(check)
    }
}

/// Compiled `pattern` rule.
#[derive(Debug, Clone, Serialize)]
pub struct RulePattern {
    #[serde(rename = "pattern")]
    pub source: String,
    #[serde(skip)]
    pub regex: Regex,
    /// Content must *not* match.
    pub forbidden: bool,
}

impl PartialEq for RulePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.forbidden == other.forbidden
    }
}

impl Eq for RulePattern {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RuleKind {
    Pattern(RulePattern),
    Check(RuleCheck),
}

/// A merged rule with its resolved enforcement level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationRule {
    pub id: String,
    pub description: String,
    #[serde(flatten)]
    pub kind: RuleKind,
    pub enforcement: EnforcementLevel,
    /// Tier whose declaration is in effect.
    pub declared_in: String,
}

/// What one tier declared, for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierAudit {
    pub template: String,
    pub template_id: Option<String>,
    #[serde(serialize_with = "serialize_version")]
    pub version: Option<semver::Version>,
    /// Effective level of the tier, declared or inherited.
    pub enforcement: EnforcementLevel,
    pub declares_enforcement: bool,
    pub rules: Vec<String>,
}

/// Metadata merged along a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateMetadata {
    pub template_id: String,
    #[serde(serialize_with = "serialize_version")]
    pub version: Option<semver::Version>,
    pub enforcement: EnforcementLevel,
    /// Variable documentation; leafward descriptions win.
    pub variables: OrderedMap<String>,
    pub rules: OrderedMap<ValidationRule>,
    pub tiers: Vec<TierAudit>,
}

fn serialize_version<S: Serializer>(
    version: &Option<semver::Version>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match version {
        Some(version) => serializer.serialize_some(&version.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Merge the metadata of every tier in `chain`.
pub fn collect(chain: &InheritanceChain) -> Result<TemplateMetadata, ScaffoldError> {
    let mut inherited: Option<EnforcementLevel> = None;
    let mut level = EnforcementLevel::default();
    let mut template_id: Option<String> = None;
    let mut version: Option<semver::Version> = None;
    let mut variables = OrderedMap::new();
    let mut rules: OrderedMap<ValidationRule> = OrderedMap::new();
    let mut tiers = Vec::with_capacity(chain.len());

    for tier in chain.nodes() {
        let declared = MetadataExtractor::extract(&tier.name, &tier.source)?.unwrap_or_default();

        level = declared.enforcement.or(inherited).unwrap_or_default();
        if declared.enforcement.is_some() {
            inherited = declared.enforcement;
        }
        if declared.template_id.is_some() {
            template_id.clone_from(&declared.template_id);
        }
        if declared.version.is_some() {
            version.clone_from(&declared.version);
        }
        for (name, description) in declared.variables.iter() {
            variables.insert(name, description.clone());
        }

        tiers.push(TierAudit {
            template: tier.name.clone(),
            template_id: declared.template_id,
            version: declared.version,
            enforcement: level,
            declares_enforcement: declared.enforcement.is_some(),
            rules: declared.rules.iter().map(|rule| rule.id.clone()).collect(),
        });

        for rule in declared.rules {
            if let Some(previous) = rules.insert(
                rule.id.clone(),
                ValidationRule {
                    id: rule.id.clone(),
                    description: rule.description,
                    kind: rule.kind,
                    enforcement: level,
                    declared_in: tier.name.clone(),
                },
            ) {
                tracing::debug!(
                    rule = %rule.id,
                    from = %previous.declared_in,
                    to = %tier.name,
                    "rule overridden by descendant tier"
                );
            }
        }
    }

    Ok(TemplateMetadata {
        template_id: template_id.unwrap_or_else(|| chain.leaf().name.clone()),
        version,
        enforcement: level,
        variables,
        rules,
        tiers,
    })
}
