//! Block provenance across an inheritance chain.
//!
//! The block index records, for every block name, the tier that first
//! defines it and each later tier that overrides it (with whether the
//! override calls `super()`).
//!
//! Two problems are detected while building it:
//!
//! - a block calling `super()` with no earlier definition is fatal
//!   ([`ScaffoldError::SuperWithoutAncestor`])
//! - a top-level block introduced by an extending template can never render;
//!   that is reported as a [`BlockWarning`] and indexing continues

use serde::Serialize;
use std::fmt;
use strsim::levenshtein;

use crate::chain::InheritanceChain;
use crate::constants::SIMILARITY_THRESHOLD_PERCENT;
use crate::core::ScaffoldError;
use crate::utils::OrderedMap;

/// One override of an inherited block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockOverride {
    pub template: String,
    pub calls_super: bool,
}

/// Provenance of one block name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockDefinition {
    pub name: String,
    pub defined_in: String,
    /// Later tiers redefining the block, root → leaf.
    pub overrides: Vec<BlockOverride>,
}

impl BlockDefinition {
    /// Tier whose version of the block renders.
    pub fn effective_template(&self) -> &str {
        self.overrides.last().map_or(&self.defined_in, |o| &o.template)
    }
}

/// A block defined in an extending template that no ancestor declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockWarning {
    pub block: String,
    pub template: String,
    pub line: usize,
    /// Closest ancestor block name, when one is similar enough.
    pub suggestion: Option<String>,
}

impl fmt::Display for BlockWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block '{}' in '{}' (line {}) is not defined by any ancestor and will never render",
            self.block, self.template, self.line
        )?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{suggestion}'?)")?;
        }
        Ok(())
    }
}

/// Block index for one chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockIndex {
    pub blocks: OrderedMap<BlockDefinition>,
    #[serde(skip)]
    pub warnings: Vec<BlockWarning>,
}

impl BlockIndex {
    pub fn get(&self, name: &str) -> Option<&BlockDefinition> {
        self.blocks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Build the block index for `chain`.
pub fn index(chain: &InheritanceChain) -> Result<BlockIndex, ScaffoldError> {
    let mut result = BlockIndex::default();

    for (position, tier) in chain.nodes().iter().enumerate() {
        // Blocks this tier may legitimately override
        let inherited: Vec<String> = result.blocks.keys().map(str::to_string).collect();

        for site in tier.parsed.blocks() {
            if let Some(definition) = result.blocks.get_mut(site.name) {
                definition.overrides.push(BlockOverride {
                    template: tier.name.clone(),
                    calls_super: site.calls_super,
                });
                continue;
            }

            if site.calls_super {
                return Err(ScaffoldError::SuperWithoutAncestor {
                    template: tier.name.clone(),
                    block: site.name.to_string(),
                });
            }

            if position > 0 && site.enclosing.is_none() {
                let warning = BlockWarning {
                    block: site.name.to_string(),
                    template: tier.name.clone(),
                    line: site.line,
                    suggestion: closest_name(site.name, &inherited),
                };
                tracing::warn!("{warning}");
                result.warnings.push(warning);
            }

            result.blocks.insert(
                site.name,
                BlockDefinition {
                    name: site.name.to_string(),
                    defined_in: tier.name.clone(),
                    overrides: Vec::new(),
                },
            );
        }
    }

    Ok(result)
}

/// Nearest candidate by edit distance, within the similarity threshold.
fn closest_name(target: &str, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .map(|candidate| (candidate, levenshtein(target, candidate)))
        .filter(|(_, distance)| *distance <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate.clone())
}
