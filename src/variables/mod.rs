//! Variable classification across an inheritance chain.
//!
//! Every bare variable read in every tier is merged into one picture of the
//! chain's external inputs:
//!
//! - a variable is **required** unless at least one read anywhere in the
//!   chain is guarded by a default or a condition
//! - **provenance** is the root-most tier that reads it
//! - names a tier assigns (`set`, `macro`, imports) before reading them are
//!   locals, not inputs, and are dropped for the whole chain
//!
//! Ordering is first-seen, walking root → leaf and source order within a
//! tier, so identical chains always classify identically.

use serde::Serialize;
use std::collections::HashSet;

use crate::chain::InheritanceChain;
use crate::templating::{Guard, Node};
use crate::utils::OrderedMap;

/// Merged view of one external input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedVariable {
    pub name: String,
    pub required: bool,
    /// Root-most tier that reads the variable.
    pub provenance: String,
    /// First fallback description found root → leaf. `None` for required
    /// variables and for variables that are only conditionally read.
    pub default: Option<String>,
    /// Every tier that reads the variable, root first.
    pub tiers: Vec<String>,
}

/// Result of [`classify`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub variables: OrderedMap<ClassifiedVariable>,
}

impl Classification {
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.variables.values().filter(|v| v.required).map(|v| v.name.as_str())
    }

    /// Optional variables with their default descriptions.
    pub fn optional(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.variables
            .values()
            .filter(|v| !v.required)
            .map(|v| (v.name.as_str(), v.default.as_deref()))
    }

    pub fn provenance(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(|v| v.provenance.as_str())
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.variables.get(name).is_some_and(|v| v.required)
    }

    pub fn get(&self, name: &str) -> Option<&ClassifiedVariable> {
        self.variables.get(name)
    }
}

/// Classify every external variable the chain reads.
pub fn classify(chain: &InheritanceChain) -> Classification {
    let mut locals: HashSet<String> = HashSet::new();
    let mut merged: OrderedMap<ClassifiedVariable> = OrderedMap::new();

    for tier in chain.nodes() {
        let mut assigned: HashSet<&str> = HashSet::new();
        let mut read: HashSet<&str> = HashSet::new();

        for node in &tier.parsed.nodes {
            match node {
                Node::LocalAssign {
                    name, ..
                } => {
                    if !read.contains(name.as_str()) {
                        locals.insert(name.clone());
                    }
                    assigned.insert(name);
                }
                Node::VariableRef {
                    name,
                    guard,
                    ..
                } if !assigned.contains(name.as_str()) => {
                    read.insert(name);
                    let entry = merged.get_or_insert_with(name, || ClassifiedVariable {
                        name: name.clone(),
                        required: true,
                        provenance: tier.name.clone(),
                        default: None,
                        tiers: Vec::new(),
                    });
                    if entry.tiers.last() != Some(&tier.name) {
                        entry.tiers.push(tier.name.clone());
                    }
                    match guard {
                        Guard::Bare => {}
                        Guard::Conditional => entry.required = false,
                        Guard::Default(description) => {
                            entry.required = false;
                            if entry.default.is_none() {
                                entry.default = Some(description.clone());
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    let mut classification = Classification::default();
    for variable in merged.values() {
        if locals.contains(&variable.name) {
            tracing::debug!(variable = %variable.name, "treating locally assigned name as internal");
            continue;
        }
        classification.variables.insert(variable.name.clone(), variable.clone());
    }
    classification
}
