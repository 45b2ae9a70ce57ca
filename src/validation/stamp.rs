//! Provenance stamps in generated artifacts.
//!
//! A stamp is a line containing `SCAFFOLD: template=<id> version=<v>`,
//! usually inside whatever comment syntax the artifact's language uses.
//! `version=` is optional.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

use crate::constants::STAMP_PREFIX;

static STAMP: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"{}\s*template=(?P<template>[^\s]+)(?:\s+version=(?P<version>[^\s]+))?",
        regex::escape(STAMP_PREFIX)
    );
    Regex::new(&pattern).expect("stamp pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stamp {
    pub template: String,
    pub version: Option<String>,
    pub line: usize,
}

impl Stamp {
    /// Whether the stamp names `template_id` and, when one is expected, `version`.
    pub fn matches(&self, template_id: &str, version: Option<&str>) -> bool {
        self.template == template_id
            && version.is_none_or(|expected| self.version.as_deref() == Some(expected))
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template={}", self.template)?;
        if let Some(version) = &self.version {
            write!(f, " version={version}")?;
        }
        Ok(())
    }
}

/// Every stamp in `content`, in line order.
pub fn find_stamps(content: &str) -> Vec<Stamp> {
    content
        .lines()
        .enumerate()
        .flat_map(|(index, line)| {
            STAMP.captures_iter(line).map(move |caps| Stamp {
                template: caps["template"].to_string(),
                version: caps.name("version").map(|m| m.as_str().to_string()),
                line: index + 1,
            })
        })
        .collect()
}
