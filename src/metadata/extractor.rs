//! Extract the embedded metadata block from one template.
//!
//! The block is a comment whose first word is `scaffold:metadata`; the rest
//! of the comment is YAML:
//!
//! ```text
//! {# scaffold:metadata
//! template_id: python-component
//! version: 1.2.0
//! enforcement: STRICT
//! rules:
//!   - id: R1
//!     description: Generated files carry a provenance stamp
//!     pattern: "SCAFFOLD:"
//! #}
//! ```

use regex::Regex;
use serde::Deserialize;
use serde_yaml::Value;

use super::{EnforcementLevel, RuleCheck, RuleKind, RulePattern};
use crate::constants::METADATA_MARKER;
use crate::core::ScaffoldError;
use crate::templating::lexer::{self, Segment};
use crate::utils::OrderedMap;

/// A rule as declared by a single tier, before enforcement is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredRule {
    pub id: String,
    pub description: String,
    pub kind: RuleKind,
}

/// Metadata declared by a single tier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TierMetadata {
    pub template_id: Option<String>,
    pub version: Option<semver::Version>,
    pub enforcement: Option<EnforcementLevel>,
    pub variables: OrderedMap<String>,
    pub rules: Vec<DeclaredRule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMetadata {
    template_id: Option<String>,
    version: Option<Value>,
    enforcement: Option<String>,
    variables: Option<serde_yaml::Mapping>,
    #[serde(default)]
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    id: String,
    #[serde(default)]
    description: String,
    pattern: Option<String>,
    forbidden: Option<bool>,
    check: Option<String>,
    block: Option<String>,
}

/// Extracts and validates metadata blocks.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract the metadata declared by `template`, if any.
    ///
    /// # Errors
    ///
    /// [`ScaffoldError::MalformedMetadata`] when the block is not valid YAML,
    /// carries unknown keys, an invalid version or enforcement level, an
    /// invalid rule, or when the template declares more than one block.
    pub fn extract(template: &str, source: &str) -> Result<Option<TierMetadata>, ScaffoldError> {
        let segments = lexer::tokenize(source).map_err(|err| ScaffoldError::Parse {
            template: template.to_string(),
            line: err.line,
            message: err.message,
        })?;

        let mut bodies = segments.into_iter().filter_map(|segment| match segment {
            Segment::Comment {
                body,
                line,
            } => metadata_body(body).map(|yaml| (yaml, line)),
            _ => None,
        });

        let Some((yaml, _)) = bodies.next() else {
            return Ok(None);
        };
        if let Some((_, line)) = bodies.next() {
            return Err(malformed(
                template,
                format!("second metadata block at line {line}; only one is allowed per template"),
            ));
        }

        let metadata = Self::parse_yaml(template, yaml)?;
        tracing::debug!(
            template,
            rules = metadata.rules.len(),
            enforcement = ?metadata.enforcement,
            "extracted template metadata"
        );
        Ok(Some(metadata))
    }

    fn parse_yaml(template: &str, yaml: &str) -> Result<TierMetadata, ScaffoldError> {
        let raw: RawMetadata = if yaml.trim().is_empty() {
            RawMetadata::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|err| malformed(template, err.to_string()))?
        };

        let version = raw.version.map(|value| parse_version(template, &value)).transpose()?;

        let enforcement = raw
            .enforcement
            .map(|level| {
                level.parse::<EnforcementLevel>().map_err(|reason| malformed(template, reason))
            })
            .transpose()?;

        let mut variables = OrderedMap::new();
        for (key, value) in raw.variables.unwrap_or_default() {
            let (Value::String(name), Value::String(description)) = (key, value) else {
                return Err(malformed(template, "variable documentation must map names to strings"));
            };
            variables.insert(name, description);
        }

        let mut rules: Vec<DeclaredRule> = Vec::with_capacity(raw.rules.len());
        for rule in raw.rules {
            if rule.id.trim().is_empty() {
                return Err(malformed(template, "rule id must not be empty"));
            }
            if rules.iter().any(|existing| existing.id == rule.id) {
                return Err(malformed(template, format!("duplicate rule id '{}'", rule.id)));
            }
            rules.push(build_rule(template, rule)?);
        }

        Ok(TierMetadata {
            template_id: raw.template_id,
            version,
            enforcement,
            variables,
            rules,
        })
    }
}

/// YAML text of a metadata comment, or `None` for ordinary comments.
fn metadata_body(body: &str) -> Option<&str> {
    let rest = body.strip_prefix(METADATA_MARKER)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

fn parse_version(template: &str, value: &Value) -> Result<semver::Version, ScaffoldError> {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        _ => return Err(malformed(template, "version must be a string")),
    };
    semver::Version::parse(text.trim())
        .map_err(|err| malformed(template, format!("invalid semantic version '{text}': {err}")))
}

fn build_rule(template: &str, rule: RawRule) -> Result<DeclaredRule, ScaffoldError> {
    let id = rule.id;
    let kind = match (rule.pattern, rule.check) {
        (Some(pattern), None) => {
            if rule.block.is_some() {
                return Err(malformed(template, format!("rule '{id}': 'block' only applies to block_defined")));
            }
            let regex = Regex::new(&pattern).map_err(|err| {
                malformed(template, format!("rule '{id}' has an invalid pattern: {err}"))
            })?;
            RuleKind::Pattern(RulePattern {
                source: pattern,
                regex,
                forbidden: rule.forbidden.unwrap_or(false),
            })
        }
        (None, Some(check)) => {
            if rule.forbidden.is_some() {
                return Err(malformed(template, format!("rule '{id}': 'forbidden' only applies to pattern rules")));
            }
            let check = RuleCheck::from_parts(&check, rule.block)
                .map_err(|reason| malformed(template, format!("rule '{id}': {reason}")))?;
            RuleKind::Check(check)
        }
        (Some(_), Some(_)) => {
            return Err(malformed(template, format!("rule '{id}' declares both 'pattern' and 'check'")));
        }
        (None, None) => {
            return Err(malformed(template, format!("rule '{id}' needs either 'pattern' or 'check'")));
        }
    };

    Ok(DeclaredRule {
        id,
        description: rule.description,
        kind,
    })
}

fn malformed(template: &str, reason: impl Into<String>) -> ScaffoldError {
    ScaffoldError::MalformedMetadata {
        template: template.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(source: &str) -> String {
        match MetadataExtractor::extract("t.j2", source) {
            Err(ScaffoldError::MalformedMetadata {
                reason, ..
            }) => reason,
            other => panic!("expected malformed metadata, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_full_block() {
        let source = r#"{# scaffold:metadata
template_id: python-component
version: 1.2.0
enforcement: strict
variables:
  module_name: Dotted module path
  author: Who to credit
rules:
  - id: R1
    description: Stamp present
    pattern: "SCAFFOLD:"
  - id: R2
    description: No TODO markers
    pattern: TODO
    forbidden: true
  - id: R3
    check: block_defined
    block: body
#}
{% block body %}{% endblock %}"#;

        let metadata = MetadataExtractor::extract("t.j2", source).unwrap().unwrap();
        assert_eq!(metadata.template_id.as_deref(), Some("python-component"));
        assert_eq!(metadata.version, Some(semver::Version::new(1, 2, 0)));
        assert_eq!(metadata.enforcement, Some(EnforcementLevel::Strict));
        assert_eq!(metadata.variables.keys().collect::<Vec<_>>(), vec!["module_name", "author"]);

        let ids: Vec<_> = metadata.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["R1", "R2", "R3"]);
        assert!(matches!(&metadata.rules[1].kind, RuleKind::Pattern(p) if p.forbidden));
        assert_eq!(
            metadata.rules[2].kind,
            RuleKind::Check(RuleCheck::BlockDefined {
                block: "body".to_string()
            })
        );
    }

    #[test]
    fn test_no_block_and_ordinary_comments() {
        assert_eq!(MetadataExtractor::extract("t.j2", "{# plain #}{{ x }}").unwrap(), None);
        assert_eq!(MetadataExtractor::extract("t.j2", "{# scaffold:metadataX #}").unwrap(), None);
        assert_eq!(
            MetadataExtractor::extract("t.j2", "{# scaffold:metadata #}").unwrap(),
            Some(TierMetadata::default())
        );
    }

    #[test]
    fn test_whitespace_control_comment() {
        let metadata = MetadataExtractor::extract("t.j2", "{#- scaffold:metadata\nenforcement: NONE\n-#}")
            .unwrap()
            .unwrap();
        assert_eq!(metadata.enforcement, Some(EnforcementLevel::None));
    }

    #[test]
    fn test_malformed_variants() {
        assert!(reason("{# scaffold:metadata\nversion: 1.2\n#}").contains("invalid semantic version"));
        assert!(reason("{# scaffold:metadata\nversion: banana\n#}").contains("invalid semantic version"));
        assert!(reason("{# scaffold:metadata\nenforcement: LOUD\n#}").contains("unknown enforcement level"));
        assert!(reason("{# scaffold:metadata\ncolour: red\n#}").contains("unknown field"));
        assert!(reason("{# scaffold:metadata\nrules: [{id: R1}]\n#}").contains("needs either"));
        assert!(
            reason("{# scaffold:metadata\nrules: [{id: R1, pattern: a, check: scaffold_stamp}]\n#}")
                .contains("both")
        );
        assert!(reason("{# scaffold:metadata\nrules: [{id: R1, pattern: '('}]\n#}").contains("invalid pattern"));
        assert!(reason("{# scaffold:metadata\nrules: [{id: R1, check: lint}]\n#}").contains("unknown check"));
        assert!(reason("{# scaffold:metadata\nrules: [{id: R1, check: block_defined}]\n#}").contains("block"));
        assert!(
            reason("{# scaffold:metadata\nrules: [{id: R1, pattern: a}, {id: R1, pattern: b}]\n#}")
                .contains("duplicate rule id")
        );
        assert!(reason("{# scaffold:metadata #}{# scaffold:metadata #}").contains("only one"));
    }
}
