//! Request facade over the analysis pipeline.
//!
//! An [`Inspector`] owns a [`TemplateSource`], a shared [`ParseCache`] and a
//! cache of finished analyses. Each request resolves a fresh chain (so edits
//! to any tier are always observed), then reuses the analysis of an earlier
//! request when every tier's content identity is unchanged.
//!
//! ```rust,no_run
//! use scaffold_cli::inspector::Inspector;
//! use scaffold_cli::source::InMemorySource;
//!
//! # async fn example() -> Result<(), scaffold_cli::core::ScaffoldError> {
//! let source = InMemorySource::new()
//!     .with_template("root", "{{ module_name }}{% block body %}{% endblock %}")
//!     .with_template("leaf", "{% extends \"root\" %}{% block body %}{{ x | default('1') }}{% endblock %}");
//! let inspector = Inspector::new(source);
//!
//! let report = inspector.introspect("leaf").await?;
//! assert_eq!(report.required_variables, vec!["module_name"]);
//!
//! let validation = inspector.validate("leaf", Some("generated text")).await?;
//! assert!(!validation.blocking);
//! # Ok(())
//! # }
//! ```

use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

use crate::blocks::{self, BlockIndex, BlockWarning};
use crate::chain::{CancellationFlag, ChainEntry, ChainResolver, InheritanceChain, ParseCache};
use crate::constants::DEFAULT_MAX_DEPTH;
use crate::core::ScaffoldError;
use crate::metadata::{self, TemplateMetadata};
use crate::source::TemplateSource;
use crate::validation::{self, ValidationReport};
use crate::variables::{self, Classification};

/// Optional input and the fallback that covers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionalVariable {
    pub name: String,
    pub default: Option<String>,
}

/// Everything known about a leaf template before rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntrospectionReport {
    pub template: String,
    pub chain: Vec<ChainEntry>,
    pub required_variables: Vec<String>,
    pub optional_variables: Vec<OptionalVariable>,
    /// Full per-variable detail, including provenance.
    pub variables: Classification,
    pub blocks: BlockIndex,
    pub metadata: TemplateMetadata,
    pub warnings: Vec<BlockWarning>,
}

impl IntrospectionReport {
    fn build(chain: &InheritanceChain) -> Result<Self, ScaffoldError> {
        let classification = variables::classify(chain);
        let blocks = blocks::index(chain)?;
        let metadata = metadata::collect(chain)?;

        Ok(Self {
            template: chain.leaf().name.clone(),
            chain: chain.summary(),
            required_variables: classification.required().map(str::to_string).collect(),
            optional_variables: classification
                .optional()
                .map(|(name, default)| OptionalVariable {
                    name: name.to_string(),
                    default: default.map(str::to_string),
                })
                .collect(),
            warnings: blocks.warnings.clone(),
            variables: classification,
            blocks,
            metadata,
        })
    }

    /// Whether the report carries any non-fatal findings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

type ReportKey = (String, Vec<String>);

/// Drives chain resolution, classification, block indexing, metadata
/// merging and validation for leaf templates.
pub struct Inspector<S> {
    source: S,
    parse_cache: Arc<ParseCache>,
    reports: DashMap<ReportKey, Arc<IntrospectionReport>>,
    max_depth: usize,
    cancel: CancellationFlag,
}

impl<S: TemplateSource> Inspector<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            parse_cache: Arc::new(ParseCache::new()),
            reports: DashMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            cancel: CancellationFlag::new(),
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Share a parse cache with other inspectors.
    #[must_use]
    pub fn with_parse_cache(mut self, cache: Arc<ParseCache>) -> Self {
        self.parse_cache = cache;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn parse_cache(&self) -> &Arc<ParseCache> {
        &self.parse_cache
    }

    /// Number of analyses currently memoized.
    pub fn cached_reports(&self) -> usize {
        self.reports.len()
    }

    /// Resolve the inheritance chain of `leaf`.
    pub async fn resolve(&self, leaf: &str) -> Result<InheritanceChain, ScaffoldError> {
        ChainResolver::new(&self.source)
            .with_cache(Arc::clone(&self.parse_cache))
            .with_max_depth(self.max_depth)
            .with_cancellation(self.cancel.clone())
            .resolve(leaf)
            .await
    }

    /// Introspect `leaf`: its chain, inputs, blocks, metadata and warnings.
    pub async fn introspect(&self, leaf: &str) -> Result<Arc<IntrospectionReport>, ScaffoldError> {
        let chain = self.resolve(leaf).await?;
        self.analyze(&chain)
    }

    /// Introspect several leaves concurrently.
    ///
    /// Results come back in input order; one failing leaf does not affect the
    /// others. Tiers shared between leaves are parsed once.
    pub async fn introspect_many(
        &self,
        leaves: &[String],
    ) -> Vec<Result<Arc<IntrospectionReport>, ScaffoldError>> {
        let futures: Vec<_> = leaves.iter().map(|leaf| self.introspect(leaf)).collect();
        join_all(futures).await
    }

    /// Validate `leaf`, optionally against generated `content`.
    pub async fn validate(
        &self,
        leaf: &str,
        content: Option<&str>,
    ) -> Result<ValidationReport, ScaffoldError> {
        let chain = self.resolve(leaf).await?;
        let report = self.analyze(&chain)?;
        let results =
            validation::validate(&chain, &report.variables, &report.blocks, &report.metadata, content);

        let report = ValidationReport::new(leaf, results);
        if report.blocking {
            tracing::warn!(
                template = leaf,
                failures = report.blocking_failures().count(),
                "validation has blocking failures"
            );
        }
        Ok(report)
    }

    fn analyze(&self, chain: &InheritanceChain) -> Result<Arc<IntrospectionReport>, ScaffoldError> {
        let key = (chain.leaf().name.clone(), chain.content_ids());
        if let Some(report) = self.reports.get(&key) {
            tracing::debug!(template = %key.0, "report cache hit");
            return Ok(Arc::clone(report.value()));
        }

        let report = Arc::new(IntrospectionReport::build(chain)?);
        // Superseded analyses of the same leaf can never be hit again
        self.reports.retain(|(leaf, _), _| *leaf != key.0);
        self.reports.insert(key, Arc::clone(&report));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;

    fn source() -> InMemorySource {
        InMemorySource::new()
            .with_template(
                "root",
                "{# scaffold:metadata\ntemplate_id: svc\nenforcement: STRICT\nrules:\n  - id: R1\n    pattern: 'SCAFFOLD:'\n#}{{ module_name }}{% block body %}{% endblock %}",
            )
            .with_template(
                "leaf",
                "{% extends \"root\" %}{% block body %}{{ author | default('anon') }}{% endblock %}{% block footer %}{% endblock %}",
            )
    }

    #[tokio::test]
    async fn test_introspect_report() {
        let inspector = Inspector::new(source());
        let report = inspector.introspect("leaf").await.unwrap();

        assert_eq!(report.template, "leaf");
        assert_eq!(report.chain.iter().map(|e| e.template.as_str()).collect::<Vec<_>>(), vec!["root", "leaf"]);
        assert_eq!(report.required_variables, vec!["module_name"]);
        assert_eq!(
            report.optional_variables,
            vec![OptionalVariable {
                name: "author".to_string(),
                default: Some("anon".to_string()),
            }]
        );
        assert_eq!(report.metadata.template_id, "svc");
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].block, "footer");
    }

    #[tokio::test]
    async fn test_report_cache_tracks_content() {
        let inspector = Inspector::new(source());
        let first = inspector.introspect("leaf").await.unwrap();
        let second = inspector.introspect("leaf").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        inspector.source().insert("root", "{{ other }}{% block body %}{% endblock %}");
        let third = inspector.introspect("leaf").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.required_variables, vec!["other"]);
        assert_eq!(inspector.cached_reports(), 1);
    }

    #[tokio::test]
    async fn test_validate_blocking() {
        let inspector = Inspector::new(source());

        let report = inspector.validate("leaf", Some("nothing here")).await.unwrap();
        assert!(report.blocking);

        let report = inspector.validate("leaf", Some("# SCAFFOLD: template=svc")).await.unwrap();
        assert!(!report.blocking);
    }

    #[tokio::test]
    async fn test_introspect_many_keeps_order_and_isolates_failures() {
        let inspector = Inspector::new(source());
        let leaves = vec!["leaf".to_string(), "missing".to_string(), "root".to_string()];

        let results = inspector.introspect_many(&leaves).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().template, "leaf");
        assert!(matches!(results[1], Err(ScaffoldError::TemplateNotFound { .. })));
        assert_eq!(results[2].as_ref().unwrap().template, "root");
        assert_eq!(inspector.parse_cache().parse_count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_inspector() {
        let cancel = CancellationFlag::new();
        let inspector = Inspector::new(source()).with_cancellation(cancel.clone());
        cancel.cancel();

        let err = inspector.introspect("leaf").await.unwrap_err();
        assert!(matches!(err, ScaffoldError::ResolutionCancelled { .. }));
        assert_eq!(inspector.source().fetch_count(), 0);
    }
}
