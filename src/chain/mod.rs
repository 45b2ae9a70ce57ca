//! Inheritance chain resolution.
//!
//! [`ChainResolver::resolve`] starts at a leaf template and follows `extends`
//! links upward until a template declares no parent. The result is an
//! [`InheritanceChain`] ordered root first, leaf last.
//!
//! # Failure modes
//!
//! | Situation | Error |
//! |-----------|-------|
//! | Leaf does not exist | [`ScaffoldError::TemplateNotFound`] |
//! | An `extends` target does not exist | [`ScaffoldError::MissingAncestor`] |
//! | A name is visited twice | [`ScaffoldError::CyclicInheritance`] |
//! | More than `max_depth` templates | [`ScaffoldError::ExcessiveDepth`] |
//! | Cancellation flag raised | [`ScaffoldError::ResolutionCancelled`] |
//!
//! Every failure aborts resolution; no partial chain is returned.

mod cache;

pub use cache::ParseCache;

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::constants::DEFAULT_MAX_DEPTH;
use crate::core::ScaffoldError;
use crate::source::{SourceText, TemplateSource};
use crate::templating::{ParsedTemplate, parse_template};

/// One tier of a chain.
#[derive(Debug, Clone)]
pub struct TemplateNode {
    pub name: String,
    pub source: String,
    pub content_id: String,
    pub parsed: Arc<ParsedTemplate>,
}

impl TemplateNode {
    pub fn parent(&self) -> Option<&str> {
        self.parsed.parent()
    }
}

/// Templates connected by `extends`, root first.
///
/// Names are unique and each non-root node's parent is its predecessor.
#[derive(Debug, Clone)]
pub struct InheritanceChain {
    nodes: Vec<TemplateNode>,
}

impl InheritanceChain {
    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    pub fn root(&self) -> &TemplateNode {
        &self.nodes[0]
    }

    pub fn leaf(&self) -> &TemplateNode {
        &self.nodes[self.nodes.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.nodes.iter().map(|node| node.name.clone()).collect()
    }

    /// Content identities root → leaf; the report cache key.
    pub fn content_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|node| node.content_id.clone()).collect()
    }

    pub fn summary(&self) -> Vec<ChainEntry> {
        self.nodes
            .iter()
            .map(|node| ChainEntry {
                template: node.name.clone(),
                extends: node.parent().map(str::to_string),
                content_id: node.content_id.clone(),
            })
            .collect()
    }
}

/// Serializable view of one chain tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainEntry {
    pub template: String,
    pub extends: Option<String>,
    pub content_id: String,
}

/// Cooperative cancellation flag, checked before every template fetch.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Resolves leaf templates into chains using a [`TemplateSource`].
pub struct ChainResolver<S> {
    source: S,
    cache: Option<Arc<ParseCache>>,
    max_depth: usize,
    cancel: CancellationFlag,
}

impl<S: TemplateSource> ChainResolver<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: None,
            max_depth: DEFAULT_MAX_DEPTH,
            cancel: CancellationFlag::new(),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ParseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
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

    /// Resolve `leaf` into its root-first chain.
    pub async fn resolve(&self, leaf: &str) -> Result<InheritanceChain, ScaffoldError> {
        // Leaf first while walking; reversed at the end
        let mut nodes: Vec<TemplateNode> = Vec::new();
        let mut visited: Vec<String> = Vec::new();
        let mut current = leaf.to_string();

        loop {
            if self.cancel.is_cancelled() {
                tracing::debug!(leaf, at = %current, "resolution cancelled");
                return Err(ScaffoldError::ResolutionCancelled {
                    leaf: leaf.to_string(),
                });
            }
            if visited.contains(&current) {
                visited.push(current);
                return Err(ScaffoldError::CyclicInheritance {
                    chain: visited,
                });
            }
            if visited.len() >= self.max_depth {
                return Err(ScaffoldError::ExcessiveDepth {
                    leaf: leaf.to_string(),
                    max_depth: self.max_depth,
                });
            }

            let Some(text) = self.source.get_source(&current).await? else {
                return Err(match visited.last() {
                    None => ScaffoldError::TemplateNotFound {
                        name: current,
                    },
                    Some(requester) => ScaffoldError::MissingAncestor {
                        missing: current,
                        requested_by: requester.clone(),
                    },
                });
            };
            let parsed = self.parse(&current, &text).await?;
            let parent = parsed.parent().map(str::to_string);
            tracing::debug!(
                leaf,
                template = %current,
                extends = parent.as_deref().unwrap_or("<root>"),
                "resolved chain tier"
            );

            visited.push(current.clone());
            nodes.push(TemplateNode {
                name: current,
                source: text.text,
                content_id: text.content_id,
                parsed,
            });

            match parent {
                Some(parent) => current = parent,
                None => break,
            }
        }

        nodes.reverse();
        Ok(InheritanceChain {
            nodes,
        })
    }

    async fn parse(
        &self,
        name: &str,
        text: &SourceText,
    ) -> Result<Arc<ParsedTemplate>, ScaffoldError> {
        match &self.cache {
            Some(cache) => cache.get_or_parse(name, text).await,
            None => parse_template(name, &text.text).map(Arc::new),
        }
    }
}
