//! Template source providers.
//!
//! Chain resolution never touches the filesystem directly. It asks a
//! [`TemplateSource`] for each template by name, which keeps resolution
//! testable and lets callers serve templates from memory, disk, or anything
//! else that can produce text.
//!
//! # Providers
//!
//! - [`InMemorySource`] - name → text map, used by tests and embedders
//! - [`DirectorySource`] - templates under a root directory, with extension
//!   probing so `extends "base"` finds `base.j2`

mod directory;

pub use directory::DirectorySource;

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::ScaffoldError;
use crate::utils::compute_content_identity;

/// Template text together with its content identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub text: String,
    /// `sha256:<hex>` of `text`
    pub content_id: String,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let content_id = compute_content_identity(&text);
        Self {
            text,
            content_id,
        }
    }
}

/// Provider of template text by name.
///
/// `Ok(None)` means the template does not exist. Any other failure is an
/// error and is surfaced to the caller unchanged; resolution never retries.
pub trait TemplateSource: Send + Sync {
    fn get_source(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<SourceText>, ScaffoldError>> + Send;
}

impl<T: TemplateSource> TemplateSource for Arc<T> {
    fn get_source(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<SourceText>, ScaffoldError>> + Send {
        (**self).get_source(name)
    }
}

impl<T: TemplateSource> TemplateSource for &T {
    fn get_source(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<SourceText>, ScaffoldError>> + Send {
        (**self).get_source(name)
    }
}

/// In-memory template provider.
///
/// Templates can be replaced while the source is shared, which is how tests
/// exercise cache invalidation. Every lookup is counted.
#[derive(Debug, Default)]
pub struct InMemorySource {
    templates: DashMap<String, SourceText>,
    fetches: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with_template(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    /// Add or replace a template.
    pub fn insert(&self, name: impl Into<String>, text: impl Into<String>) {
        self.templates.insert(name.into(), SourceText::new(text));
    }

    pub fn remove(&self, name: &str) -> bool {
        self.templates.remove(name).is_some()
    }

    /// Template names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of `get_source` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl TemplateSource for InMemorySource {
    async fn get_source(&self, name: &str) -> Result<Option<SourceText>, ScaffoldError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.templates.get(name).map(|entry| entry.value().clone()))
    }
}
