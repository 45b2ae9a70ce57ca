//! Directory-backed template provider.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{SourceText, TemplateSource};
use crate::constants::DEFAULT_EXTENSIONS;
use crate::core::ScaffoldError;
use crate::utils::{to_template_name, validate_template_name};

/// Serves templates from files below a root directory.
///
/// A name is first tried as a path relative to the root; when no such file
/// exists, each configured extension is appended in order (`base` →
/// `base.j2`, `base.jinja`, ...). Names that would escape the root are
/// rejected with [`ScaffoldError::SourceUnavailable`].
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectorySource {
    /// Create a source with the default extensions.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| (*ext).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let mut paths = vec![self.root.join(name)];
        paths.extend(self.extensions.iter().map(|ext| self.root.join(format!("{name}.{ext}"))));
        paths
    }

    fn has_template_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|known| known == ext))
    }

    /// All template names below the root, sorted.
    ///
    /// Only files carrying one of the configured extensions are listed.
    pub async fn list_templates(&self) -> Result<Vec<String>, ScaffoldError> {
        let this = self.clone();
        // walkdir is synchronous
        tokio::task::spawn_blocking(move || this.walk())
            .await
            .map_err(|err| ScaffoldError::SourceUnavailable {
                name: root_name(&self.root),
                reason: err.to_string(),
            })?
    }

    fn walk(&self) -> Result<Vec<String>, ScaffoldError> {
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|err| ScaffoldError::SourceUnavailable {
                name: root_name(&self.root),
                reason: err.to_string(),
            })?;
            if !entry.file_type().is_file() || !self.has_template_extension(entry.path()) {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                names.push(to_template_name(relative));
            }
        }
        names.sort();
        Ok(names)
    }
}

fn root_name(root: &Path) -> String {
    root.display().to_string()
}

impl TemplateSource for DirectorySource {
    async fn get_source(&self, name: &str) -> Result<Option<SourceText>, ScaffoldError> {
        validate_template_name(name).map_err(|err| ScaffoldError::SourceUnavailable {
            name: name.to_string(),
            reason: err.to_string(),
        })?;

        for path in self.candidates(name) {
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => {
                    tracing::debug!(template = name, path = %path.display(), "loaded template");
                    return Ok(Some(SourceText::new(text)));
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                // A directory with the template's name; keep probing extensions
                Err(_) if path.is_dir() => {}
                Err(err) => {
                    return Err(ScaffoldError::SourceUnavailable {
                        name: name.to_string(),
                        reason: format!("{}: {err}", path.display()),
                    });
                }
            }
        }
        Ok(None)
    }
}
