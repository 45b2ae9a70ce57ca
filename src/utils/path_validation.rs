//! Template-name validation for directory-backed sources.
//!
//! Template names arrive from `extends` tags written by template authors and
//! from the command line. Before a name is joined onto the templates root it
//! must stay inside that root.

use anyhow::{Result, anyhow};
use std::path::{Component, Path};

/// Validates that a template name is a relative path without traversal.
///
/// # Errors
/// Returns an error if the name:
/// - is empty
/// - is absolute or carries a Windows drive prefix
/// - contains a parent directory reference (`..`)
pub fn validate_template_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("Template name is empty"));
    }

    let path = Path::new(name);
    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(anyhow!(
                    "Template name contains parent directory reference (..): {name}"
                ));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(anyhow!("Template name must be relative to the templates directory: {name}"));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(())
}

/// Normalizes a path relative to the templates root into a template name.
///
/// Components are joined with `/` on every platform so that names in reports
/// and `extends` tags look the same on Windows and Unix.
pub fn to_template_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
