//! Cross-cutting utilities for scaffold-cli.
//!
//! - [`ordered_map`] - insertion-ordered map used by every report
//! - [`path_validation`] - template-name checks for directory sources
//! - [`compute_content_identity`] - SHA-256 content identity of template text

pub mod ordered_map;
pub mod path_validation;

pub use ordered_map::OrderedMap;
pub use path_validation::{to_template_name, validate_template_name};

use sha2::{Digest, Sha256};

/// Compute the content identity of a template source.
///
/// The identity is `sha256:` followed by the lowercase hex digest of the
/// UTF-8 bytes, so two sources share an identity exactly when they are
/// byte-identical.
///
/// # Examples
///
/// ```
/// use scaffold_cli::utils::compute_content_identity;
///
/// let id = compute_content_identity("{% extends \"base.j2\" %}");
/// assert!(id.starts_with("sha256:"));
/// assert_eq!(id.len(), 7 + 64);
/// ```
pub fn compute_content_identity(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_identity_is_stable() {
        let a = compute_content_identity("hello");
        let b = compute_content_identity("hello");
        let c = compute_content_identity("hello ");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
    }
}
