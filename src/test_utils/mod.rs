//! Test utilities for scaffold-cli
//!
//! Shared by unit tests and, through the `test-utils` feature, by the
//! integration suite:
//!
//! - [`init_test_logging`] - one-time tracing setup honoring `RUST_LOG`
//! - [`fixtures`] - template sets for common chain shapes

pub mod fixtures;

pub use fixtures::{TemplateFixture, TemplateSetFixture};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays
/// off. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=scaffold_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainResolver;

    #[tokio::test]
    async fn test_layered_fixture_resolves() {
        init_test_logging(None);
        let source = TemplateSetFixture::layered().to_source();
        let chain = ChainResolver::new(source).resolve("component").await.unwrap();
        assert_eq!(chain.names(), vec!["root", "code", "python", "component"]);
    }

    #[test]
    fn test_layered_python_tier_keeps_shebang() {
        let fixture = TemplateSetFixture::layered();
        let python = fixture.templates.iter().find(|t| t.name == "python").unwrap();
        assert!(python.content.contains(r##"{% set shebang = "#!/usr/bin/env python3" %}"##));
        assert!(python.content.trim_end().ends_with("{% endblock %}"));

        let parsed = crate::templating::parse_template("python", &python.content).unwrap();
        assert_eq!(parsed.parent(), Some("code"));
        assert_eq!(parsed.local_assigns().collect::<Vec<_>>(), vec!["shebang"]);
    }

    #[test]
    fn test_fixture_write_to() {
        let dir = tempfile::TempDir::new().unwrap();
        TemplateSetFixture::new().with("python/base", "x").write_to(dir.path()).unwrap();
        assert!(dir.path().join("python/base.j2").is_file());
    }
}
