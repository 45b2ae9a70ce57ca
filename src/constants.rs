//! Global constants used throughout the scaffold-cli codebase.
//!
//! Defaults for chain resolution, the metadata block marker, and the
//! provenance stamp format live here so that magic values stay discoverable.

/// Default maximum number of templates in one inheritance chain.
///
/// Chains longer than this raise [`crate::core::ScaffoldError::ExcessiveDepth`].
/// Sixteen tiers is far beyond any realistic hierarchy (universal base,
/// format base, language base, specialization) and stops pathological
/// configurations that never trivially self-reference.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Word that opens an embedded metadata comment: `{# scaffold:metadata ... #}`.
pub const METADATA_MARKER: &str = "scaffold:metadata";

/// Prefix of the provenance stamp written into generated artifacts.
pub const STAMP_PREFIX: &str = "SCAFFOLD:";

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "scaffold.toml";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV_VAR: &str = "SCAFFOLD_CONFIG";

/// Default directory (relative to the working directory) holding templates.
pub const DEFAULT_TEMPLATES_DIR: &str = "templates";

/// File extensions tried when a template name is given without one.
pub const DEFAULT_EXTENSIONS: &[&str] = &["j2", "jinja", "jinja2", "tmpl"];

/// Maximum edit distance, as a percentage of the name length, for
/// "did you mean" block-name suggestions.
pub const SIMILARITY_THRESHOLD_PERCENT: usize = 50;
