//! Configuration for the `scaffold` binary.
//!
//! Settings live in a small TOML file, `scaffold.toml`:
//!
//! ```toml
//! [templates]
//! dir = "templates"
//! extensions = ["j2", "jinja", "jinja2", "tmpl"]
//!
//! [resolution]
//! max_depth = 16
//! ```
//!
//! Every key is optional. The file is located in this order:
//!
//! 1. An explicit path (the `--config` flag)
//! 2. The `SCAFFOLD_CONFIG` environment variable
//! 3. `scaffold.toml` in the working directory, when it exists
//! 4. Built-in defaults
//!
//! An explicitly named file (flag or environment) must exist.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::constants::{
    CONFIG_ENV_VAR, CONFIG_FILE_NAME, DEFAULT_EXTENSIONS, DEFAULT_MAX_DEPTH, DEFAULT_TEMPLATES_DIR,
};
use crate::core::ScaffoldError;

fn default_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TEMPLATES_DIR)
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|ext| (*ext).to_string()).collect()
}

const fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

/// `[templates]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Directory holding templates, relative to the working directory.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Extensions tried, in order, when a name has none.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            extensions: default_extensions(),
        }
    }
}

/// `[resolution]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

/// Contents of `scaffold.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScaffoldConfig {
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

impl ScaffoldConfig {
    /// Load configuration using the standard lookup order.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be read, if the
    /// file is not valid TOML for this schema, or if a value is out of range.
    pub async fn load(explicit: Option<PathBuf>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
        let env = std::env::var_os(CONFIG_ENV_VAR);
        Self::load_with_optional(explicit, env, &cwd).await
    }

    /// Load configuration with the environment supplied by the caller.
    pub async fn load_with_optional(
        explicit: Option<PathBuf>,
        env: Option<OsString>,
        cwd: &Path,
    ) -> Result<Self> {
        let named = explicit.or_else(|| env.filter(|value| !value.is_empty()).map(PathBuf::from));
        if let Some(path) = named {
            return Self::load_from(&path).await;
        }

        let local = cwd.join(CONFIG_FILE_NAME);
        if fs::try_exists(&local).await.unwrap_or(false) {
            Self::load_from(&local).await
        } else {
            tracing::debug!("no {CONFIG_FILE_NAME} found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate().with_context(|| format!("Invalid config in {}", path.display()))?;

        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ScaffoldError> {
        if self.resolution.max_depth == 0 {
            return Err(ScaffoldError::ConfigError {
                message: "resolution.max_depth must be at least 1".to_string(),
            });
        }
        if self.templates.extensions.is_empty() {
            return Err(ScaffoldError::ConfigError {
                message: "templates.extensions must not be empty".to_string(),
            });
        }
        if let Some(ext) = self.templates.extensions.iter().find(|ext| ext.trim().is_empty()) {
            return Err(ScaffoldError::ConfigError {
                message: format!("templates.extensions contains an empty entry {ext:?}"),
            });
        }
        Ok(())
    }

    /// Extensions with any leading dot removed.
    pub fn extensions(&self) -> Vec<String> {
        self.templates
            .extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .collect()
    }

    /// Templates directory, resolved against `cwd` when relative.
    pub fn templates_dir(&self, cwd: &Path) -> PathBuf {
        if self.templates.dir.is_absolute() {
            self.templates.dir.clone()
        } else {
            cwd.join(&self.templates.dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = ScaffoldConfig::load_with_optional(None, None, dir.path()).await.unwrap();

        assert_eq!(config, ScaffoldConfig::default());
        assert_eq!(config.resolution.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.templates_dir(dir.path()), dir.path().join("templates"));
    }

    #[tokio::test]
    async fn test_local_file_and_partial_tables() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[resolution]\nmax_depth = 4\n").unwrap();

        let config = ScaffoldConfig::load_with_optional(None, None, dir.path()).await.unwrap();
        assert_eq!(config.resolution.max_depth, 4);
        assert_eq!(config.templates, TemplatesConfig::default());
    }

    #[tokio::test]
    async fn test_lookup_order() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("explicit.toml");
        let env = dir.path().join("env.toml");
        std::fs::write(&explicit, "[templates]\ndir = \"a\"\n").unwrap();
        std::fs::write(&env, "[templates]\ndir = \"b\"\n").unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[templates]\ndir = \"c\"\n").unwrap();

        let pick = |explicit: Option<PathBuf>, env: Option<OsString>| {
            let cwd = dir.path().to_path_buf();
            async move { ScaffoldConfig::load_with_optional(explicit, env, &cwd).await.unwrap().templates.dir }
        };

        assert_eq!(pick(Some(explicit.clone()), Some(env.clone().into())).await, PathBuf::from("a"));
        assert_eq!(pick(None, Some(env.into())).await, PathBuf::from("b"));
        assert_eq!(pick(None, Some(OsString::new())).await, PathBuf::from("c"));
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result =
            ScaffoldConfig::load_with_optional(Some(dir.path().join("nope.toml")), None, dir.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");

        std::fs::write(&path, "[resolution]\nmax_depth = 0\n").unwrap();
        let err = ScaffoldConfig::load_from(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("max_depth must be at least 1"));

        std::fs::write(&path, "[templates]\nextensions = []\n").unwrap();
        let err = ScaffoldConfig::load_from(&path).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScaffoldError>(),
            Some(ScaffoldError::ConfigError { .. })
        ));

        std::fs::write(&path, "[templates]\nfolder = \"x\"\n").unwrap();
        assert!(ScaffoldConfig::load_from(&path).await.is_err());
    }

    #[test]
    fn test_extensions_strip_dots() {
        let config = ScaffoldConfig {
            templates: TemplatesConfig {
                dir: PathBuf::from("/abs"),
                extensions: vec![".j2".to_string(), "tmpl".to_string()],
            },
            ..Default::default()
        };
        assert_eq!(config.extensions(), vec!["j2", "tmpl"]);
        assert_eq!(config.templates_dir(Path::new("/cwd")), PathBuf::from("/abs"));
    }
}
