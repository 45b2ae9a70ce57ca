//! Template fixtures shared by unit and integration tests.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::source::InMemorySource;

/// Extension used when fixtures are written to disk.
pub const FIXTURE_EXTENSION: &str = "j2";

/// A single named template.
#[derive(Clone, Debug)]
pub struct TemplateFixture {
    pub name: String,
    pub content: String,
}

impl TemplateFixture {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Write the template to `dir/<name>.j2`, creating parent directories.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.{FIXTURE_EXTENSION}", self.name));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &self.content)
            .with_context(|| format!("Failed to write fixture {}", path.display()))?;
        Ok(path)
    }
}

/// A set of templates forming one or more chains.
#[derive(Clone, Debug, Default)]
pub struct TemplateSetFixture {
    pub templates: Vec<TemplateFixture>,
}

impl TemplateSetFixture {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.templates.push(TemplateFixture::new(name, content));
        self
    }

    /// Four-tier chain `root <- code <- python <- component`.
    ///
    /// - root is STRICT and requires a `SCAFFOLD:` stamp (rule `R1`)
    /// - component is ADVISORY and requires an `@layer:` marker (rule `R2`)
    /// - root reads `template_id` bare; component supplies a default for it
    pub fn layered() -> Self {
        Self::new()
            .with("root", LAYERED_ROOT)
            .with("code", LAYERED_CODE)
            .with("python", LAYERED_PYTHON)
            .with("component", LAYERED_COMPONENT)
    }

    /// `root <- leaf` where the leaf introduces a `footer` block nobody renders.
    pub fn dead_footer() -> Self {
        Self::new()
            .with("root", "{% block header %}{% endblock %}{% block body %}{% endblock %}")
            .with(
                "leaf",
                "{% extends \"root\" %}{% block body %}{{ title }}{% endblock %}{% block footer %}(c){% endblock %}",
            )
    }

    /// `a <- b <- a`.
    pub fn cyclic() -> Self {
        Self::new().with("a", "{% extends \"b\" %}").with("b", "{% extends \"a\" %}")
    }

    /// Leaf whose parent does not exist.
    pub fn orphan() -> Self {
        Self::new().with("orphan", "{% extends \"ghost\" %}{{ x }}")
    }

    /// Linear chain of `len` templates named `t0` (root) to `t{len-1}` (leaf).
    pub fn linear(len: usize) -> Self {
        (0..len).fold(Self::new(), |set, i| {
            let content = if i == 0 {
                "{% block body %}{% endblock %}".to_string()
            } else {
                format!("{{% extends \"t{}\" %}}", i - 1)
            };
            set.with(format!("t{i}"), content)
        })
    }

    /// An in-memory source holding every template.
    pub fn to_source(&self) -> InMemorySource {
        self.templates
            .iter()
            .fold(InMemorySource::new(), |source, t| source.with_template(&t.name, &t.content))
    }

    /// Write every template under `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        for template in &self.templates {
            template.write_to(dir)?;
        }
        Ok(())
    }
}

const LAYERED_ROOT: &str = r#"{# scaffold:metadata
template_id: universal
version: 1.0.0
enforcement: STRICT
variables:
  template_id: Identifier of the producing template
rules:
  - id: R1
    description: Generated files carry a provenance stamp
    pattern: "SCAFFOLD:"
#}
# SCAFFOLD: template={{ template_id }} version={{ version | default("0.0.0") }}
{% block header %}{% endblock %}
{% block body %}{% endblock %}
"#;

const LAYERED_CODE: &str = r#"{% extends "root" %}
{% block header %}{{ super() }}# language: {{ language }}{% endblock %}
"#;

const LAYERED_PYTHON: &str = r##"{% extends "code" %}
{% block body %}
{% set shebang = "#!/usr/bin/env python3" %}{{ shebang }}
import {{ module_name }}
{% endblock %}
"##;

const LAYERED_COMPONENT: &str = r#"{% extends "python" %}
{# scaffold:metadata
template_id: python-component
version: 1.2.0
enforcement: ADVISORY
variables:
  class_name: Name of the generated class
rules:
  - id: R2
    description: Modules declare their architectural layer
    pattern: "@layer:"
#}
{% block body %}{{ super() }}
# id: {{ template_id | default("python-component") }}
class {{ class_name }}:
{% for field in fields %}    {{ field.name }}: {{ field.type }}
{% endfor %}{% if docstring %}    """{{ docstring }}"""
{% endif %}{% endblock %}
"#;
