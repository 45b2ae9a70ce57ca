//! Static structure extraction for Jinja-style templates.
//!
//! Templates are never rendered here. Parsing produces a [`ParsedTemplate`]:
//! an ordered list of [`Node`]s recording the `extends` target, block
//! definitions (and whether each calls `super()`), bare variable reads with
//! their guards, and local assignments. Everything the rest of the crate
//! knows about a template comes from these nodes.
//!
//! # Recognised syntax
//!
//! - Delimiters `{{ }}`, `{% %}` and `{# #}`, including `-`/`+` whitespace
//!   control markers
//! - `extends`, `block`, `if`/`elif`/`else`, `for` (with `else`, inline
//!   filter and `recursive`), `set` (inline and block), `macro`, `call`,
//!   `filter`, `with`, `include`, `import`, `from ... import`, `raw` and
//!   `autoescape`
//!
//! Any other tag is a parse error.
//!
//! # Guards
//!
//! A variable read is [`Guard::Default`] when a `default`/`d` filter or an
//! `or` fallback follows it, and [`Guard::Conditional`] when it appears in an
//! `if` test or inside an `if` branch whose test mentions the same name.
//!
//! # Example
//!
//! ```
//! use scaffold_cli::templating::{Guard, parse_template};
//!
//! let parsed = parse_template(
//!     "component.j2",
//!     "{% extends \"python.j2\" %}{% block body %}{{ name | default('x') }}{% endblock %}",
//! )?;
//! assert_eq!(parsed.parent(), Some("python.j2"));
//! assert_eq!(parsed.variable_refs().next(), Some(("name", &Guard::Default("x".to_string()))));
//! # Ok::<(), scaffold_cli::core::ScaffoldError>(())
//! ```

pub(crate) mod expr;
pub(crate) mod lexer;
mod parser;


use serde::Serialize;

use crate::core::ScaffoldError;

/// How a variable read is protected against the variable being undefined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "description", rename_all = "snake_case")]
pub enum Guard {
    /// Unprotected read.
    Bare,
    /// Followed by a fallback; carries the fallback's source text.
    Default(String),
    /// Read only when a test on the same name holds.
    Conditional,
}

impl Guard {
    /// Whether this read tolerates the variable being absent.
    pub fn is_guarded(&self) -> bool {
        !matches!(self, Self::Bare)
    }
}

/// Target of an `extends` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendsTarget {
    Literal(String),
    /// Non-constant expression, kept verbatim.
    Dynamic(String),
}

/// Structural element of a template, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Extends {
        target: ExtendsTarget,
        line: usize,
    },
    BlockDef {
        name: String,
        calls_super: bool,
        /// Innermost block this one is nested in.
        enclosing: Option<String>,
        line: usize,
    },
    VariableRef {
        name: String,
        guard: Guard,
        line: usize,
    },
    LocalAssign {
        name: String,
        line: usize,
    },
    Text {
        len: usize,
        line: usize,
    },
}

impl Node {
    pub fn line(&self) -> usize {
        match self {
            Self::Extends {
                line, ..
            }
            | Self::BlockDef {
                line, ..
            }
            | Self::VariableRef {
                line, ..
            }
            | Self::LocalAssign {
                line, ..
            }
            | Self::Text {
                line, ..
            } => *line,
        }
    }
}

/// Borrowed view of a [`Node::BlockDef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSite<'a> {
    pub name: &'a str,
    pub calls_super: bool,
    pub enclosing: Option<&'a str>,
    pub line: usize,
}

/// Structural record of one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTemplate {
    pub name: String,
    pub nodes: Vec<Node>,
}

impl ParsedTemplate {
    /// Literal parent template name, if the template extends one.
    pub fn parent(&self) -> Option<&str> {
        self.nodes.iter().find_map(|node| match node {
            Node::Extends {
                target: ExtendsTarget::Literal(name),
                ..
            } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Blocks in definition order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockSite<'_>> {
        self.nodes.iter().filter_map(|node| match node {
            Node::BlockDef {
                name,
                calls_super,
                enclosing,
                line,
            } => Some(BlockSite {
                name: name.as_str(),
                calls_super: *calls_super,
                enclosing: enclosing.as_deref(),
                line: *line,
            }),
            _ => None,
        })
    }

    pub fn variable_refs(&self) -> impl Iterator<Item = (&str, &Guard)> {
        self.nodes.iter().filter_map(|node| match node {
            Node::VariableRef {
                name,
                guard,
                ..
            } => Some((name.as_str(), guard)),
            _ => None,
        })
    }

    pub fn local_assigns(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|node| match node {
            Node::LocalAssign {
                name, ..
            } => Some(name.as_str()),
            _ => None,
        })
    }
}

/// Parse template source into its structural record.
///
/// # Errors
///
/// - [`ScaffoldError::Parse`] on malformed syntax
/// - [`ScaffoldError::AmbiguousExtends`] when the `extends` target is not a
///   string literal, or the `extends` sits inside a conditional, loop or macro
pub fn parse_template(name: &str, source: &str) -> Result<ParsedTemplate, ScaffoldError> {
    let nodes = parser::Parser::new().parse(source).map_err(|err| ScaffoldError::Parse {
        template: name.to_string(),
        line: err.line,
        message: err.message,
    })?;

    if let Some(expression) = nodes.iter().find_map(|node| match node {
        Node::Extends {
            target: ExtendsTarget::Dynamic(expression),
            ..
        } => Some(expression.clone()),
        _ => None,
    }) {
        return Err(ScaffoldError::AmbiguousExtends {
            template: name.to_string(),
            expression,
        });
    }

    tracing::debug!(template = name, nodes = nodes.len(), "parsed template");
    Ok(ParsedTemplate {
        name: name.to_string(),
        nodes,
    })
}
