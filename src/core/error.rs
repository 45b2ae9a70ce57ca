//! Error handling for scaffold-cli
//!
//! This module provides the typed error enum used by every stage of template
//! introspection and the user-friendly wrapper the CLI prints. The error system
//! follows two principles:
//! 1. **Strongly-typed errors** so callers can branch on the exact failure
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`ScaffoldError`] - Enumerated failures for parsing, chain resolution,
//!   metadata collection and configuration
//! - [`ErrorContext`] - Wrapper that adds details and a suggestion for display
//!
//! # Fatal vs. non-fatal
//!
//! Every variant of [`ScaffoldError`] aborts the introspection or validation
//! call that raised it. Non-fatal findings (dead block overrides, advisory
//! rule failures) are never errors; they are accumulated into the reports.
//!
//! # Examples
//!
//! ```rust,no_run
//! use scaffold_cli::core::{ScaffoldError, user_friendly_error};
//!
//! let error = ScaffoldError::CyclicInheritance {
//!     chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for template introspection.
///
/// Variants are cloneable so that a failed parse can be cached and replayed to
/// every caller waiting on the same template.
///
/// ## Template structure
/// - [`Parse`](ScaffoldError::Parse) - malformed template syntax
/// - [`AmbiguousExtends`](ScaffoldError::AmbiguousExtends) - extends target is not a literal
///
/// ## Chain resolution
/// - [`TemplateNotFound`](ScaffoldError::TemplateNotFound)
/// - [`MissingAncestor`](ScaffoldError::MissingAncestor)
/// - [`CyclicInheritance`](ScaffoldError::CyclicInheritance)
/// - [`ExcessiveDepth`](ScaffoldError::ExcessiveDepth)
/// - [`ResolutionCancelled`](ScaffoldError::ResolutionCancelled)
/// - [`SourceUnavailable`](ScaffoldError::SourceUnavailable)
///
/// ## Merged analysis
/// - [`SuperWithoutAncestor`](ScaffoldError::SuperWithoutAncestor)
/// - [`MalformedMetadata`](ScaffoldError::MalformedMetadata)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScaffoldError {
    /// Template text could not be parsed.
    #[error("Parse error in template '{template}' at line {line}: {message}")]
    Parse {
        /// Template name
        template: String,
        /// 1-based line where the problem was detected
        line: usize,
        /// Description of the syntax problem
        message: String,
    },

    /// The `extends` tag uses an expression that cannot be evaluated statically.
    #[error("Template '{template}' extends a non-constant expression: {expression}")]
    AmbiguousExtends {
        /// Template name
        template: String,
        /// The raw extends expression
        expression: String,
    },

    /// The requested leaf template does not exist.
    #[error("Template '{name}' not found")]
    TemplateNotFound {
        /// Name that was requested
        name: String,
    },

    /// An ancestor named by an `extends` tag does not exist.
    #[error("Template '{missing}' not found (extended by '{requested_by}')")]
    MissingAncestor {
        /// The ancestor that could not be found
        missing: String,
        /// The template whose extends tag referenced it
        requested_by: String,
    },

    /// A template name re-appeared while walking ancestors.
    ///
    /// `chain` lists the names visited from the leaf up to and including the
    /// repeated name.
    #[error("Cyclic inheritance detected: {}", chain.join(" -> "))]
    CyclicInheritance {
        /// Visited names, leaf first, ending with the repeated name
        chain: Vec<String>,
    },

    /// The chain grew beyond the configured maximum depth.
    #[error("Inheritance chain for '{leaf}' exceeds the maximum depth of {max_depth}")]
    ExcessiveDepth {
        /// Leaf template being resolved
        leaf: String,
        /// Configured maximum chain length
        max_depth: usize,
    },

    /// Resolution was cancelled between ancestor fetches.
    #[error("Resolution of '{leaf}' was cancelled")]
    ResolutionCancelled {
        /// Leaf template being resolved
        leaf: String,
    },

    /// The template source provider failed for a reason other than not-found.
    #[error("Cannot read template '{name}': {reason}")]
    SourceUnavailable {
        /// Template name
        name: String,
        /// Provider failure description
        reason: String,
    },

    /// A block calls `super()` although no ancestor tier defines it.
    #[error("Block '{block}' in template '{template}' calls super() but no ancestor defines it")]
    SuperWithoutAncestor {
        /// Template containing the offending block
        template: String,
        /// Block name
        block: String,
    },

    /// An embedded metadata block is invalid.
    #[error("Malformed metadata in template '{template}': {reason}")]
    MalformedMetadata {
        /// Template name
        template: String,
        /// What is wrong with it
        reason: String,
    },

    /// Configuration file problem.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },
}

impl ScaffoldError {
    /// Template name most closely associated with this error, if any.
    pub fn template(&self) -> Option<&str> {
        match self {
            Self::Parse {
                template,
                ..
            }
            | Self::AmbiguousExtends {
                template,
                ..
            }
            | Self::SuperWithoutAncestor {
                template,
                ..
            }
            | Self::MalformedMetadata {
                template,
                ..
            } => Some(template),
            Self::TemplateNotFound {
                name,
            }
            | Self::SourceUnavailable {
                name,
                ..
            } => Some(name),
            Self::MissingAncestor {
                missing,
                ..
            } => Some(missing),
            Self::ExcessiveDepth {
                leaf,
                ..
            }
            | Self::ResolutionCancelled {
                leaf,
            } => Some(leaf),
            Self::CyclicInheritance {
                chain,
            } => chain.first().map(String::as_str),
            Self::ConfigError {
                ..
            } => None,
        }
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// Details are printed in yellow and suggestions in green, below the red
/// error line.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: ScaffoldError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: ScaffoldError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`].
///
/// Recognizes [`ScaffoldError`] anywhere in the `anyhow` chain and attaches a
/// tailored suggestion. Other errors are wrapped as configuration/IO failures
/// with the full context chain as details.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(scaffold_error) = cause.downcast_ref::<ScaffoldError>() {
            return create_error_context(scaffold_error.clone());
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        return ErrorContext::new(ScaffoldError::ConfigError {
            message: io_error.to_string(),
        })
        .with_suggestion("Check that the file or directory exists and is readable");
    }

    let details = error.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>().join(": ");
    let ctx = ErrorContext::new(ScaffoldError::ConfigError {
        message: error.to_string(),
    });
    if details.is_empty() {
        ctx
    } else {
        ctx.with_details(details)
    }
}

fn create_error_context(error: ScaffoldError) -> ErrorContext {
    match &error {
        ScaffoldError::Parse { .. } => ErrorContext::new(error)
            .with_suggestion("Check the template for unclosed {{ }}, {% %} or {# #} delimiters and unbalanced block/if/for tags"),

        ScaffoldError::AmbiguousExtends { .. } => ErrorContext::new(error)
            .with_suggestion("Use a quoted template name, e.g. {% extends \"base.j2\" %}")
            .with_details("Inheritance can only be analyzed when the parent name is a string literal"),

        ScaffoldError::TemplateNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'scaffold list' to see the available templates, or pass --templates-dir"),

        ScaffoldError::MissingAncestor { requested_by, .. } => {
            let suggestion = format!(
                "Create the missing template or fix the extends tag in '{requested_by}'"
            );
            ErrorContext::new(error).with_suggestion(suggestion)
        }

        ScaffoldError::CyclicInheritance { .. } => ErrorContext::new(error)
            .with_suggestion("Remove the extends tag that points back into the chain")
            .with_details("A template cannot inherit from itself, directly or through its ancestors"),

        ScaffoldError::ExcessiveDepth { .. } => ErrorContext::new(error)
            .with_suggestion("Flatten the hierarchy or raise [resolution] max_depth in scaffold.toml"),

        ScaffoldError::SuperWithoutAncestor { .. } => ErrorContext::new(error)
            .with_suggestion("Remove the super() call or define the block in a parent template")
            .with_details("super() renders the parent's version of the block, which does not exist here"),

        ScaffoldError::MalformedMetadata { .. } => ErrorContext::new(error)
            .with_suggestion("Metadata needs a semantic version (e.g. 1.2.0) and an enforcement level of NONE, ADVISORY, STRICT or ARCHITECTURAL"),

        ScaffoldError::SourceUnavailable { .. } => ErrorContext::new(error)
            .with_suggestion("Check file permissions in the templates directory"),

        ScaffoldError::ResolutionCancelled { .. } | ScaffoldError::ConfigError { .. } => {
            ErrorContext::new(error)
        }
    }
}
