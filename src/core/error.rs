//! Error handling for tera-datasources
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`DataError`]) so callers can tell a missing
//!    key from an unreachable server
//! 2. **User-friendly messages** ([`ErrorContext`]) with suggestions for CLI users
//!
//! Public operations return [`anyhow::Result`] and wrap the typed error with
//! context naming the alias and operation. Use [`data_error`] to recover the
//! [`DataError`] from anywhere in a context chain.
//!
//! # Examples
//!
//! ```rust,no_run
//! use tera_datasources::core::{DataError, data_error, user_friendly_error};
//!
//! fn report(err: anyhow::Error) {
//!     if let Some(DataError::NotFound { .. }) = data_error(&err) {
//!         eprintln!("nothing there");
//!     }
//!     user_friendly_error(err).display();
//! }
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The error kinds produced while declaring, retrieving and decoding datasources.
///
/// No variant is ever retried internally; every failure reaches the caller.
#[derive(Error, Debug)]
pub enum DataError {
    /// A datasource or header declaration, URI or MIME type could not be parsed
    #[error("Invalid datasource declaration '{input}': {reason}")]
    Parse {
        /// The raw declaration that failed
        input: String,
        /// Why it failed
        reason: String,
    },

    /// The alias was never declared
    #[error(
        "Undefined datasource '{alias}'{}",
        .suggestion.as_deref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default()
    )]
    Undefined {
        /// The requested alias
        alias: String,
        /// Closest declared alias, if any is similar enough
        suggestion: Option<String>,
    },

    /// No retrieval strategy is registered for the URI scheme
    #[error("Datasources with scheme {scheme} not yet supported")]
    UnsupportedScheme {
        /// The unsupported scheme
        scheme: String,
    },

    /// The payload's content type has no decoder
    #[error("Datasources of type {media_type} not yet supported")]
    UnsupportedContentType {
        /// Essence of the unsupported media type
        media_type: String,
    },

    /// Missing file, missing key or empty secret-store result
    #[error("{message}")]
    NotFound {
        /// What was looked for and where
        message: String,
    },

    /// Network failure, non-200 HTTP status or authentication failure
    #[error("{operation} failed: {reason}")]
    Transport {
        /// The operation that failed (e.g. "GET https://...", "vault login")
        operation: String,
        /// Response body or underlying error
        reason: String,
        /// HTTP status code, when the server answered
        status: Option<u16>,
    },

    /// A strategy received the wrong number of extra arguments
    #[error("Invalid datasource arguments: {reason}")]
    ContractViolation {
        /// Description of the violated contract
        reason: String,
    },

    /// The payload did not parse as its declared content type
    #[error("Failed to decode {media_type} datasource: {reason}")]
    Decode {
        /// Media type the payload was decoded as
        media_type: String,
        /// Parser error
        reason: String,
    },

    /// A backend read was attempted after connections were cleaned up
    #[error("Datasource '{alias}' cannot be read after its connections were closed")]
    Closed {
        /// The requested alias
        alias: String,
    },

    /// Configuration file or value is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Build a [`DataError::Parse`] for a raw declaration.
    pub fn parse(input: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Parse {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`DataError::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Build a [`DataError::Transport`] without an HTTP status.
    pub fn transport(operation: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Transport {
            operation: operation.into(),
            reason: reason.to_string(),
            status: None,
        }
    }
}

impl Clone for DataError {
    fn clone(&self) -> Self {
        match self {
            Self::Parse {
                input,
                reason,
            } => Self::Parse {
                input: input.clone(),
                reason: reason.clone(),
            },
            Self::Undefined {
                alias,
                suggestion,
            } => Self::Undefined {
                alias: alias.clone(),
                suggestion: suggestion.clone(),
            },
            Self::UnsupportedScheme {
                scheme,
            } => Self::UnsupportedScheme {
                scheme: scheme.clone(),
            },
            Self::UnsupportedContentType {
                media_type,
            } => Self::UnsupportedContentType {
                media_type: media_type.clone(),
            },
            Self::NotFound {
                message,
            } => Self::NotFound {
                message: message.clone(),
            },
            Self::Transport {
                operation,
                reason,
                status,
            } => Self::Transport {
                operation: operation.clone(),
                reason: reason.clone(),
                status: *status,
            },
            Self::ContractViolation {
                reason,
            } => Self::ContractViolation {
                reason: reason.clone(),
            },
            Self::Decode {
                media_type,
                reason,
            } => Self::Decode {
                media_type: media_type.clone(),
                reason: reason.clone(),
            },
            Self::Closed {
                alias,
            } => Self::Closed {
                alias: alias.clone(),
            },
            Self::Config {
                message,
            } => Self::Config {
                message: message.clone(),
            },
            // io::Error is not Clone; keep kind and message
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
        }
    }
}

/// Find the first [`DataError`] in an error's context chain.
///
/// Every public operation wraps its typed error with alias/operation context,
/// so a plain `downcast_ref` on the outer error is not enough.
#[must_use]
pub fn data_error(error: &anyhow::Error) -> Option<&DataError> {
    error.chain().find_map(|cause| cause.downcast_ref::<DataError>())
}

/// Error context wrapper that provides user-friendly error information
///
/// Wraps a [`DataError`] with optional details and an actionable suggestion.
/// This is how the `tds` binary presents failures.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: DataError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: DataError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
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

/// Convert any error into an [`ErrorContext`] with suggestions.
///
/// The outermost message (which names the alias and operation) is kept as
/// details so nothing from the context chain is lost.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let chain: Vec<String> = error.chain().map(ToString::to_string).collect();

    if let Some(data_err) = data_error(&error) {
        let mut ctx = create_error_context(data_err.clone());
        let outer = &chain[0];
        if *outer != data_err.to_string() {
            ctx.details = Some(match ctx.details.take() {
                Some(existing) => format!("{outer}\n{existing}"),
                None => outer.clone(),
            });
        }
        return ctx;
    }

    if let Some(tera_err) = error.downcast_ref::<tera::Error>() {
        return ErrorContext::new(DataError::Parse {
            input: "template".to_string(),
            reason: tera_chain(tera_err),
        })
        .with_suggestion(
            "Check template syntax: variables use {{ var }}, control flow uses {% %}, \
             datasources are read with {{ datasource(alias=\"name\") }}",
        );
    }

    let mut message = chain[0].clone();
    if chain.len() > 1 {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().skip(1).enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(DataError::Config {
        message,
    })
}

fn tera_chain(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(&format!(": {cause}"));
        source = cause.source();
    }
    message
}

fn create_error_context(error: DataError) -> ErrorContext {
    match &error {
        DataError::Parse {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Declare datasources as 'alias=URI' (e.g. 'cfg=config.json' or \
             'web=https://example.com/data.json'); bare file names only work in the working directory",
        ),
        DataError::Undefined {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Declare the datasource with --datasource alias=URI or in the [datasources] config table"),
        DataError::UnsupportedScheme {
            ..
        } => ErrorContext::new(error).with_details(
            "Supported schemes: file, stdin, http, https, vault, vault+http, vault+https, \
             consul, consul+http, consul+https, boltdb, aws+smp",
        ),
        DataError::UnsupportedContentType {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Set the type explicitly with a '?type=' query parameter, e.g. '?type=application/json', \
             or read the raw text with include()",
        ),
        DataError::NotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check that the file, key or secret path exists and is readable"),
        DataError::Transport {
            status: Some(401 | 403),
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the credentials (VAULT_TOKEN, CONSUL_HTTP_TOKEN, AWS_* or datasource headers)"),
        DataError::Transport {
            ..
        } => ErrorContext::new(error).with_suggestion("Check network connectivity and the server address"),
        DataError::ContractViolation {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Pass exactly one extra argument, e.g. datasource(alias=\"db\", arg=\"key\")"),
        DataError::Decode {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the payload syntax, or override the type with '?type=text/plain'"),
        DataError::Closed {
            ..
        } => ErrorContext::new(error)
            .with_details("Only results read before cleanup are still available"),
        DataError::Config {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the TOML syntax and values in the configuration file"),
        DataError::Io(_) => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_data_error_found_through_context() {
        let err = Err::<(), _>(DataError::not_found("no value found for path secret/foo"))
            .context("Couldn't read datasource 'db'")
            .context("while rendering")
            .unwrap_err();

        assert!(matches!(data_error(&err), Some(DataError::NotFound { .. })));
    }

    #[test]
    fn test_data_error_absent_for_foreign_errors() {
        let err = anyhow::anyhow!("something else");
        assert!(data_error(&err).is_none());
    }

    #[test]
    fn test_undefined_display_with_suggestion() {
        let err = DataError::Undefined {
            alias: "cfgg".to_string(),
            suggestion: Some("cfg".to_string()),
        };
        assert_eq!(err.to_string(), "Undefined datasource 'cfgg' (did you mean 'cfg'?)");

        let err = DataError::Undefined {
            alias: "zzz".to_string(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "Undefined datasource 'zzz'");
    }

    #[test]
    fn test_clone_io_error_keeps_kind() {
        let err = DataError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        match err.clone() {
            DataError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_user_friendly_error_keeps_outer_context() {
        let err = Err::<(), _>(DataError::UnsupportedScheme {
            scheme: "ftp".to_string(),
        })
        .context("Couldn't read datasource 'remote'")
        .unwrap_err();

        let ctx = user_friendly_error(err);
        assert!(matches!(ctx.error, DataError::UnsupportedScheme { .. }));
        let details = ctx.details.unwrap();
        assert!(details.contains("Couldn't read datasource 'remote'"));
        assert!(details.contains("Supported schemes"));
    }

    #[test]
    fn test_user_friendly_error_auth_suggestion() {
        let err = anyhow::Error::new(DataError::Transport {
            operation: "vault login".to_string(),
            reason: "permission denied".to_string(),
            status: Some(403),
        });
        let ctx = user_friendly_error(err);
        assert!(ctx.suggestion.unwrap().contains("credentials"));
    }

    #[test]
    fn test_user_friendly_error_generic_chain() {
        let err = anyhow::anyhow!("root").context("outer");
        let ctx = user_friendly_error(err);
        let text = ctx.to_string();
        assert!(text.contains("outer"));
        assert!(text.contains("Caused by:"));
        assert!(text.contains("root"));
    }
}
