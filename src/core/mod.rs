//! Core types for tera-datasources
//!
//! Holds the error model shared by every other module:
//! - [`DataError`] - the typed failure kinds (parse, unsupported scheme or
//!   content type, not found, transport, contract violation, ...)
//! - [`ErrorContext`] - user-facing wrapper with details and a suggestion
//! - [`user_friendly_error`] - converts any `anyhow::Error` for display
//! - [`data_error`] - recovers the [`DataError`] from a context chain
//!
//! # Examples
//!
//! ```rust
//! use tera_datasources::core::{DataError, ErrorContext};
//!
//! let ctx = ErrorContext::new(DataError::ContractViolation {
//!     reason: "missing key".to_string(),
//! })
//! .with_suggestion("Pass the key as the second argument");
//!
//! assert!(ctx.to_string().contains("missing key"));
//! ```

pub mod error;

pub use error::{DataError, ErrorContext, data_error, user_friendly_error};
