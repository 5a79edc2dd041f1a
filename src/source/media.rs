//! Media type handling for datasources.
//!
//! A [`MediaType`] is chosen once per descriptor: the explicit `type` query
//! parameter wins, then the path's extension, then `text/plain`. Strategies
//! may report an authoritative type for a single payload (e.g. an HTTP
//! `Content-Type` header), which is carried on the cached payload instead.

use crate::core::DataError;
use mime::Mime;
use std::fmt;
use std::str::FromStr;

/// `application/json`
pub const JSON: &str = "application/json";
/// `application/yaml`
pub const YAML: &str = "application/yaml";
/// `text/csv`
pub const CSV: &str = "text/csv";
/// `application/toml`
pub const TOML: &str = "application/toml";
/// `text/plain`
pub const PLAIN_TEXT: &str = "text/plain";

/// Extensions we always want to recognize, checked ahead of the system table.
const EXTENSION_OVERRIDES: &[(&str, &str)] = &[
    ("json", JSON),
    ("yml", YAML),
    ("yaml", YAML),
    ("csv", CSV),
    ("toml", TOML),
];

/// A parsed MIME type with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    mime: Mime,
}

impl MediaType {
    /// Parse a media type such as `text/csv; charset=utf-8`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Parse`] if the string is not a valid MIME type.
    pub fn parse(value: &str) -> Result<Self, DataError> {
        let mime = value
            .trim()
            .parse::<Mime>()
            .map_err(|e| DataError::parse(value, format!("invalid media type: {e}")))?;
        Ok(Self {
            mime,
        })
    }

    /// `text/plain`, the fallback when nothing else identifies the payload.
    #[must_use]
    pub fn plain_text() -> Self {
        Self {
            mime: mime::TEXT_PLAIN,
        }
    }

    /// Look up the media type for a file extension (without the leading dot).
    ///
    /// Returns `None` for unknown or empty extensions.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.is_empty() {
            return None;
        }
        let ext = ext.to_ascii_lowercase();

        if let Some((_, essence)) = EXTENSION_OVERRIDES.iter().find(|(e, _)| *e == ext) {
            return essence.parse::<Mime>().ok().map(|mime| Self {
                mime,
            });
        }

        mime_guess::from_ext(&ext).first().map(|mime| Self {
            mime,
        })
    }

    /// The type without parameters, e.g. `application/json`.
    #[must_use]
    pub fn essence(&self) -> &str {
        self.mime.essence_str()
    }

    /// Look up a parameter such as `charset`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.mime.get_param(name).map(|v| v.as_str())
    }

    /// True if this type has the given essence (case-insensitive).
    #[must_use]
    pub fn is(&self, essence: &str) -> bool {
        self.essence().eq_ignore_ascii_case(essence)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime)
    }
}

impl FromStr for MediaType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
