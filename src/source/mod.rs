//! Datasource descriptors.
//!
//! A datasource is declared as `alias=URI`, or as a bare filename in the
//! working directory whose alias is the name up to its first `.`:
//!
//! ```text
//! cfg=testdata/config.json        relative path, resolved against the cwd
//! web=https://example.com/x.csv   absolute URI
//! in=-                            standard input
//! config.json                     alias "config"
//! ```
//!
//! # Components
//!
//! - [`Source`] - one parsed declaration plus its lazily-created connection handle
//! - [`MediaType`] - the content type used to decode payloads
//! - [`parse_source`] / [`parse_header_args`] - declaration parsers

mod headers;
pub mod media;

pub use headers::parse_header_args;
pub use media::MediaType;

use crate::core::DataError;
use crate::readers::Handle;
use percent_encoding::percent_decode_str;
use reqwest::header::HeaderMap;
use std::borrow::Cow;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

/// A parsed datasource declaration.
///
/// The alias, URL and declared media type never change after construction.
/// The connection handle starts out [`Handle::Unconnected`]; the first
/// retrieval that needs one creates it while holding the handle lock, and
/// [`DataManager::cleanup`](crate::data::DataManager::cleanup) releases it.
#[derive(Debug)]
pub struct Source {
    alias: String,
    url: Url,
    ext: String,
    media_type: MediaType,
    headers: HeaderMap,
    handle: Mutex<Handle>,
}

impl Source {
    /// Build a descriptor for an already-absolute URL.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Parse`] if the `type` query parameter is not a
    /// valid media type.
    pub fn new(alias: impl Into<String>, url: Url) -> Result<Self, DataError> {
        let ext = extension(url.path()).to_string();

        let media_type = match url.query_pairs().find(|(k, _)| k == "type") {
            Some((_, declared)) if !declared.is_empty() => MediaType::parse(&declared)?,
            _ => MediaType::from_extension(&ext).unwrap_or_else(MediaType::plain_text),
        };

        Ok(Self {
            alias: alias.into(),
            url,
            ext,
            media_type,
            headers: HeaderMap::new(),
            handle: Mutex::new(Handle::Unconnected),
        })
    }

    /// Attach the HTTP headers declared for this alias.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// The caller-assigned name.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// The absolute URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL path, percent-decoded. Store keys and secret paths come from here.
    pub fn path(&self) -> Cow<'_, str> {
        percent_decode_str(self.url.path()).decode_utf8_lossy()
    }

    /// The URL scheme (always lowercase), used to pick a reader.
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Extension of the URL path without the dot (may be empty).
    pub fn ext(&self) -> &str {
        &self.ext
    }

    /// The declared media type.
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// Headers sent with HTTP requests for this alias.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Lock the connection handle. A poisoned lock is recovered.
    pub(crate) fn lock_handle(&self) -> MutexGuard<'_, Handle> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.alias, self.url, self.media_type.essence())
    }
}

/// Parse one datasource declaration.
///
/// # Errors
///
/// Returns [`DataError::Parse`] when a bare name contains a path separator,
/// the alias is empty, the URI is malformed, or the `type` parameter is not a
/// valid media type. Returns [`DataError::Io`] if the working directory
/// cannot be determined for a relative path.
///
/// # Examples
///
/// ```rust,no_run
/// use tera_datasources::source::parse_source;
///
/// let src = parse_source("data=https://example.com/data.csv").unwrap();
/// assert_eq!(src.alias(), "data");
/// assert_eq!(src.media_type().essence(), "text/csv");
/// ```
pub fn parse_source(value: &str) -> Result<Source, DataError> {
    let (alias, url) = match value.split_once('=') {
        None => {
            if value.is_empty() || value.contains('/') || value.contains('\\') {
                return Err(DataError::parse(
                    value,
                    "must provide an alias for files outside the working directory",
                ));
            }
            let alias = value.split('.').next().unwrap_or(value);
            (alias, abs_url(value)?)
        }
        Some((alias, target)) => {
            if alias.is_empty() {
                return Err(DataError::parse(value, "alias must not be empty"));
            }
            let target = if target == "-" {
                "stdin://"
            } else {
                target
            };
            let url = match Url::parse(target) {
                Ok(url) => url,
                Err(url::ParseError::RelativeUrlWithoutBase) => abs_url(target)?,
                Err(e) => return Err(DataError::parse(value, format!("invalid URI: {e}"))),
            };
            (alias, url)
        }
    };

    if alias.is_empty() {
        return Err(DataError::parse(value, "alias must not be empty"));
    }

    tracing::debug!("Parsed datasource {alias}={url}");
    Source::new(alias, url)
}

/// Resolve a relative path against the working directory as a `file://` URL.
fn abs_url(value: &str) -> Result<Url, DataError> {
    let cwd = std::env::current_dir()?;
    let base = Url::from_directory_path(&cwd).map_err(|()| {
        DataError::parse(value, format!("working directory {} is not absolute", cwd.display()))
    })?;
    base.join(value).map_err(|e| DataError::parse(value, format!("invalid path: {e}")))
}

fn extension(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(i) => &name[i + 1..],
        None => "",
    }
}
