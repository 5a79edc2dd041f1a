//! The Data Manager: named datasources, retrieval, caching and decoding.
//!
//! # Retrieval flow
//!
//! 1. Look up the descriptor for the alias ([`DataError::Undefined`] if none)
//! 2. Return the cached payload for `alias + args` if there is one
//! 3. Otherwise lock the descriptor's handle and check the cache again
//! 4. Find the reader for the URL scheme ([`DataError::UnsupportedScheme`] if none)
//! 5. Read, cache the bytes with their effective media type, return
//!
//! Holding the per-descriptor lock across steps 3–5 means each key is read by
//! exactly one reader invocation, and connections are created at most once
//! per descriptor even when templates render on several threads.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tera_datasources::config::EngineConfig;
//! use tera_datasources::data::DataManager;
//! use tera_datasources::readers::ReaderRegistry;
//!
//! # fn example() -> anyhow::Result<()> {
//! let readers = Arc::new(ReaderRegistry::builtin(&EngineConfig::default()));
//! let data = DataManager::new(&["cfg=testdata/config.json"], &[] as &[&str], readers)?;
//!
//! let value = data.get("cfg", &[])?;
//! println!("{}", value["name"]);
//!
//! data.cleanup();
//! # Ok(())
//! # }
//! ```

mod cache;
pub mod decode;

pub use cache::{CacheStats, Payload};
pub use decode::decode;

use crate::config::EngineConfig;
use crate::core::DataError;
use crate::readers::ReaderRegistry;
use crate::source::{Source, parse_header_args, parse_source};
use anyhow::{Context, Result};
use cache::RetrievalCache;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use strsim::levenshtein;

/// Maximum edit distance for "did you mean" suggestions, as a percentage of
/// the requested alias length.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Owns every declared datasource and mediates all access to them.
///
/// `DataManager` is `Send + Sync`; share it behind an [`Arc`].
#[derive(Debug)]
pub struct DataManager {
    sources: HashMap<String, Source>,
    readers: Arc<ReaderRegistry>,
    cache: RetrievalCache,
    cleaned_up: AtomicBool,
}

/// Outcome of [`DataManager::cleanup`].
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Aliases whose connection was closed
    pub closed: Vec<String>,
    /// Aliases whose logout failed, with the error
    pub failures: Vec<(String, anyhow::Error)>,
}

impl CleanupReport {
    /// True if every logout succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl DataManager {
    /// Build a manager from datasource and header declarations.
    ///
    /// Datasources are `alias=URI` or bare file names; headers are
    /// `alias=Name: value`. Headers for aliases that are not declared are
    /// ignored with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Parse`] for a malformed declaration or a repeated
    /// alias.
    pub fn new<D, H>(datasource_args: &[D], header_args: &[H], readers: Arc<ReaderRegistry>) -> Result<Self>
    where
        D: AsRef<str>,
        H: AsRef<str>,
    {
        let mut headers = parse_header_args(header_args).context("error parsing datasource headers")?;

        let mut sources = HashMap::with_capacity(datasource_args.len());
        for arg in datasource_args {
            let arg = arg.as_ref();
            let source = parse_source(arg).with_context(|| format!("error parsing datasource '{arg}'"))?;
            let alias = source.alias().to_string();
            if sources.contains_key(&alias) {
                return Err(DataError::parse(arg, format!("datasource alias '{alias}' is already defined")).into());
            }
            let source = match headers.remove(&alias) {
                Some(map) => source.with_headers(map),
                None => source,
            };
            tracing::debug!("Declared datasource {source}");
            sources.insert(alias, source);
        }

        for alias in headers.keys() {
            tracing::warn!("Ignoring headers for undeclared datasource '{alias}'");
        }

        Ok(Self {
            sources,
            readers,
            cache: RetrievalCache::new(),
            cleaned_up: AtomicBool::new(false),
        })
    }

    /// Build a manager with the built-in readers, combining the declarations
    /// in `config` with those given on the command line.
    ///
    /// A command-line datasource replaces a configured one with the same
    /// alias; headers from both places are combined.
    ///
    /// # Errors
    ///
    /// As for [`DataManager::new`].
    pub fn from_config<D, H>(config: &EngineConfig, datasource_args: &[D], header_args: &[H]) -> Result<Self>
    where
        D: AsRef<str>,
        H: AsRef<str>,
    {
        let overridden: Vec<String> = datasource_args
            .iter()
            .filter_map(|arg| parse_source(arg.as_ref()).ok().map(|s| s.alias().to_string()))
            .collect();

        let mut declarations: Vec<String> = config
            .datasources
            .iter()
            .filter(|(alias, _)| !overridden.contains(*alias))
            .map(|(alias, uri)| format!("{alias}={uri}"))
            .collect();
        declarations.extend(datasource_args.iter().map(|arg| arg.as_ref().to_string()));

        let mut headers = config.header_args();
        headers.extend(header_args.iter().map(|arg| arg.as_ref().to_string()));

        Self::new(&declarations, &headers, Arc::new(ReaderRegistry::builtin(config)))
    }

    /// True if `alias` was declared.
    pub fn exists(&self, alias: &str) -> bool {
        self.sources.contains_key(alias)
    }

    /// The descriptor for `alias`.
    pub fn source(&self, alias: &str) -> Option<&Source> {
        self.sources.get(alias)
    }

    /// Every declared alias, sorted.
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    /// Retrieval cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Retrieve and decode a datasource.
    ///
    /// # Errors
    ///
    /// Any retrieval error from [`retrieve`](Self::retrieve), plus
    /// [`DataError::UnsupportedContentType`] or [`DataError::Decode`].
    pub fn get(&self, alias: &str, args: &[String]) -> Result<serde_json::Value> {
        let payload = self.retrieve(alias, args)?;
        let value = decode(&payload).with_context(|| format!("Couldn't read datasource '{alias}'"))?;
        Ok(value)
    }

    /// True if the datasource can be retrieved with these arguments. Never fails.
    pub fn is_reachable(&self, alias: &str, args: &[String]) -> bool {
        match self.retrieve(alias, args) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Datasource '{alias}' is not reachable: {e:#}");
                false
            }
        }
    }

    /// The undecoded payload as text.
    ///
    /// # Errors
    ///
    /// Any retrieval error from [`retrieve`](Self::retrieve).
    pub fn include_raw(&self, alias: &str, args: &[String]) -> Result<String> {
        Ok(self.retrieve(alias, args)?.text().into_owned())
    }

    /// Fetch the payload for `alias` with `args`, from the cache if possible.
    ///
    /// # Errors
    ///
    /// - [`DataError::Undefined`] if the alias was never declared
    /// - [`DataError::UnsupportedScheme`] if no reader handles the scheme
    /// - whatever the reader fails with, wrapped with the alias
    pub fn retrieve(&self, alias: &str, args: &[String]) -> Result<Arc<Payload>> {
        let source = self.lookup(alias)?;
        let key = RetrievalCache::key(alias, args);

        if let Some(payload) = self.cache.get(&key) {
            tracing::debug!("Cache hit for datasource '{alias}'");
            return Ok(payload);
        }

        let mut handle = source.lock_handle();
        if let Some(payload) = self.cache.peek(&key) {
            return Ok(payload);
        }
        // cleanup sets the flag before taking any handle lock
        if self.cleaned_up.load(Ordering::SeqCst) {
            return Err(DataError::Closed {
                alias: alias.to_string(),
            }
            .into());
        }

        let reader = self.readers.get(source.scheme()).ok_or_else(|| DataError::UnsupportedScheme {
            scheme: source.scheme().to_string(),
        })?;

        tracing::debug!("Reading datasource '{alias}' from {}", source.url());
        let retrieved = reader
            .read(source, &mut handle, args)
            .with_context(|| format!("Couldn't read datasource '{alias}'"))?;

        let payload = Arc::new(Payload {
            bytes: retrieved.bytes,
            media_type: retrieved.media_type.unwrap_or_else(|| source.media_type().clone()),
        });
        Ok(self.cache.insert(key, payload))
    }

    /// Close every open connection, logging out of stateful sessions.
    ///
    /// Runs once; later calls return an empty report. Failures are logged and
    /// reported, never returned as errors. Afterwards only cached results can
    /// be retrieved; anything else fails with [`DataError::Closed`].
    pub fn cleanup(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        if self.cleaned_up.swap(true, Ordering::SeqCst) {
            return report;
        }

        let mut aliases: Vec<&String> = self.sources.keys().collect();
        aliases.sort_unstable();

        for alias in aliases {
            let mut handle = self.sources[alias].lock_handle();
            if !handle.is_connected() {
                continue;
            }
            let kind = handle.kind();
            match handle.close() {
                Ok(()) => {
                    tracing::debug!("Closed {kind} connection for datasource '{alias}'");
                    report.closed.push(alias.clone());
                }
                Err(e) => {
                    tracing::warn!("Failed to close {kind} connection for datasource '{alias}': {e:#}");
                    report.failures.push((alias.clone(), e));
                }
            }
        }
        report
    }

    fn lookup(&self, alias: &str) -> Result<&Source, DataError> {
        self.sources.get(alias).ok_or_else(|| DataError::Undefined {
            alias: alias.to_string(),
            suggestion: self.closest_alias(alias),
        })
    }

    fn closest_alias(&self, target: &str) -> Option<String> {
        self.sources
            .keys()
            .map(|alias| (alias, levenshtein(target, alias)))
            .filter(|(_, dist)| *dist <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(alias, _)| alias.clone())
    }
}
