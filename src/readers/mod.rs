//! Retrieval strategies and the scheme registry.
//!
//! A [`Reader`] fetches the raw bytes for one descriptor. Readers are
//! stateless; any connection they need lives in the descriptor's [`Handle`],
//! which the caller locks for the duration of the call. The first call
//! creates the handle, later calls reuse it, and
//! [`DataManager::cleanup`](crate::data::DataManager::cleanup) closes it.
//!
//! The [`ReaderRegistry`] maps lowercase URL schemes to readers:
//!
//! | Scheme                                  | Reader           |
//! |-----------------------------------------|------------------|
//! | `file`                                  | [`FileReader`]   |
//! | `stdin`                                 | [`StdinReader`]  |
//! | `http`, `https`                         | [`HttpReader`]   |
//! | `vault`, `vault+http`, `vault+https`    | [`VaultReader`]  |
//! | `consul`, `consul+http`, `consul+https` | [`ConsulReader`] |
//! | `boltdb`                                | [`BoltDbReader`] |
//! | `aws+smp`                               | [`AwsSmpReader`] |

mod aws_smp;
mod boltdb;
mod consul;
mod file;
mod http;
mod stdin;
mod vault;

pub use aws_smp::AwsSmpReader;
pub use boltdb::BoltDbReader;
pub use consul::ConsulReader;
pub use file::FileReader;
pub use http::HttpReader;
pub use stdin::StdinReader;
pub use vault::VaultReader;

use crate::config::EngineConfig;
use crate::source::{MediaType, Source};
use crate::stores::{KvStore, ParameterStore, SecretStore};
use anyhow::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// A retrieval strategy for one family of URL schemes.
pub trait Reader: Send + Sync {
    /// Fetch the payload for `source`.
    ///
    /// `handle` is the descriptor's connection state, already locked by the
    /// caller. `args` holds the extra arguments of the call (at most one is
    /// meaningful).
    fn read(&self, source: &Source, handle: &mut Handle, args: &[String]) -> Result<Retrieved>;
}

/// Raw bytes returned by a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieved {
    /// The payload exactly as the backend returned it.
    pub bytes: Vec<u8>,
    /// A media type the backend reported for this payload, overriding the
    /// descriptor's declared type.
    pub media_type: Option<MediaType>,
}

impl Retrieved {
    /// Bytes with no authoritative media type.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            media_type: None,
        }
    }

    /// Attach the media type reported by the backend.
    #[must_use]
    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type);
        self
    }
}

/// Per-descriptor connection state.
#[derive(Default)]
pub enum Handle {
    /// Nothing opened yet (or already closed)
    #[default]
    Unconnected,
    /// Reusable HTTP client
    Http(reqwest::blocking::Client),
    /// Logged-in secret store session
    SecretStore(Box<dyn SecretStore>),
    /// Open key-value store session
    Kv(Box<dyn KvStore>),
    /// Parameter store client
    Parameters(Box<dyn ParameterStore>),
}

impl Handle {
    /// True once a reader has created a connection.
    pub const fn is_connected(&self) -> bool {
        !matches!(self, Self::Unconnected)
    }

    /// Short name of the variant, for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unconnected => "unconnected",
            Self::Http(_) => "http",
            Self::SecretStore(_) => "secret store",
            Self::Kv(_) => "kv store",
            Self::Parameters(_) => "parameter store",
        }
    }

    /// Close the connection, logging out of stateful sessions.
    ///
    /// The handle is left [`Handle::Unconnected`] whether or not logout succeeds.
    ///
    /// # Errors
    ///
    /// Returns the session's logout error.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::take(self) {
            Self::SecretStore(mut store) => store.logout(),
            Self::Kv(mut store) => store.logout(),
            Self::Unconnected | Self::Http(_) | Self::Parameters(_) => Ok(()),
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.kind())
    }
}

/// Error for a handle created by a different reader than the one now using it.
fn handle_mismatch(expected: &str, handle: &Handle) -> anyhow::Error {
    anyhow::anyhow!("Expected a {expected} handle, found {}", handle.kind())
}

/// Creates a store session for a datasource URL.
pub type Connector<T> = Arc<dyn Fn(&Url) -> Result<T> + Send + Sync>;

/// Immutable scheme → reader table.
#[derive(Clone, Default)]
pub struct ReaderRegistry {
    readers: HashMap<String, Arc<dyn Reader>>,
}

impl ReaderRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> ReaderRegistryBuilder {
        ReaderRegistryBuilder::default()
    }

    /// A registry with every built-in reader, configured from `config`.
    #[must_use]
    pub fn builtin(config: &EngineConfig) -> Self {
        Self::builder().with_builtins(config).build()
    }

    /// Look up the reader for a scheme (case-insensitive).
    pub fn get(&self, scheme: &str) -> Option<&Arc<dyn Reader>> {
        self.readers.get(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.readers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

impl fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderRegistry").field("schemes", &self.schemes()).finish()
    }
}

/// Builder for [`ReaderRegistry`]. Later registrations replace earlier ones.
#[derive(Default)]
pub struct ReaderRegistryBuilder {
    readers: HashMap<String, Arc<dyn Reader>>,
}

impl ReaderRegistryBuilder {
    /// Register every built-in reader.
    #[must_use]
    pub fn with_builtins(self, config: &EngineConfig) -> Self {
        let timeout = config.timeout();
        let http: Arc<dyn Reader> = Arc::new(HttpReader::new(timeout));
        let vault: Arc<dyn Reader> = Arc::new(VaultReader::new(config.vault.clone(), timeout));
        let consul: Arc<dyn Reader> = Arc::new(ConsulReader::new(config.consul.clone(), timeout));

        self.register("http", http.clone())
            .register("https", http)
            .register("file", Arc::new(FileReader))
            .register("stdin", Arc::new(StdinReader::new()))
            .register("vault", vault.clone())
            .register("vault+http", vault.clone())
            .register("vault+https", vault)
            .register("consul", consul.clone())
            .register("consul+http", consul.clone())
            .register("consul+https", consul)
            .register("boltdb", Arc::new(BoltDbReader::new()))
            .register("aws+smp", Arc::new(AwsSmpReader::new(config.aws.clone(), timeout)))
    }

    /// Register `reader` for `scheme`.
    #[must_use]
    pub fn register(mut self, scheme: &str, reader: Arc<dyn Reader>) -> Self {
        let scheme = scheme.to_ascii_lowercase();
        if self.readers.insert(scheme.clone(), reader).is_some() {
            tracing::debug!("Replaced reader for scheme {scheme}");
        }
        self
    }

    /// Freeze the table.
    #[must_use]
    pub fn build(self) -> ReaderRegistry {
        ReaderRegistry {
            readers: self.readers,
        }
    }
}
