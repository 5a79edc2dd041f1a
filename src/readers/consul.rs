use super::{Connector, Handle, Reader, Retrieved, handle_mismatch};
use crate::config::ConsulConfig;
use crate::source::Source;
use crate::stores::{ConsulClient, KvStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Reads keys from a networked key-value store (`consul`, `consul+http`,
/// `consul+https`).
///
/// The key is the URL path, with `/<arg>` appended when one extra argument is
/// given.
pub struct ConsulReader {
    connect: Connector<Box<dyn KvStore>>,
}

impl ConsulReader {
    /// A reader that opens [`ConsulClient`] sessions.
    #[must_use]
    pub fn new(config: ConsulConfig, timeout: Duration) -> Self {
        Self::with_connector(move |url| Ok(Box::new(ConsulClient::new(url, &config, timeout)?)))
    }

    /// A reader that opens sessions with `connect`.
    #[must_use]
    pub fn with_connector(connect: impl Fn(&Url) -> Result<Box<dyn KvStore>> + Send + Sync + 'static) -> Self {
        Self {
            connect: Arc::new(connect),
        }
    }
}

impl Reader for ConsulReader {
    fn read(&self, source: &Source, handle: &mut Handle, args: &[String]) -> Result<Retrieved> {
        if !handle.is_connected() {
            let mut store = (self.connect)(source.url())
                .with_context(|| format!("Failed to connect to key-value store for '{}'", source.alias()))?;
            store.login().with_context(|| format!("Failed to log in to key-value store for '{}'", source.alias()))?;
            *handle = Handle::Kv(store);
        }
        let Handle::Kv(store) = handle else {
            return Err(handle_mismatch("kv store", handle));
        };

        let key = match args {
            [arg] => format!("{}/{arg}", source.path()),
            _ => source.path().into_owned(),
        };
        tracing::debug!("Reading key {key}");
        Ok(Retrieved::new(store.read(&key)?))
    }
}
