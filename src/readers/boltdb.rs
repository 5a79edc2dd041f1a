use super::{Connector, Handle, Reader, Retrieved, handle_mismatch};
use crate::core::DataError;
use crate::source::Source;
use crate::stores::{KvStore, SledStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use url::Url;

/// Reads keys from an embedded key-value store (`boltdb:///path#Bucket`).
///
/// Exactly one extra argument, the key, is required.
pub struct BoltDbReader {
    open: Connector<Box<dyn KvStore>>,
}

impl BoltDbReader {
    /// A reader that opens [`SledStore`]s.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connector(|url| Ok(Box::new(SledStore::open(url)?)))
    }

    /// A reader that opens stores with `open`.
    #[must_use]
    pub fn with_connector(open: impl Fn(&Url) -> Result<Box<dyn KvStore>> + Send + Sync + 'static) -> Self {
        Self {
            open: Arc::new(open),
        }
    }
}

impl Default for BoltDbReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader for BoltDbReader {
    fn read(&self, source: &Source, handle: &mut Handle, args: &[String]) -> Result<Retrieved> {
        let [key] = args else {
            return Err(DataError::ContractViolation {
                reason: "missing key".to_string(),
            }
            .into());
        };

        if !handle.is_connected() {
            let store = (self.open)(source.url())
                .with_context(|| format!("Failed to open embedded store for '{}'", source.alias()))?;
            *handle = Handle::Kv(store);
        }
        let Handle::Kv(store) = handle else {
            return Err(handle_mismatch("kv store", handle));
        };

        tracing::debug!("Reading key {key} from {}", source.url());
        Ok(Retrieved::new(store.read(key)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_source;
    use crate::test_utils::{MockKvStore, StoreCall};

    fn reader(store: &MockKvStore) -> BoltDbReader {
        let store = store.clone();
        BoltDbReader::with_connector(move |_| Ok(Box::new(store.clone())))
    }

    #[test]
    fn test_requires_exactly_one_arg() {
        let store = MockKvStore::new();
        let source = parse_source("db=boltdb:///tmp/x.db#Bucket1").unwrap();
        let reader = reader(&store);
        let mut handle = Handle::Unconnected;

        for args in [vec![], vec!["a".to_string(), "b".to_string()]] {
            let err = reader.read(&source, &mut handle, &args).unwrap_err();
            assert!(matches!(crate::core::data_error(&err), Some(DataError::ContractViolation { .. })));
            assert!(err.to_string().contains("missing key"));
        }
        // the store is never opened for a bad call
        assert!(!handle.is_connected());
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_reads_key_without_login() {
        let store = MockKvStore::new().with_value("foo", "bar");
        let source = parse_source("db=boltdb:///tmp/x.db#Bucket1").unwrap();

        let out = reader(&store).read(&source, &mut Handle::Unconnected, &["foo".to_string()]).unwrap();
        assert_eq!(out.bytes, b"bar");
        assert_eq!(store.calls(), vec![StoreCall::Read("foo".to_string())]);
    }
}
