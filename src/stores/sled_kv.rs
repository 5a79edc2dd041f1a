//! Embedded key-value store for `boltdb://` datasources.
//!
//! `boltdb:///path/to/store.db#Bucket` opens the on-disk store at the URL
//! path and reads keys from the tree named by the fragment.

use super::KvStore;
use crate::core::DataError;
use anyhow::{Context, Result};
use url::Url;

/// An open embedded store, scoped to one bucket.
pub struct SledStore {
    _db: sled::Db,
    tree: sled::Tree,
    bucket: String,
}

impl SledStore {
    /// Open the store named by a `boltdb://` URL.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Parse`] if the URL has no bucket fragment or no
    /// usable path, or an error if the store cannot be opened.
    pub fn open(url: &Url) -> Result<Self> {
        let bucket = match url.fragment() {
            Some(bucket) if !bucket.is_empty() => bucket.to_string(),
            _ => {
                return Err(DataError::parse(
                    url.as_str(),
                    "missing bucket, give it as the URL fragment (boltdb:///path/to/db#Bucket)",
                )
                .into());
            }
        };
        let path = Url::parse(&format!("file://{}", url.path()))
            .ok()
            .and_then(|file_url| file_url.to_file_path().ok())
            .ok_or_else(|| DataError::parse(url.as_str(), "URL does not name a local path"))?;

        tracing::info!("Opening embedded store {} (bucket {bucket})", path.display());
        let db = sled::open(&path).with_context(|| format!("Failed to open store at {}", path.display()))?;
        Self::from_db(db, &bucket)
    }

    /// Use an already-open database.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket's tree cannot be opened.
    pub fn from_db(db: sled::Db, bucket: &str) -> Result<Self> {
        let tree = db.open_tree(bucket).with_context(|| format!("Failed to open bucket '{bucket}'"))?;
        Ok(Self {
            _db: db,
            tree,
            bucket: bucket.to_string(),
        })
    }
}

impl KvStore for SledStore {
    fn read(&mut self, key: &str) -> Result<Vec<u8>> {
        let value = self
            .tree
            .get(key)
            .with_context(|| format!("Failed to read key '{key}' from bucket '{}'", self.bucket))?;

        match value {
            Some(value) => Ok(value.to_vec()),
            None => Err(DataError::not_found(format!("Key '{key}' not found in bucket '{}'", self.bucket)).into()),
        }
    }

    fn logout(&mut self) -> Result<()> {
        self.tree.flush().with_context(|| format!("Failed to flush bucket '{}'", self.bucket))?;
        Ok(())
    }
}
