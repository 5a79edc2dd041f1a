//! Consul KV client over the HTTP API.

use super::{KvStore, api_url, check_status, store_address};
use crate::config::ConsulConfig;
use crate::core::DataError;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::time::Duration;
use url::Url;

/// A Consul session for one datasource.
pub struct ConsulClient {
    http: Client,
    addr: Url,
    token: Option<String>,
}

impl ConsulClient {
    /// Create a client for a `consul`, `consul+http` or `consul+https` URL.
    ///
    /// Without a host in the URL the configured address is used, falling back
    /// to the local agent at `localhost:8500`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the HTTP client cannot be built.
    pub fn new(url: &Url, config: &ConsulConfig, timeout: Duration) -> Result<Self> {
        let configured = config.addr.as_deref().unwrap_or("localhost:8500");
        let addr = store_address(url, "http", Some(configured))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Consul HTTP client")?;

        Ok(Self {
            http,
            addr,
            token: config.token.clone(),
        })
    }

    /// The resolved agent address.
    pub fn address(&self) -> &Url {
        &self.addr
    }
}

impl KvStore for ConsulClient {
    fn read(&mut self, key: &str) -> Result<Vec<u8>> {
        let key = key.trim_start_matches('/');
        let operation = format!("consul get {key}");
        let mut url = api_url(&self.addr, "v1/kv", key).with_context(|| format!("Invalid Consul key '{key}'"))?;
        url.set_query(Some("raw"));

        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.header("X-Consul-Token", token);
        }

        let response = request.send().map_err(|e| DataError::transport(operation.clone(), e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DataError::not_found(format!("Key not found: {key}")).into());
        }
        let response = check_status(response, &operation)?;
        let bytes = response.bytes().with_context(|| format!("Failed to read response of {operation}"))?;
        Ok(bytes.to_vec())
    }
}
