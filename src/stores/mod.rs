//! Backend capability interfaces and their default clients.
//!
//! Readers only ever talk to these traits, so a store can be swapped for an
//! in-memory fake in tests (see `test_utils`).
//!
//! | Trait              | Default implementation | Used by scheme                     |
//! |--------------------|------------------------|------------------------------------|
//! | [`SecretStore`]    | [`VaultClient`]        | `vault`, `vault+http`, `vault+https` |
//! | [`KvStore`]        | [`ConsulClient`]       | `consul`, `consul+http`, `consul+https` |
//! | [`KvStore`]        | [`SledStore`]          | `boltdb`                           |
//! | [`ParameterStore`] | [`SsmClient`]          | `aws+smp`                          |

mod consul;
mod sled_kv;
mod ssm;
mod vault;

pub use consul::ConsulClient;
pub use sled_kv::SledStore;
pub use ssm::{AwsCredentials, SsmClient};
pub use vault::VaultClient;

use crate::core::DataError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A secret store session (login, read, write, logout).
pub trait SecretStore: Send {
    /// Authenticate. Called once, right after the session is created.
    fn login(&mut self) -> Result<()>;

    /// Read the secret at `path`. An empty result means nothing is stored there.
    fn read(&mut self, path: &str) -> Result<Vec<u8>>;

    /// Write `params` to `path` and return the response data (e.g. generated
    /// credentials). An empty result means the store returned nothing.
    fn write(&mut self, path: &str, params: &BTreeMap<String, String>) -> Result<Vec<u8>>;

    /// Release the session.
    fn logout(&mut self) -> Result<()>;
}

/// A key-value store session.
pub trait KvStore: Send {
    /// Authenticate, if the store needs it.
    fn login(&mut self) -> Result<()> {
        Ok(())
    }

    /// Read the value stored under `key`.
    ///
    /// Missing keys are [`DataError::NotFound`].
    fn read(&mut self, key: &str) -> Result<Vec<u8>>;

    /// Release the session.
    fn logout(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A parameter store client.
pub trait ParameterStore: Send {
    /// Fetch one parameter, decrypted.
    fn get_parameter(&mut self, name: &str) -> Result<Parameter>;
}

/// A parameter record as returned by the parameter store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    /// Fully-qualified parameter name
    pub name: String,
    /// `String`, `StringList` or `SecureString`
    #[serde(rename = "Type")]
    pub kind: String,
    /// The (decrypted) value
    pub value: String,
    /// Parameter version
    #[serde(default)]
    pub version: i64,
    /// Amazon Resource Name
    #[serde(rename = "ARN", default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    /// `text` or `aws:ec2:image`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<f64>,
    /// Version or label selector from the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Raw result when the parameter references another service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_result: Option<String>,
}

/// Turn a non-success response into [`DataError::Transport`] carrying the
/// status and body.
pub(crate) fn check_status(
    response: reqwest::blocking::Response,
    operation: &str,
) -> Result<reqwest::blocking::Response, DataError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(DataError::Transport {
        operation: operation.to_string(),
        reason: format!("HTTP {status}: {}", body.trim()),
        status: Some(status.as_u16()),
    })
}

/// Base address for an HTTP-backed store.
///
/// `<store>+http://host` and `<store>+https://host` select the protocol
/// explicitly; `<store>://host` uses `default_protocol`. Without a host the
/// configured address is used.
pub(crate) fn store_address(
    url: &url::Url,
    default_protocol: &str,
    configured: Option<&str>,
) -> Result<url::Url, DataError> {
    let protocol = match url.scheme().split_once('+') {
        Some((_, protocol)) => protocol,
        None => default_protocol,
    };

    let raw = match url.host_str() {
        Some(host) if !host.is_empty() => match url.port() {
            Some(port) => format!("{protocol}://{host}:{port}"),
            None => format!("{protocol}://{host}"),
        },
        _ => match configured {
            Some(addr) if addr.contains("://") => addr.to_string(),
            Some(addr) => format!("{default_protocol}://{addr}"),
            None => {
                return Err(DataError::Config {
                    message: format!("no server address for {url}: give a host in the URL or configure one"),
                });
            }
        },
    };

    url::Url::parse(&raw).map_err(|e| DataError::parse(raw.clone(), format!("invalid address: {e}")))
}

/// `base` with `prefix` and then `key` appended as path segments.
///
/// Each `/`-separated piece of `key` is percent-encoded, so `?`, `#` and
/// spaces stay part of the key instead of starting a query or fragment.
pub(crate) fn api_url(base: &url::Url, prefix: &str, key: &str) -> Result<url::Url, DataError> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| DataError::parse(base.as_str(), "address cannot carry a path"))?
        .pop_if_empty()
        .extend(prefix.split('/'))
        .extend(key.trim_start_matches('/').split('/'));
    Ok(url)
}
