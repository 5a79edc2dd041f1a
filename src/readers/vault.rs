use super::{Connector, Handle, Reader, Retrieved, handle_mismatch};
use crate::config::VaultConfig;
use crate::core::DataError;
use crate::source::media::JSON;
use crate::source::{MediaType, Source};
use crate::stores::{SecretStore, VaultClient};
use anyhow::{Context, Result};
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Reads secrets from a secret store (`vault`, `vault+http`, `vault+https`).
///
/// The secret path is the URL path. With one extra argument of the form
/// `subpath[?key=value...]`, the sub-path is appended and its parameters are
/// merged over the URL's own query parameters (`type` excepted). When any
/// parameters are present the path is written with them, which is how
/// dynamic secrets are generated; otherwise it is read.
pub struct VaultReader {
    connect: Connector<Box<dyn SecretStore>>,
}

impl VaultReader {
    /// A reader that opens [`VaultClient`] sessions.
    #[must_use]
    pub fn new(config: VaultConfig, timeout: Duration) -> Self {
        Self::with_connector(move |url| Ok(Box::new(VaultClient::new(url, &config, timeout)?)))
    }

    /// A reader that opens sessions with `connect`.
    #[must_use]
    pub fn with_connector(
        connect: impl Fn(&Url) -> Result<Box<dyn SecretStore>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            connect: Arc::new(connect),
        }
    }
}

/// Collect query parameters, joining repeated keys with a space.
fn collect_params<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> BTreeMap<String, String> {
    let mut params: BTreeMap<String, String> = BTreeMap::new();
    for (key, value) in pairs {
        if key == "type" {
            continue;
        }
        params
            .entry(key.into_owned())
            .and_modify(|existing| {
                existing.push(' ');
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    params
}

/// Resolve the secret path and parameters for one call.
///
/// The extra argument is a relative reference: its path is percent-decoded,
/// its query supplies parameters and any fragment is ignored.
fn secret_request(source: &Source, args: &[String]) -> Result<(String, BTreeMap<String, String>)> {
    let mut path = source.path().into_owned();
    let mut params = collect_params(source.url().query_pairs());

    if let [arg] = args {
        let base = Url::parse("vault:///")?;
        let reference = Url::options()
            .base_url(Some(&base))
            .parse(arg)
            .map_err(|e| DataError::parse(arg.as_str(), format!("invalid secret sub-path: {e}")))?;

        let sub_path = percent_decode_str(reference.path()).decode_utf8_lossy();
        let sub_path = sub_path.trim_start_matches('/');
        if !sub_path.is_empty() {
            path.push('/');
            path.push_str(sub_path);
        }
        params.extend(collect_params(reference.query_pairs()));
    }

    Ok((path, params))
}

impl Reader for VaultReader {
    fn read(&self, source: &Source, handle: &mut Handle, args: &[String]) -> Result<Retrieved> {
        if !handle.is_connected() {
            let mut store = (self.connect)(source.url())
                .with_context(|| format!("Failed to connect to secret store for '{}'", source.alias()))?;
            store.login().with_context(|| format!("Failed to log in to secret store for '{}'", source.alias()))?;
            *handle = Handle::SecretStore(store);
        }
        let Handle::SecretStore(store) = handle else {
            return Err(handle_mismatch("secret store", handle));
        };

        let (path, params) = secret_request(source, args)?;
        let data = if params.is_empty() {
            tracing::debug!("Reading secret {path}");
            store.read(&path)?
        } else {
            tracing::debug!("Writing secret {path} with {} parameter(s)", params.len());
            store.write(&path, &params)?
        };

        if data.is_empty() {
            return Err(DataError::not_found(format!("no value found for path {path}")).into());
        }
        Ok(Retrieved::new(data).with_media_type(MediaType::parse(JSON)?))
    }
}
