//! Minimal Vault HTTP API client.
//!
//! Supports token, AppRole and userpass authentication, plus logical reads
//! and writes. Only the `data` member of a response is returned, JSON-encoded.

use super::{SecretStore, api_url, check_status, store_address};
use crate::config::VaultConfig;
use crate::core::DataError;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

const TOKEN_HEADER: &str = "X-Vault-Token";

/// A Vault session for one datasource.
pub struct VaultClient {
    http: Client,
    addr: Url,
    config: VaultConfig,
    token: Option<String>,
    /// Tokens we obtained ourselves are revoked on logout; supplied ones are not.
    owns_token: bool,
}

impl VaultClient {
    /// Create a client for a `vault`, `vault+http` or `vault+https` URL.
    ///
    /// The server address comes from the URL host when there is one, otherwise
    /// from `config.addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if no address can be determined or the HTTP client
    /// cannot be built.
    pub fn new(url: &Url, config: &VaultConfig, timeout: Duration) -> Result<Self> {
        let addr = store_address(url, "https", config.addr.as_deref())?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Vault HTTP client")?;

        Ok(Self {
            http,
            addr,
            config: config.clone(),
            token: None,
            owns_token: false,
        })
    }

    /// The resolved server address.
    pub fn address(&self) -> &Url {
        &self.addr
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        api_url(&self.addr, "v1", path).with_context(|| format!("Invalid Vault path '{path}'"))
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder, operation: &str) -> Result<Response> {
        request.send().map_err(|e| DataError::transport(operation, e).into())
    }

    fn login_with(&self, mount: &str, path_suffix: &str, body: Value) -> Result<String> {
        let operation = format!("vault login ({mount})");
        let url = self.endpoint(&format!("auth/{mount}/login{path_suffix}"))?;
        let response = self.send(self.http.post(url).json(&body), &operation)?;
        let response = check_status(response, &operation)?;
        let body: Value = response.json().with_context(|| format!("Invalid response from {operation}"))?;

        body.pointer("/auth/client_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DataError::transport(operation, "response carried no client token").into())
    }

    /// Return the JSON-encoded `data` of a logical response, or nothing for
    /// 404/204 and responses without data.
    fn logical_data(response: Response, operation: &str) -> Result<Vec<u8>> {
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::NO_CONTENT) {
            return Ok(Vec::new());
        }
        let response = check_status(response, operation)?;
        let text = response.text().with_context(|| format!("Failed to read response of {operation}"))?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| DataError::transport(operation, format!("invalid JSON response: {e}")))?;
        match body.get("data") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(data) => Ok(serde_json::to_vec(data)?),
        }
    }
}

impl SecretStore for VaultClient {
    fn login(&mut self) -> Result<()> {
        if let Some(token) = &self.config.token {
            tracing::debug!("Using configured Vault token for {}", self.addr);
            self.token = Some(token.clone());
            self.owns_token = false;
            return Ok(());
        }

        let token = match (&self.config.role_id, &self.config.secret_id, &self.config.username, &self.config.password)
        {
            (Some(role_id), Some(secret_id), _, _) => {
                let mount = self.config.mount.as_deref().unwrap_or("approle");
                self.login_with(
                    mount,
                    "",
                    serde_json::json!({ "role_id": role_id, "secret_id": secret_id }),
                )?
            }
            (_, _, Some(username), Some(password)) => {
                let mount = self.config.mount.as_deref().unwrap_or("userpass");
                self.login_with(
                    mount,
                    &format!("/{username}"),
                    serde_json::json!({ "password": password }),
                )?
            }
            _ => {
                return Err(DataError::Config {
                    message: format!(
                        "no Vault credentials for {}: set a token, an AppRole role_id/secret_id or a username/password",
                        self.addr
                    ),
                }
                .into());
            }
        };

        tracing::info!("Logged in to Vault at {}", self.addr);
        self.token = Some(token);
        self.owns_token = true;
        Ok(())
    }

    fn read(&mut self, path: &str) -> Result<Vec<u8>> {
        let operation = format!("vault read {path}");
        let url = self.endpoint(path)?;
        let response = self.send(self.authed(self.http.get(url)), &operation)?;
        Self::logical_data(response, &operation)
    }

    fn write(&mut self, path: &str, params: &BTreeMap<String, String>) -> Result<Vec<u8>> {
        let operation = format!("vault write {path}");
        let url = self.endpoint(path)?;
        let response = self.send(self.authed(self.http.put(url).json(params)), &operation)?;
        Self::logical_data(response, &operation)
    }

    fn logout(&mut self) -> Result<()> {
        let Some(token) = self.token.take() else {
            return Ok(());
        };
        if !self.owns_token {
            return Ok(());
        }

        let operation = "vault token revoke-self";
        let url = self.endpoint("auth/token/revoke-self")?;
        let response = self.send(self.http.post(url).header(TOKEN_HEADER, token), operation)?;
        check_status(response, operation)?;
        tracing::info!("Logged out of Vault at {}", self.addr);
        Ok(())
    }
}
