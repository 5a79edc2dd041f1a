//! Engine configuration.
//!
//! Configuration is read from a TOML file, located in this order:
//!
//! 1. the path given with `--config`
//! 2. the `TDS_CONFIG` environment variable
//! 3. `tds/config.toml` under the platform config directory
//!    (`~/.config/tds/config.toml` on Linux)
//!
//! A missing default file is not an error; every setting has a default.
//! Backend settings left unset in the file fall back to the usual
//! environment variables (`VAULT_ADDR`, `CONSUL_HTTP_ADDR`, `AWS_REGION`, ...).
//!
//! # Example
//!
//! ```toml
//! [http]
//! timeout_secs = 10
//!
//! [vault]
//! addr = "https://vault.internal:8200"
//! role_id = "app"
//!
//! [consul]
//! addr = "consul.internal:8500"
//!
//! [aws]
//! region = "eu-west-1"
//!
//! [datasources]
//! cfg = "config/app.json"
//! secrets = "vault:///secret/app"
//!
//! [headers]
//! api = ["Authorization: Bearer abc123"]
//! ```

use crate::core::DataError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "TDS_CONFIG";

const fn default_timeout_secs() -> u64 {
    5
}

/// HTTP retrieval settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout for HTTP datasources and HTTP-backed stores.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Vault connection and authentication settings.
///
/// Authentication is tried in order: `token`, AppRole (`role_id` +
/// `secret_id`), userpass (`username` + `password`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VaultConfig {
    /// Server address, used when the datasource URL has no host.
    pub addr: Option<String>,
    /// Static token, used as-is and never revoked.
    pub token: Option<String>,
    /// AppRole role ID
    pub role_id: Option<String>,
    /// AppRole secret ID
    pub secret_id: Option<String>,
    /// Userpass user name
    pub username: Option<String>,
    /// Userpass password
    pub password: Option<String>,
    /// Auth method mount path, if not the default `approle`/`userpass`.
    pub mount: Option<String>,
}

/// Consul agent settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConsulConfig {
    /// Agent address, used when the datasource URL has no host.
    pub addr: Option<String>,
    /// ACL token
    pub token: Option<String>,
}

/// AWS Parameter Store settings. Credentials always come from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AwsConfig {
    /// Region for signing and the default endpoint.
    pub region: Option<String>,
    /// Override the SSM endpoint (e.g. for a local emulator).
    pub endpoint: Option<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// HTTP client settings shared by every backend
    #[serde(default)]
    pub http: HttpConfig,
    /// Secret store settings
    #[serde(default)]
    pub vault: VaultConfig,
    /// Key-value store settings
    #[serde(default)]
    pub consul: ConsulConfig,
    /// Parameter store settings
    #[serde(default)]
    pub aws: AwsConfig,
    /// Datasources declared in the file, alias to URI.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub datasources: BTreeMap<String, String>,
    /// Headers per alias, each as `Name: value`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
}

impl EngineConfig {
    /// Load configuration, apply environment fallbacks and validate.
    ///
    /// An explicit `path` must exist. Without one, `TDS_CONFIG` is consulted,
    /// then the default location; a missing default file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a named file cannot be read or parsed, or if the
    /// result fails [`validate`](Self::validate).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path.map(Path::to_path_buf).or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let config = match explicit {
            Some(path) => Self::load_from(&path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path)?,
                _ => {
                    tracing::debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };

        let config = config.with_env_fallbacks(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file without env fallbacks or validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for
    /// this structure.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content).map_err(|e| DataError::Config {
            message: format!("{}: {e}", path.display()),
        })?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// `tds/config.toml` under the platform config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tds").join("config.toml"))
    }

    /// Fill unset backend settings from environment variables.
    ///
    /// `lookup` is normally `|name| std::env::var(name).ok()`.
    #[must_use]
    pub fn with_env_fallbacks(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn fill(slot: &mut Option<String>, lookup: &dyn Fn(&str) -> Option<String>, names: &[&str]) {
            if slot.is_none() {
                *slot = names.iter().find_map(|name| lookup(name).filter(|v| !v.is_empty()));
            }
        }

        let lookup: &dyn Fn(&str) -> Option<String> = &lookup;
        fill(&mut self.vault.addr, lookup, &["VAULT_ADDR"]);
        fill(&mut self.vault.token, lookup, &["VAULT_TOKEN"]);
        fill(&mut self.vault.role_id, lookup, &["VAULT_ROLE_ID"]);
        fill(&mut self.vault.secret_id, lookup, &["VAULT_SECRET_ID"]);
        fill(&mut self.vault.username, lookup, &["VAULT_AUTH_USERNAME"]);
        fill(&mut self.vault.password, lookup, &["VAULT_AUTH_PASSWORD"]);
        fill(&mut self.consul.addr, lookup, &["CONSUL_HTTP_ADDR"]);
        fill(&mut self.consul.token, lookup, &["CONSUL_HTTP_TOKEN"]);
        fill(&mut self.aws.region, lookup, &["AWS_REGION", "AWS_DEFAULT_REGION"]);
        self
    }

    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Config`] if `http.timeout_secs` is zero.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.http.timeout_secs == 0 {
            return Err(DataError::Config {
                message: "http.timeout_secs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// The HTTP timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// The `[datasources]` table as `alias=URI` declarations.
    #[must_use]
    pub fn datasource_args(&self) -> Vec<String> {
        self.datasources.iter().map(|(alias, uri)| format!("{alias}={uri}")).collect()
    }

    /// The `[headers]` table as `alias=Name: value` declarations.
    #[must_use]
    pub fn header_args(&self) -> Vec<String> {
        self.headers
            .iter()
            .flat_map(|(alias, headers)| headers.iter().map(move |header| format!("{alias}={header}")))
            .collect()
    }
}
