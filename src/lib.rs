//! tera-datasources - URI-addressed datasources for Tera templates
//!
//! Resolves named datasources (files, HTTP(S) endpoints, Vault secrets,
//! Consul and BoltDB keys, AWS SSM parameters, stdin) into decoded values a
//! template can use. Each datasource is declared once as `alias=URI`; reads
//! are lazy, connections are opened on first use and closed once at
//! shutdown, and every `(alias, args)` result is cached for the life of the
//! process.
//!
//! # Architecture Overview
//!
//! ```text
//! declarations ──► source::parse_source ──► Source (alias, URL, media type, headers, handle)
//!                                              │
//! template ──► templating ──► data::DataManager ──► cache hit? ──► Payload
//!                                              │ miss
//!                                              ▼
//!                               readers::ReaderRegistry[scheme]
//!                                              │
//!                file · stdin · http · vault · consul · boltdb · aws+smp
//!                                              │
//!                                  stores::{Vault,Consul,Sled,Ssm}
//! ```
//!
//! # Core Modules
//!
//! - [`source`] - declaration parsing, URL resolution and media-type inference
//! - [`readers`] - the scheme → reader registry and one reader per backend family
//! - [`stores`] - clients for the stateful backends (Vault, Consul, sled, SSM)
//! - [`data`] - the Data Manager: retrieval, caching, decoding and cleanup
//! - [`templating`] - Tera functions over the Data Manager
//! - [`config`] - `tds/config.toml` loading with environment fallbacks
//! - [`core`] - error types and user-facing error formatting
//! - [`cli`] - the `tds` command-line interface
//!
//! # Supported URIs
//!
//! | Scheme                                   | Extra argument                      |
//! |------------------------------------------|-------------------------------------|
//! | `file`, bare path                        | none                                |
//! | `http`, `https`                          | none                                |
//! | `stdin` (`-`)                            | none                                |
//! | `vault`, `vault+http`, `vault+https`     | `subpath[?param=value...]`          |
//! | `consul`, `consul+http`, `consul+https`  | key suffix                          |
//! | `boltdb` (`boltdb:///path/db#bucket`)    | key (required)                      |
//! | `aws+smp`                                | parameter name suffix               |
//!
//! A `type=<mime>` query parameter overrides the media type inferred from the
//! file extension; HTTP responses may override both with `Content-Type`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tera_datasources::config::EngineConfig;
//! use tera_datasources::data::DataManager;
//! use tera_datasources::templating;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = EngineConfig::load(None)?;
//! let data = Arc::new(DataManager::from_config(&config, &["cfg=config.json"], &[] as &[&str])?);
//!
//! let out = templating::render_str(r#"{% set cfg = datasource(alias="cfg") %}port = {{ cfg.port }}"#, Arc::clone(&data))?;
//! println!("{out}");
//!
//! data.cleanup();
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod data;
pub mod readers;
pub mod source;
pub mod stores;
pub mod templating;

// test_utils is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
