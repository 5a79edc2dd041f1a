//! Integration test suite for tera-datasources
//!
//! End-to-end tests through the public API and the `tds` binary. Backends
//! are local: temp files, `mockito` servers, sled databases and the mock
//! stores from `test_utils`.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **file_sources**: file and bare-filename datasources, media types
//! - **http_sources**: HTTP datasources, headers, response content types
//! - **stdin_source**: stdin read once per process
//! - **store_sources**: Vault, Consul, BoltDB and SSM datasources, cleanup
//! - **templates**: rendering through the Tera functions
//! - **cli**: the `tds` binary

mod cli;
mod file_sources;
mod http_sources;
mod stdin_source;
mod store_sources;
mod templates;

use std::sync::Arc;
use tera_datasources::config::EngineConfig;
use tera_datasources::data::DataManager;
use tera_datasources::readers::ReaderRegistry;

/// A manager using the built-in readers with default configuration.
pub fn builtin_manager(datasources: &[&str], headers: &[&str]) -> DataManager {
    let readers = Arc::new(ReaderRegistry::builtin(&EngineConfig::default()));
    DataManager::new(datasources, headers, readers).unwrap()
}
