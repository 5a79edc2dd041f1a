//! Command-line interface for `tds`.
//!
//! Datasources are declared with `-d/--datasource` (repeatable, same syntax
//! as [`parse_source`](crate::source::parse_source)) and may also come from
//! the `[datasources]` table of the config file. A command-line declaration
//! replaces a configured one with the same alias.
//!
//! # Commands
//!
//! - `render` - render a Tera template with the datasource functions
//! - `get` - print one datasource, decoded, as JSON
//! - `raw` - print one datasource's raw payload
//! - `list` - show every declared datasource
//!
//! ```bash
//! tds -d cfg=config.json render --in '{{ datasource(alias="cfg") | json_encode() }}'
//! tds -d web=https://example.com/data.csv -H 'web=Authorization: Bearer x' get web
//! echo '{"a":1}' | tds -d in=- get in
//! tds --config ./tds.toml list
//! ```
//!
//! Every command closes open backend sessions exactly once before returning,
//! whether or not it succeeded.

mod get;
mod list;
mod render;

use crate::config::EngineConfig;
use crate::data::DataManager;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub use get::{GetCommand, RawCommand};
pub use list::ListCommand;
pub use render::RenderCommand;

/// Render templates and read datasources.
#[derive(Parser, Debug)]
#[command(
    name = "tds",
    about = "Render Tera templates with data from files, HTTP, Vault, Consul, BoltDB, AWS SSM and stdin",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (equivalent to `RUST_LOG=debug`)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file (default: `<config dir>/tds/config.toml`)
    #[arg(short, long, global = true, env = "TDS_CONFIG")]
    config: Option<PathBuf>,

    /// Declare a datasource as `alias=URI` or a bare file name
    #[arg(short = 'd', long = "datasource", global = true, value_name = "ALIAS=URI")]
    datasources: Vec<String>,

    /// Add an HTTP header to a datasource as `alias=Name: value`
    #[arg(short = 'H', long = "datasource-header", global = true, value_name = "ALIAS=HEADER")]
    headers: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template
    Render(RenderCommand),
    /// Print a datasource decoded as JSON
    Get(GetCommand),
    /// Print a datasource's raw payload
    Raw(RawCommand),
    /// List declared datasources
    List(ListCommand),
}

impl Cli {
    /// Run the selected command.
    ///
    /// # Errors
    ///
    /// Returns configuration and declaration errors, and whatever the
    /// command fails with. Cleanup failures are logged, not returned.
    pub fn execute(self) -> Result<()> {
        init_logging(self.log_filter());

        let config = EngineConfig::load(self.config.as_deref())?;
        let data = Arc::new(DataManager::from_config(&config, &self.datasources, &self.headers)?);

        let result = match self.command {
            Commands::Render(cmd) => cmd.execute(Arc::clone(&data)),
            Commands::Get(cmd) => cmd.execute(&data),
            Commands::Raw(cmd) => cmd.execute(&data),
            Commands::List(cmd) => cmd.execute(&data),
        };

        let report = data.cleanup();
        if !report.is_clean() {
            tracing::warn!("{} datasource connection(s) did not close cleanly", report.failures.len());
        }
        tracing::debug!("Cache: {:?}", data.cache_stats());

        result
    }

    /// Log filter for the chosen verbosity, or `None` to defer to `RUST_LOG`.
    fn log_filter(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` applies unless a verbosity flag
/// was given; the default level is `warn`.
fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
