use crate::data::DataManager;
use crate::templating;
use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Args};
use std::path::PathBuf;
use std::sync::Arc;

/// Render a template given inline or from a file.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("template").required(true).args(["input", "file"])))]
pub struct RenderCommand {
    /// Template text
    #[arg(short, long = "in", value_name = "TEXT")]
    input: Option<String>,

    /// Template file
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Write the output here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    out: Option<PathBuf>,
}

impl RenderCommand {
    pub fn execute(self, data: Arc<DataManager>) -> Result<()> {
        let template = match (self.input, &self.file) {
            (Some(text), _) => text,
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read template: {}", path.display()))?,
            (None, None) => bail!("No template given; use --in or --file"),
        };

        let rendered = templating::render_str(&template, data)?;

        match self.out {
            Some(path) => std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write output: {}", path.display()))?,
            None => print!("{rendered}"),
        }
        Ok(())
    }
}
