use crate::data::DataManager;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// List declared datasources with their URL and declared media type.
#[derive(Args, Debug)]
pub struct ListCommand {
    /// Also check whether each datasource can be read
    #[arg(long)]
    check: bool,
}

impl ListCommand {
    pub fn execute(self, data: &DataManager) -> Result<()> {
        let aliases = data.aliases();
        if aliases.is_empty() {
            println!("{}", "No datasources declared".yellow());
            return Ok(());
        }

        for alias in aliases {
            let Some(source) = data.source(alias) else {
                continue;
            };
            let line = format!("{} {} ({})", alias.bold(), source.url(), source.media_type().essence());
            if self.check {
                let status = if data.is_reachable(alias, &[]) {
                    "ok".green()
                } else {
                    "unreachable".red()
                };
                println!("{line} {status}");
            } else {
                println!("{line}");
            }
        }
        Ok(())
    }
}
