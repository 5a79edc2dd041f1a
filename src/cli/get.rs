use crate::data::DataManager;
use anyhow::Result;
use clap::Args;

/// Print one datasource decoded by its media type, as pretty JSON.
#[derive(Args, Debug)]
pub struct GetCommand {
    /// Datasource alias
    alias: String,

    /// Extra argument (sub-path or key)
    arg: Option<String>,
}

impl GetCommand {
    pub fn execute(self, data: &DataManager) -> Result<()> {
        let args: Vec<String> = self.arg.into_iter().collect();
        let value = data.get(&self.alias, &args)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }
}

/// Print one datasource's payload without decoding it.
#[derive(Args, Debug)]
pub struct RawCommand {
    /// Datasource alias
    alias: String,

    /// Extra argument (sub-path or key)
    arg: Option<String>,
}

impl RawCommand {
    pub fn execute(self, data: &DataManager) -> Result<()> {
        let args: Vec<String> = self.arg.into_iter().collect();
        print!("{}", data.include_raw(&self.alias, &args)?);
        Ok(())
    }
}
