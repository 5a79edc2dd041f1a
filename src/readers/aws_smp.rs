use super::{Connector, Handle, Reader, Retrieved, handle_mismatch};
use crate::config::AwsConfig;
use crate::source::media::JSON;
use crate::source::{MediaType, Source};
use crate::stores::{ParameterStore, SsmClient};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Reads parameters from AWS Systems Manager Parameter Store (`aws+smp`).
///
/// The parameter name is the URL path, with `/<arg>` appended when one extra
/// argument is given. The payload is the whole parameter record as JSON
/// (`Name`, `Type`, `Value`, `Version`, ...).
pub struct AwsSmpReader {
    connect: Connector<Box<dyn ParameterStore>>,
}

impl AwsSmpReader {
    /// A reader that builds [`SsmClient`]s.
    #[must_use]
    pub fn new(config: AwsConfig, timeout: Duration) -> Self {
        Self::with_connector(move |_| Ok(Box::new(SsmClient::new(&config, timeout)?)))
    }

    /// A reader that builds clients with `connect`.
    #[must_use]
    pub fn with_connector(
        connect: impl Fn(&Url) -> Result<Box<dyn ParameterStore>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            connect: Arc::new(connect),
        }
    }
}

impl Reader for AwsSmpReader {
    fn read(&self, source: &Source, handle: &mut Handle, args: &[String]) -> Result<Retrieved> {
        if !handle.is_connected() {
            let client = (self.connect)(source.url())
                .with_context(|| format!("Failed to create parameter store client for '{}'", source.alias()))?;
            *handle = Handle::Parameters(client);
        }
        let Handle::Parameters(client) = handle else {
            return Err(handle_mismatch("parameter store", handle));
        };

        let name = match args {
            [arg] => format!("{}/{arg}", source.path()),
            _ => source.path().into_owned(),
        };
        tracing::debug!("Fetching parameter {name}");
        let parameter = client.get_parameter(&name)?;

        Ok(Retrieved::new(serde_json::to_vec(&parameter)?).with_media_type(MediaType::parse(JSON)?))
    }
}
