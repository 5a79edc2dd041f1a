use super::{Handle, Reader, Retrieved, handle_mismatch};
use crate::core::DataError;
use crate::source::{MediaType, Source};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// Fetches `http://` and `https://` URLs with a GET request.
///
/// Anything but `200 OK` is an error. A `Content-Type` response header
/// replaces the declared media type for that payload.
#[derive(Debug, Clone)]
pub struct HttpReader {
    timeout: Duration,
}

impl HttpReader {
    /// A reader whose clients time out after `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
        }
    }
}

impl Reader for HttpReader {
    fn read(&self, source: &Source, handle: &mut Handle, _args: &[String]) -> Result<Retrieved> {
        if !handle.is_connected() {
            let client = Client::builder()
                .timeout(self.timeout)
                .build()
                .context("Failed to build HTTP client")?;
            *handle = Handle::Http(client);
        }
        let Handle::Http(client) = handle else {
            return Err(handle_mismatch("http", handle));
        };

        let url = source.url();
        let operation = format!("GET {url}");
        tracing::debug!("{operation}");

        let response = client
            .get(url.clone())
            .headers(source.headers().clone())
            .send()
            .map_err(|e| DataError::transport(operation.clone(), e))?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().map_err(|e| DataError::transport(operation.clone(), e))?;

        if status != StatusCode::OK {
            return Err(DataError::Transport {
                operation,
                reason: format!(
                    "Unexpected HTTP status {} on GET from {url}: {}",
                    status.as_u16(),
                    String::from_utf8_lossy(&body)
                ),
                status: Some(status.as_u16()),
            }
            .into());
        }

        let mut retrieved = Retrieved::new(body.to_vec());
        if let Some(value) = content_type {
            let value = value
                .to_str()
                .map_err(|e| DataError::parse(format!("{value:?}"), format!("invalid Content-Type header: {e}")))?;
            if !value.trim().is_empty() {
                retrieved = retrieved.with_media_type(MediaType::parse(value)?);
            }
        }
        Ok(retrieved)
    }
}
