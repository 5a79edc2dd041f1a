use super::{Handle, Reader, Retrieved};
use crate::source::Source;
use anyhow::{Context, Result};
use std::io::Read;
use std::sync::{Mutex, PoisonError};

/// Reads the process's standard input to the end.
///
/// The stream is consumed by the first read; the manager's cache serves
/// every later request for the same key.
pub struct StdinReader {
    input: Mutex<Box<dyn Read + Send>>,
}

impl StdinReader {
    /// Read from the real standard input.
    #[must_use]
    pub fn new() -> Self {
        Self::from_reader(std::io::stdin())
    }

    /// Read from any stream instead of standard input.
    pub fn from_reader(input: impl Read + Send + 'static) -> Self {
        Self {
            input: Mutex::new(Box::new(input)),
        }
    }
}

impl Default for StdinReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader for StdinReader {
    fn read(&self, source: &Source, _handle: &mut Handle, _args: &[String]) -> Result<Retrieved> {
        let mut input = self.input.lock().unwrap_or_else(PoisonError::into_inner);
        let mut bytes = Vec::new();
        input
            .read_to_end(&mut bytes)
            .with_context(|| format!("Can't read standard input for datasource '{}'", source.alias()))?;

        tracing::debug!("Read {} bytes from stdin", bytes.len());
        Ok(Retrieved::new(bytes))
    }
}
