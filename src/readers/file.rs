use super::{Handle, Reader, Retrieved};
use crate::core::DataError;
use crate::source::Source;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;

/// Reads `file://` URLs from the local filesystem. Extra arguments are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileReader;

impl Reader for FileReader {
    fn read(&self, source: &Source, _handle: &mut Handle, _args: &[String]) -> Result<Retrieved> {
        let path = source
            .url()
            .to_file_path()
            .map_err(|()| DataError::parse(source.url().as_str(), "not a local file path"))?;

        if let Err(e) = std::fs::metadata(&path) {
            return Err(DataError::not_found(format!("Can't stat {}: {e}", path.display())).into());
        }

        let mut file = File::open(&path).with_context(|| format!("Can't open {}", path.display()))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).with_context(|| format!("Can't read {}", path.display()))?;

        tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(Retrieved::new(bytes))
    }
}
