//! Blocklist source descriptors.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Prefix that marks a descriptor as a file path explicitly.
const FILE_MARKER: char = '@';

/// Where a blocklist is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlocklistSource {
    /// Fetched over HTTP(S)
    Url(String),
    /// Read from a local file
    File(PathBuf),
}

impl BlocklistSource {
    /// Resolve a configured descriptor.
    ///
    /// `http://` and `https://` descriptors are URLs. Anything else is a file
    /// path, optionally prefixed with `@`; relative paths are taken relative
    /// to `base_dir` (the directory holding the configuration file).
    pub fn parse(descriptor: &str, base_dir: Option<&Path>) -> Result<Self> {
        let descriptor = descriptor.trim();
        if descriptor.is_empty() {
            return Err(Error::blocklist("no blocklist source configured"));
        }

        if !descriptor.starts_with(FILE_MARKER)
            && (descriptor.starts_with("http://") || descriptor.starts_with("https://"))
        {
            return Ok(BlocklistSource::Url(descriptor.to_string()));
        }

        let path = Path::new(descriptor.strip_prefix(FILE_MARKER).unwrap_or(descriptor));
        let path = match base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        };
        Ok(BlocklistSource::File(path))
    }

    /// Read the raw list bytes.
    pub async fn fetch(&self) -> Result<Vec<u8>> {
        match self {
            BlocklistSource::Url(url) => {
                let response = reqwest::get(url).await?.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
            BlocklistSource::File(path) => tokio::fs::read(path).await.map_err(|e| {
                Error::blocklist(format!("cannot read {}: {}", path.display(), e))
            }),
        }
    }
}

impl fmt::Display for BlocklistSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlocklistSource::Url(url) => write!(f, "{}", url),
            BlocklistSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}
