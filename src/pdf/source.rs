//! Document sources and byte retrieval

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::debug;

use super::request::LoadError;

/// Where a document's bytes come from
#[derive(Clone, Default)]
pub enum Source {
    /// No document
    #[default]
    Empty,
    /// Bytes already in memory
    Bytes(Arc<[u8]>),
    /// Local file
    File(PathBuf),
    /// Remote document fetched over HTTP(S)
    Url(String),
}

impl Source {
    /// Interpret a user-supplied location: `http(s)://` is a URL, anything
    /// else a file path. Blank input is [`Source::Empty`].
    #[must_use]
    pub fn from_location(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// True when there is nothing to load
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::File(path) => path.as_os_str().is_empty(),
            Self::Url(url) => url.is_empty(),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::File(path) => write!(f, "File({path:?})"),
            Self::Url(url) => write!(f, "Url({url})"),
        }
    }
}

/// Retrieves bytes for a source. Holds one HTTP client per worker.
#[derive(Default)]
pub struct Fetcher {
    client: Option<reqwest::blocking::Client>,
}

impl Fetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&mut self, source: &Source) -> Result<Arc<[u8]>, LoadError> {
        match source {
            Source::Empty => Ok(Arc::from(Vec::new())),
            Source::Bytes(bytes) => Ok(bytes.clone()),
            Source::File(path) => {
                debug!("Reading {path:?}");
                std::fs::read(path)
                    .map(Arc::from)
                    .map_err(|e| LoadError::fetch(format!("{}: {e}", path.display())))
            }
            Source::Url(url) => self.fetch(url),
        }
    }

    fn fetch(&mut self, url: &str) -> Result<Arc<[u8]>, LoadError> {
        if self.client.is_none() {
            let client = reqwest::blocking::Client::builder()
                .build()
                .map_err(|e| LoadError::fetch(e.to_string()))?;
            self.client = Some(client);
        }
        let Some(client) = self.client.as_ref() else {
            return Err(LoadError::fetch("HTTP client unavailable"));
        };

        debug!("Fetching {url}");
        let response = client
            .get(url)
            .send()
            .map_err(|e| LoadError::fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::fetch(format!(
                "Unable to fetch PDF ({})",
                status.as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| LoadError::fetch(e.to_string()))?;
        Ok(Arc::from(bytes.as_ref()))
    }
}
