//! Reads data sources: plain HTTP GET for URLs, filesystem reads for paths.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::error::{GridvizError, Result};

/// Where a data file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Remote(String),
    Local(PathBuf),
}

impl Source {
    /// `http://` and `https://` strings are remote; anything else is a path.
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            Self::Remote(s.to_string())
        } else {
            Self::Local(PathBuf::from(s.strip_prefix("file://").unwrap_or(s)))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => f.write_str(url),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetches sources as text. One client is reused for every remote request.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Reads a whole source as UTF-8 text. No retries.
    ///
    /// # Errors
    ///
    /// Returns [`GridvizError::Fetch`] / [`GridvizError::HttpStatus`] for
    /// remote failures and [`GridvizError::Read`] for local ones.
    pub fn fetch_text(&self, source: &Source) -> Result<String> {
        debug!(%source, "fetching");
        let text = match source {
            Source::Remote(url) => {
                let fetch_err = |source| GridvizError::Fetch {
                    url: url.clone(),
                    source,
                };
                let response = self.client.get(url).send().map_err(fetch_err)?;
                let status = response.status();
                if !status.is_success() {
                    return Err(GridvizError::HttpStatus {
                        url: url.clone(),
                        status: status.as_u16(),
                    });
                }
                response.text().map_err(fetch_err)?
            }
            Source::Local(path) => fs::read_to_string(path).map_err(|e| GridvizError::Read {
                path: path.display().to_string(),
                source: e,
            })?,
        };
        info!(%source, bytes = text.len(), "fetched");
        Ok(text)
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}
