//! Byte fetching for track locators
//!
//! A locator is either an absolute `http(s)` URL or a filesystem path
//! (plain or `file://`). [`SourceFetcher`] picks the right backend.

use crate::error::DeviceError;
use crate::settings::FetchSettings;
use async_trait::async_trait;
use duet_core::{DuetError, MediaFetcher, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Parsed track locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// HTTP or HTTPS resource
    Remote(Url),
    /// File on local disk
    Local(PathBuf),
}

impl Locator {
    /// Parse a locator string
    ///
    /// # Errors
    /// Returns `DuetError::InvalidLocator` for empty input, malformed URLs
    /// and schemes other than `http`, `https` and `file`.
    pub fn parse(locator: &str) -> Result<Self> {
        let trimmed = locator.trim();
        if trimmed.is_empty() {
            return Err(DuetError::invalid_locator("empty locator"));
        }

        match Url::parse(trimmed) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Self::Remote(url)),
                "file" => url
                    .to_file_path()
                    .map(Self::Local)
                    .map_err(|()| DuetError::invalid_locator(format!("bad file URL: {trimmed}"))),
                // `C:\music\a.mp3` parses as scheme "c"
                scheme if scheme.len() == 1 => Ok(Self::Local(PathBuf::from(trimmed))),
                scheme => Err(DuetError::invalid_locator(format!(
                    "unsupported scheme '{scheme}'"
                ))),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Self::Local(PathBuf::from(trimmed))),
            Err(e) => Err(DuetError::invalid_locator(format!("{trimmed}: {e}"))),
        }
    }

    /// Lowercase file extension, used as the decoder hint
    pub fn extension(&self) -> Option<String> {
        let ext = match self {
            Self::Remote(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .and_then(|name| Path::new(name).extension())
                .and_then(|ext| ext.to_str()),
            Self::Local(path) => path.extension().and_then(|ext| ext.to_str()),
        };
        ext.filter(|e| !e.is_empty()).map(str::to_ascii_lowercase)
    }
}

/// Fetches `http(s)` resources
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// Build a client from fetch settings
    pub fn new(settings: &FetchSettings) -> std::result::Result<Self, DeviceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| DeviceError::Http(e.to_string()))?;
        Ok(Self { http })
    }

    /// Download the body of `url`
    pub async fn get(&self, url: &Url) -> Result<Vec<u8>> {
        tracing::debug!(%url, "Fetching remote track");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DuetError::fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DuetError::fetch(format!("{url}: HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DuetError::fetch(format!("{url}: {e}")))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        match Locator::parse(locator)? {
            Locator::Remote(url) => self.get(&url).await,
            Locator::Local(_) => Err(DuetError::invalid_locator(format!(
                "not an http(s) URL: {locator}"
            ))),
        }
    }
}

/// Reads files from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFetcher;

impl LocalFetcher {
    /// Read the whole file at `path`
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        tracing::debug!(path = %path.display(), "Reading local track");
        tokio::fs::read(path)
            .await
            .map_err(|e| DuetError::fetch(format!("{}: {e}", path.display())))
    }
}

#[async_trait]
impl MediaFetcher for LocalFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        match Locator::parse(locator)? {
            Locator::Local(path) => self.read(&path).await,
            Locator::Remote(url) => Err(DuetError::invalid_locator(format!(
                "not a local path: {url}"
            ))),
        }
    }
}

/// Dispatches to HTTP or disk by locator kind
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    http: HttpFetcher,
    local: LocalFetcher,
}

impl SourceFetcher {
    /// Create a fetcher for both locator kinds
    pub fn new(settings: &FetchSettings) -> std::result::Result<Self, DeviceError> {
        Ok(Self {
            http: HttpFetcher::new(settings)?,
            local: LocalFetcher,
        })
    }
}

#[async_trait]
impl MediaFetcher for SourceFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        match Locator::parse(locator)? {
            Locator::Remote(url) => self.http.get(&url).await,
            Locator::Local(path) => self.local.read(&path).await,
        }
    }
}
