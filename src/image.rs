//! Bottle photos from local files or URLs.
//!
//! Fetching is best-effort from the catalog's point of view: callers that are
//! saving a record log a failure and carry on without a photo.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow, bail};
use log::debug;
use reqwest::{StatusCode, blocking::Client, header::CONTENT_TYPE};

use crate::record::Photo;

/// Downloads the payload behind a URL together with its media type.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Result<Photo>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    File(PathBuf),
    Url(String),
}

#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vinoteca/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Building HTTP client")?;
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Result<Photo> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Requesting {url}"))?;
        if response.status() != StatusCode::OK {
            bail!("{url} answered {}", response.status());
        }
        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string());
        let bytes = response
            .bytes()
            .with_context(|| format!("Downloading {url}"))?
            .to_vec();
        let mime = declared
            .filter(|mime| mime.starts_with("image/"))
            .or_else(|| sniff_mime(&bytes, None))
            .ok_or_else(|| anyhow!("{url} did not return an image"))?;
        debug!("Fetched {} byte(s) of {mime} from {url}", bytes.len());
        Ok(Photo { bytes, mime })
    }
}

pub fn load_image_file(path: &Path) -> Result<Photo> {
    let bytes = fs::read(path).with_context(|| format!("Reading image {path:?}"))?;
    if bytes.is_empty() {
        bail!("Image {path:?} is empty");
    }
    let mime = sniff_mime(&bytes, Some(path))
        .ok_or_else(|| anyhow!("{path:?} does not look like an image"))?;
    Ok(Photo { bytes, mime })
}

pub fn acquire(source: &ImageSource, fetcher: &dyn ImageFetcher) -> Result<Photo> {
    match source {
        ImageSource::File(path) => load_image_file(path),
        ImageSource::Url(url) => fetcher.fetch(url),
    }
}

/// Media type from the payload's magic bytes, then from the file extension.
pub fn sniff_mime(bytes: &[u8], path: Option<&Path>) -> Option<String> {
    if let Some(kind) = infer::get(bytes) {
        return kind
            .mime_type()
            .starts_with("image/")
            .then(|| kind.mime_type().to_string());
    }
    let ext = path?.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => return None,
    };
    Some(mime.to_string())
}
