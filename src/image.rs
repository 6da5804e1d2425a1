//! Image encoding and validation
//!
//! Images reach the completion API as `data:` URIs. Every image part of a
//! request is built from an [`ImageBlock`], so the checks here run before
//! anything is sent.

use crate::{Error, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Payloads above this size are accepted but logged.
const LARGE_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

/// How finely the vision model should inspect an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    #[default]
    Low,
    High,
    Auto,
}

impl ImageDetail {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageDetail::Low => "low",
            ImageDetail::High => "high",
            ImageDetail::Auto => "auto",
        }
    }
}

impl fmt::Display for ImageDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageDetail {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(ImageDetail::Low),
            "high" => Ok(ImageDetail::High),
            "auto" => Ok(ImageDetail::Auto),
            other => Err(Error::invalid_input(format!(
                "unknown image detail '{}', expected low, high or auto",
                other
            ))),
        }
    }
}

/// Read a file and return its contents as standard base64.
pub fn encode_image(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    tracing::debug!("Encoded {} ({} bytes)", path.display(), bytes.len());
    Ok(encode_bytes(&bytes))
}

/// Encode raw bytes as standard base64.
pub fn encode_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// MIME type to put in the data URI, chosen by file extension.
///
/// Unknown and missing extensions fall back to `image/jpeg`.
pub fn mime_type_for_path(path: impl AsRef<Path>) -> &'static str {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        _ => "image/jpeg",
    }
}

/// A validated image reference ready to embed in a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlock {
    url: String,
    detail: ImageDetail,
}

impl ImageBlock {
    /// Create an image block from a URL or `data:` URI.
    ///
    /// Only `http`, `https` and `data` schemes are accepted.
    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        let url = url.into();

        if url.is_empty() {
            return Err(Error::image("URL cannot be empty"));
        }
        if url.chars().any(|c| c.is_control()) {
            return Err(Error::image("URL contains control characters"));
        }

        if let Some(rest) = url.strip_prefix("data:") {
            let (mime, data) = rest
                .split_once(";base64,")
                .ok_or_else(|| Error::image("data URI must be of the form data:<mime>;base64,<data>"))?;
            validate_mime(mime)?;
            validate_base64(data)?;
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::image(
                "URL scheme must be http, https or data",
            ));
        }

        Ok(Self {
            url,
            detail: ImageDetail::default(),
        })
    }

    /// Create an image block from already encoded base64 data.
    pub fn from_base64(data: &str, mime_type: &str) -> Result<Self> {
        validate_mime(mime_type)?;
        validate_base64(data)?;

        if data.len() > LARGE_PAYLOAD_BYTES {
            tracing::warn!(
                "Large image payload ({} bytes of base64), the API may reject it",
                data.len()
            );
        }

        Ok(Self {
            url: format!("data:{};base64,{}", mime_type, data),
            detail: ImageDetail::default(),
        })
    }

    /// Create an image block from raw bytes, e.g. an uploaded file.
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::invalid_input("image file is empty"));
        }
        Self::from_base64(&encode_bytes(bytes), mime_type)
    }

    /// Read and encode an image file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = encode_image(path)?;
        if data.is_empty() {
            return Err(Error::invalid_input(format!(
                "image file is empty: {}",
                path.display()
            )));
        }
        Self::from_base64(&data, mime_type_for_path(path))
    }

    /// Set the detail level the model should use for this image.
    pub fn with_detail(mut self, detail: ImageDetail) -> Self {
        self.detail = detail;
        self
    }

    /// The `http(s)` URL or `data:` URI sent to the API.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Detail level, `low` unless set otherwise.
    pub fn detail(&self) -> ImageDetail {
        self.detail
    }

    /// URL shortened to 100 characters for log output
    pub(crate) fn display_url(&self) -> String {
        let total = self.url.chars().count();
        if total > 100 {
            let head: String = self.url.chars().take(100).collect();
            format!("{}... ({} chars)", head, total)
        } else {
            self.url.clone()
        }
    }
}

fn validate_mime(mime: &str) -> Result<()> {
    if mime
        .chars()
        .any(|c| c == ';' || c == ',' || c.is_whitespace() || c.is_control())
    {
        return Err(Error::image(format!(
            "MIME type contains an invalid character: {:?}",
            mime
        )));
    }
    if !mime.starts_with("image/") || mime.len() == "image/".len() {
        return Err(Error::image(format!(
            "MIME type must be image/<subtype>, got {:?}",
            mime
        )));
    }
    Ok(())
}

fn validate_base64(data: &str) -> Result<()> {
    if data.is_empty() {
        return Err(Error::image("base64 data cannot be empty"));
    }

    let body = data.trim_end_matches('=');
    if data.len() - body.len() > 2 {
        return Err(Error::image("base64 data has too much padding"));
    }
    if let Some(c) = body
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '+' || *c == '/'))
    {
        return Err(Error::image(format!(
            "base64 data contains an invalid character: {:?}",
            c
        )));
    }
    if data.len() % 4 != 0 {
        return Err(Error::image(format!(
            "base64 length must be a multiple of 4, got {}",
            data.len()
        )));
    }
    Ok(())
}
