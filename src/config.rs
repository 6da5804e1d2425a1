//! Configuration for the QC client
//!
//! Options are assembled with [`QcOptions::builder`] or read from the
//! environment with [`QcOptions::from_env`], which also loads a `.env` file
//! if one is found in the working directory or any parent.

use crate::image::ImageDetail;
use crate::prompts::SYSTEM_PROMPT;
use crate::retry::RetryConfig;
use crate::{Error, Result};
use std::str::FromStr;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 300;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_MODEL: &str = "QC_MODEL";
pub const ENV_MAX_TOKENS: &str = "QC_MAX_TOKENS";
pub const ENV_DETAIL: &str = "QC_DETAIL";
pub const ENV_TIMEOUT: &str = "QC_TIMEOUT_SECS";
pub const ENV_MAX_ATTEMPTS: &str = "QC_MAX_ATTEMPTS";

/// Options for talking to the completion API
#[derive(Clone)]
pub struct QcOptions {
    /// System instruction placed before the user prompt
    pub system_prompt: String,

    /// Model name (e.g., "gpt-4o")
    pub model: String,

    /// OpenAI-compatible endpoint URL, without trailing slash
    pub base_url: String,

    /// Bearer token
    pub api_key: String,

    /// Maximum tokens to generate (None uses provider default)
    pub max_tokens: Option<u32>,

    /// Sampling temperature; not sent when unset
    pub temperature: Option<f32>,

    /// Detail level for both images
    pub detail: ImageDetail,

    /// Request timeout in seconds
    pub timeout: u64,

    pub retry: RetryConfig,
}

impl std::fmt::Debug for QcOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QcOptions")
            .field("system_prompt", &self.system_prompt)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("detail", &self.detail)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl QcOptions {
    /// Create a new builder for QcOptions
    pub fn builder() -> QcOptionsBuilder {
        QcOptionsBuilder::default()
    }

    /// Load options from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::config(format!("Failed to load .env: {}", e))),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load options through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(key) = lookup(ENV_API_KEY) {
            builder = builder.api_key(key);
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            builder = builder.base_url(url);
        }
        if let Some(model) = lookup(ENV_MODEL) {
            builder = builder.model(model);
        }
        if let Some(tokens) = parse_var::<u32>(&lookup, ENV_MAX_TOKENS)? {
            builder = builder.max_tokens(tokens);
        }
        if let Some(detail) = lookup(ENV_DETAIL) {
            let detail = detail
                .parse::<ImageDetail>()
                .map_err(|e| Error::config(format!("{}: {}", ENV_DETAIL, e)))?;
            builder = builder.detail(detail);
        }
        if let Some(timeout) = parse_var::<u64>(&lookup, ENV_TIMEOUT)? {
            builder = builder.timeout(timeout);
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, ENV_MAX_ATTEMPTS)? {
            builder = builder.retry(RetryConfig::default().with_max_attempts(attempts));
        }

        builder.build()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub fn detail(&self) -> ImageDetail {
        self.detail
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::config(format!("{}={:?}: {}", key, raw, e))),
    }
}

/// Builder for QcOptions
#[derive(Default)]
pub struct QcOptionsBuilder {
    system_prompt: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    detail: Option<ImageDetail>,
    timeout: Option<u64>,
    retry: Option<RetryConfig>,
}

impl std::fmt::Debug for QcOptionsBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QcOptionsBuilder")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl QcOptionsBuilder {
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn detail(mut self, detail: ImageDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn build(self) -> Result<QcOptions> {
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::config(format!("{} is required", ENV_API_KEY)))?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::config(format!(
                "base_url must be an http(s) URL, got {:?}",
                base_url
            )));
        }

        if let Some(temp) = self.temperature {
            if !(0.0..=2.0).contains(&temp) {
                return Err(Error::config(format!(
                    "temperature must be between 0.0 and 2.0, got {}",
                    temp
                )));
            }
        }

        Ok(QcOptions {
            system_prompt: self
                .system_prompt
                .unwrap_or_else(|| SYSTEM_PROMPT.to_string()),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url,
            api_key,
            max_tokens: self.max_tokens.or(Some(DEFAULT_MAX_TOKENS)),
            temperature: self.temperature,
            detail: self.detail.unwrap_or_default(),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
            retry: self
                .retry
                .unwrap_or_else(|| RetryConfig::default().with_max_attempts(1)),
        })
    }
}
