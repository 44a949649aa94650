//! Client configuration.
//!
//! One `ClientConfig` drives the notes API client, the auth client, and the
//! autosave debounce window.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 800;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_BASE: &str = "INKFUSION_API_BASE";
pub const ENV_AUTOSAVE_MS: &str = "INKFUSION_AUTOSAVE_MS";
pub const ENV_TIMEOUT_SECS: &str = "INKFUSION_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            autosave_debounce_ms: DEFAULT_AUTOSAVE_DEBOUNCE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Optional overrides layered on top of the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub autosave_debounce_ms: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Read overrides from `INKFUSION_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            api_base_url: normalize_text_option(lookup(ENV_API_BASE)),
            autosave_debounce_ms: parse_number(ENV_AUTOSAVE_MS, lookup(ENV_AUTOSAVE_MS))?,
            request_timeout_secs: parse_number(ENV_TIMEOUT_SECS, lookup(ENV_TIMEOUT_SECS))?,
        })
    }

    /// Fill unset values from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            api_base_url: normalize_text_option(self.api_base_url)
                .or_else(|| normalize_text_option(fallback.api_base_url)),
            autosave_debounce_ms: self.autosave_debounce_ms.or(fallback.autosave_debounce_ms),
            request_timeout_secs: self.request_timeout_secs.or(fallback.request_timeout_secs),
        }
    }
}

impl ClientConfig {
    /// Apply overrides to the defaults and validate the result.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            api_base_url: overrides.api_base_url.unwrap_or(defaults.api_base_url),
            autosave_debounce_ms: overrides
                .autosave_debounce_ms
                .unwrap_or(defaults.autosave_debounce_ms),
            request_timeout_secs: overrides
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
        };
        config.validated()
    }

    /// Defaults overridden by the environment.
    pub fn from_env() -> Result<Self> {
        Self::resolve(ConfigOverrides::from_env()?)
    }

    /// Normalize the base URL and reject unusable values.
    pub fn validated(mut self) -> Result<Self> {
        self.api_base_url = normalize_base_url(&self.api_base_url)?;
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }

    #[must_use]
    pub const fn autosave_window(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Trim a base URL, drop trailing slashes, and require an http(s) scheme.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let base = raw.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(Error::Config("API base URL must not be empty".to_string()));
    }
    if !is_http_url(base) {
        return Err(Error::Config(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    Ok(base.to_string())
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_autosave_debounce_ms() -> u64 {
    DEFAULT_AUTOSAVE_DEBOUNCE_MS
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn parse_number(key: &str, raw: Option<String>) -> Result<Option<u64>> {
    normalize_text_option(raw)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|error| Error::Config(format!("{key} must be a whole number: {error}")))
        })
        .transpose()
}
