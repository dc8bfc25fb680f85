use thiserror::Error;
use url::Url;

use crate::autocomplete::AutocompleteConfig;
use crate::fetch::Threshold;

pub const ENV_BACKEND_URL: &str = "PROTMAP_BACKEND_URL";
pub const ENV_BACKEND_URL_LEGACY: &str = "NEXT_PUBLIC_BACKEND_URL";
pub const ENV_TIMEOUT_MS: &str = "PROTMAP_TIMEOUT_MS";
pub const ENV_NETWORK_TOPK: &str = "PROTMAP_NETWORK_TOPK";
pub const ENV_DEFAULT_THRESHOLD: &str = "PROTMAP_DEFAULT_THRESHOLD";

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8001";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const MIN_TIMEOUT_MS: u64 = 250;
pub const DEFAULT_NETWORK_TOPK: u16 = 10;
pub const MAX_NETWORK_TOPK: u16 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("backend url is required")]
    EmptyBackendUrl,
    #[error("{variable}: backend url must be an http(s) url with a host, got {value:?}")]
    InvalidBackendUrl {
        variable: &'static str,
        value: String,
    },
    #[error("{variable}: timeout must be a whole number of milliseconds >= 250, got {value:?}")]
    InvalidTimeout {
        variable: &'static str,
        value: String,
    },
    #[error("{variable}: network top-k must be between 1 and 100, got {value:?}")]
    InvalidNetworkTopK {
        variable: &'static str,
        value: String,
    },
    #[error("{variable}: threshold must be a 0.1 step between 0.0 and 1.0, got {value:?}")]
    InvalidThreshold {
        variable: &'static str,
        value: String,
    },
}

/// Settings shared by the core views and the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserConfig {
    pub backend_url: String,
    /// Which variable (or `"default_local"`) supplied `backend_url`.
    pub backend_url_source: &'static str,
    pub timeout_ms: u64,
    pub network_top_k: u16,
    pub default_threshold: Threshold,
    pub autocomplete: AutocompleteConfig,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            backend_url_source: "default_local",
            timeout_ms: DEFAULT_TIMEOUT_MS,
            network_top_k: DEFAULT_NETWORK_TOPK,
            default_threshold: Threshold::DEFAULT,
            autocomplete: AutocompleteConfig::default(),
        }
    }
}

impl BrowserConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves every setting through `lookup`, falling back to defaults for unset or
    /// blank variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let (backend_url, backend_url_source) = if let Some(raw) = value(ENV_BACKEND_URL) {
            (normalize_backend_url(ENV_BACKEND_URL, &raw)?, ENV_BACKEND_URL)
        } else if let Some(raw) = value(ENV_BACKEND_URL_LEGACY) {
            (
                normalize_backend_url(ENV_BACKEND_URL_LEGACY, &raw)?,
                ENV_BACKEND_URL_LEGACY,
            )
        } else {
            (DEFAULT_BACKEND_URL.to_string(), "default_local")
        };

        let mut config = Self {
            backend_url,
            backend_url_source,
            ..Self::default()
        };
        if let Some(raw) = value(ENV_TIMEOUT_MS) {
            config.timeout_ms = parse_timeout_ms(ENV_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = value(ENV_NETWORK_TOPK) {
            config.network_top_k = parse_network_top_k(ENV_NETWORK_TOPK, &raw)?;
        }
        if let Some(raw) = value(ENV_DEFAULT_THRESHOLD) {
            config.default_threshold = parse_threshold(ENV_DEFAULT_THRESHOLD, &raw)?;
        }
        Ok(config)
    }
}

/// Trims, drops trailing slashes and requires an http(s) scheme with a host.
pub fn normalize_backend_url(variable: &'static str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBackendUrl);
    }
    let invalid = || ConfigError::InvalidBackendUrl {
        variable,
        value: raw.to_string(),
    };
    let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }
    Ok(trimmed.to_string())
}

pub fn parse_timeout_ms(variable: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|timeout| *timeout >= MIN_TIMEOUT_MS)
        .ok_or_else(|| ConfigError::InvalidTimeout {
            variable,
            value: raw.to_string(),
        })
}

pub fn parse_network_top_k(variable: &'static str, raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|top_k| (1..=MAX_NETWORK_TOPK).contains(top_k))
        .ok_or_else(|| ConfigError::InvalidNetworkTopK {
            variable,
            value: raw.to_string(),
        })
}

pub fn parse_threshold(variable: &'static str, raw: &str) -> Result<Threshold, ConfigError> {
    Threshold::parse(raw).ok_or_else(|| ConfigError::InvalidThreshold {
        variable,
        value: raw.to_string(),
    })
}
