use std::env;
use std::time::Duration;

pub const DEFAULT_PROVIDER: &str = "anthropic";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Everything a provider needs to reach its endpoint. Built once by the
/// caller and handed to the provider constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider: String,
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub request_timeout: Duration,
    /// Extra attempts after a transport failure. Zero keeps single-shot calls.
    pub transport_retries: usize,
    /// Linear backoff unit; attempt `n` sleeps `n * retry_backoff`.
    pub retry_backoff: Duration,
}

impl ProviderConfig {
    pub fn anthropic(api_key: Option<String>) -> Self {
        Self {
            provider: "anthropic".to_string(),
            api_key,
            api_base: DEFAULT_ANTHROPIC_API_BASE.to_string(),
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            request_timeout: Duration::from_secs(120),
            transport_retries: 0,
            retry_backoff: Duration::from_millis(1200),
        }
    }

    pub fn openai(api_key: Option<String>) -> Self {
        Self {
            provider: "openai".to_string(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            ..Self::anthropic(api_key)
        }
    }

    pub fn dryrun() -> Self {
        Self {
            provider: "dryrun".to_string(),
            api_base: String::new(),
            model: "dryrun-vision-1".to_string(),
            ..Self::anthropic(None)
        }
    }

    /// Reads provider settings from the environment. Blank values count as
    /// unset and numeric values are clamped.
    pub fn from_env() -> Self {
        let provider = first_non_empty_env(&["PRODLENS_PROVIDER"])
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
        Self::from_env_for(&provider)
    }

    /// Same as [`Self::from_env`] with the provider name fixed by the caller.
    pub fn from_env_for(provider: &str) -> Self {
        let provider = provider.trim().to_ascii_lowercase();
        let mut config = match provider.as_str() {
            "openai" => {
                let mut config = Self::openai(first_non_empty_env(&[
                    "OPENAI_API_KEY",
                    "OPENAI_API_KEY_BACKUP",
                ]));
                if let Some(base) = first_non_empty_env(&["OPENAI_API_BASE", "OPENAI_BASE_URL"]) {
                    config.api_base = normalize_api_base(&base);
                }
                config
            }
            "dryrun" => Self::dryrun(),
            _ => {
                let mut config = Self::anthropic(first_non_empty_env(&["ANTHROPIC_API_KEY"]));
                config.provider = provider.clone();
                if let Some(base) = first_non_empty_env(&["ANTHROPIC_API_BASE"]) {
                    config.api_base = normalize_api_base(&base);
                }
                config
            }
        };

        if let Some(model) = first_non_empty_env(&["PRODLENS_MODEL"]) {
            config.model = model;
        }
        if let Some(raw) = first_non_empty_env(&["PRODLENS_TRANSPORT_RETRIES"]) {
            config.transport_retries = parse_clamped(&raw, 0.0, 0.0, 5.0).round() as usize;
        }
        if let Some(raw) = first_non_empty_env(&["PRODLENS_RETRY_BACKOFF"]) {
            config.retry_backoff = Duration::from_secs_f64(parse_clamped(&raw, 1.2, 0.1, 10.0));
        }
        if let Some(raw) = first_non_empty_env(&["PRODLENS_REQUEST_TIMEOUT"]) {
            config.request_timeout =
                Duration::from_secs_f64(parse_clamped(&raw, 120.0, 5.0, 600.0));
        }
        config
    }
}

pub(crate) fn first_non_empty_env(keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Ok(value) = env::var(key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn normalize_api_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn parse_clamped(raw: &str, default: f64, min: f64, max: f64) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(default)
        .clamp(min, max)
}
