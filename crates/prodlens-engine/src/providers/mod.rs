use std::sync::Arc;
use std::thread;

use anyhow::bail;
use prodlens_contracts::analysis::{AnalysisMode, EncodedImage};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use reqwest::StatusCode;
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::ProviderConfig;
use crate::error::{truncate_text, AnalysisError, AnalysisResult};

mod anthropic;
mod dryrun;
mod openai;

pub use anthropic::AnthropicProvider;
pub use dryrun::DryrunProvider;
pub use openai::OpenAiProvider;

/// One segment of a vision request, sent in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    Image(EncodedImage),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisionRequest {
    pub mode: AnalysisMode,
    pub max_tokens: u32,
    pub content: Vec<ContentPart>,
    pub metadata: Map<String, Value>,
}

impl VisionRequest {
    pub fn images(&self) -> impl Iterator<Item = &EncodedImage> {
        self.content.iter().filter_map(|part| match part {
            ContentPart::Image(image) => Some(image),
            ContentPart::Text(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisionReply {
    pub text: String,
    pub model: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// A vision-capable model endpoint: images and text in, one text reply out.
pub trait VisionProvider: Send + Sync {
    fn name(&self) -> &str;
    fn complete(&self, request: &VisionRequest) -> AnalysisResult<VisionReply>;
}

pub const PROVIDER_NAMES: &[&str] = &["anthropic", "dryrun", "openai"];

/// Builds the provider named by `config.provider`.
pub fn build_provider(config: &ProviderConfig) -> anyhow::Result<Arc<dyn VisionProvider>> {
    let provider: Arc<dyn VisionProvider> = match config.provider.as_str() {
        "anthropic" => Arc::new(AnthropicProvider::new(config.clone())?),
        "openai" => Arc::new(OpenAiProvider::new(config.clone())?),
        "dryrun" => Arc::new(DryrunProvider::new(config.model.clone())),
        other => bail!(
            "unknown provider '{other}' (expected one of: {})",
            PROVIDER_NAMES.join(", ")
        ),
    };
    Ok(provider)
}

pub(crate) fn http_client(config: &ProviderConfig) -> AnalysisResult<HttpClient> {
    HttpClient::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|err| {
            AnalysisError::transport(
                &config.provider,
                None,
                format!("http client setup failed: {err}"),
            )
        })
}

pub(crate) fn require_api_key<'a>(config: &'a ProviderConfig) -> AnalysisResult<&'a str> {
    config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| AnalysisError::auth(&config.provider, "API key not configured"))
}

pub(crate) fn send_error(provider: &str, endpoint: &str, err: reqwest::Error) -> AnalysisError {
    let detail = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    AnalysisError::transport(provider, None, format!("{detail} ({endpoint}): {err}"))
}

/// Classifies an HTTP reply: 401/403 are credential problems, any other
/// non-success status is a transport failure, and a success body that is
/// not JSON is malformed.
pub(crate) fn response_json_or_error(
    provider: &str,
    response: HttpResponse,
) -> AnalysisResult<Value> {
    let status = response.status();
    let body = response.text().map_err(|err| {
        AnalysisError::transport(
            provider,
            Some(status.as_u16()),
            format!("response body read failed: {err}"),
        )
    })?;
    classify_response(provider, status, &body)
}

pub(crate) fn classify_response(
    provider: &str,
    status: StatusCode,
    body: &str,
) -> AnalysisResult<Value> {
    let code = status.as_u16();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(AnalysisError::auth(
            provider,
            format!("request rejected ({code}): {}", truncate_text(body, 512)),
        ));
    }
    if !status.is_success() {
        return Err(AnalysisError::transport(
            provider,
            Some(code),
            format!("request failed ({code}): {}", truncate_text(body, 512)),
        ));
    }
    serde_json::from_str(body).map_err(|err| {
        AnalysisError::malformed(
            format!("{provider} returned invalid JSON envelope: {err}"),
            body,
        )
    })
}

/// Runs `attempt` once, then again after each transport failure while
/// retries remain. Other error kinds return immediately.
pub(crate) fn with_transport_retries<T>(
    config: &ProviderConfig,
    mut attempt: impl FnMut() -> AnalysisResult<T>,
) -> AnalysisResult<T> {
    let mut retries_used = 0usize;
    loop {
        match attempt() {
            Err(err) if err.is_transport() && retries_used < config.transport_retries => {
                retries_used += 1;
                warn!(
                    provider = %config.provider,
                    attempt = retries_used,
                    max = config.transport_retries,
                    error = %err,
                    "transport retry after transient failure"
                );
                thread::sleep(config.retry_backoff * retries_used as u32);
            }
            other => return other,
        }
    }
}

pub(crate) fn value_as_u64(value: Option<&Value>) -> Option<u64> {
    value.and_then(Value::as_u64)
}
