use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    http_client, require_api_key, response_json_or_error, send_error, value_as_u64,
    with_transport_retries, ContentPart, VisionProvider, VisionReply, VisionRequest,
};
use crate::config::ProviderConfig;
use crate::error::{AnalysisError, AnalysisResult};

/// Responses API transport. Images travel as data URLs.
pub struct OpenAiProvider {
    config: ProviderConfig,
    http: HttpClient,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> AnalysisResult<Self> {
        let http = http_client(&config)?;
        Ok(Self { config, http })
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.config.api_base.trim_end_matches('/'))
    }
}

impl VisionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn complete(&self, request: &VisionRequest) -> AnalysisResult<VisionReply> {
        let api_key = require_api_key(&self.config)?;
        let payload = build_responses_payload(&self.config.model, request);
        let endpoint = self.endpoint();
        debug!(
            provider = self.name(),
            mode = %request.mode,
            images = request.images().count(),
            "sending vision request"
        );
        let response = with_transport_retries(&self.config, || {
            let response = self
                .http
                .post(&endpoint)
                .bearer_auth(api_key)
                .json(&payload)
                .send()
                .map_err(|err| send_error(self.name(), &endpoint, err))?;
            response_json_or_error(self.name(), response)
        })?;
        parse_responses_reply(&self.config.model, &response)
    }
}

pub(crate) fn build_responses_payload(model: &str, request: &VisionRequest) -> Value {
    let content: Vec<Value> = request
        .content
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => json!({"type": "input_text", "text": text}),
            ContentPart::Image(image) => json!({
                "type": "input_image",
                "image_url": image.data_url(),
            }),
        })
        .collect();
    json!({
        "model": model,
        "input": [{"role": "user", "content": content}],
        "max_output_tokens": request.max_tokens,
    })
}

/// Prefers the convenience `output_text` field and falls back to walking
/// `output[*].content[*]` for text parts.
fn extract_output_text(response: &Value) -> Option<String> {
    if let Some(text) = response
        .get("output_text")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
    {
        return Some(text.to_string());
    }
    let mut parts = Vec::new();
    for item in response.get("output")?.as_array()? {
        let Some(content) = item.get("content").and_then(Value::as_array) else {
            continue;
        };
        for part in content {
            let kind = part.get("type").and_then(Value::as_str).unwrap_or_default();
            if !matches!(kind, "output_text" | "text") {
                continue;
            }
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                parts.push(text);
            }
        }
    }
    let joined = parts.join("");
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}

pub(crate) fn parse_responses_reply(
    requested_model: &str,
    response: &Value,
) -> AnalysisResult<VisionReply> {
    let text = extract_output_text(response).ok_or_else(|| {
        AnalysisError::malformed("openai reply carried no output text", &response.to_string())
    })?;
    let usage = response.get("usage");
    Ok(VisionReply {
        text,
        model: response
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(requested_model)
            .to_string(),
        input_tokens: value_as_u64(usage.and_then(|usage| usage.get("input_tokens"))),
        output_tokens: value_as_u64(usage.and_then(|usage| usage.get("output_tokens"))),
    })
}
