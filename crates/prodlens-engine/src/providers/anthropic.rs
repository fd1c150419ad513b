use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    http_client, require_api_key, response_json_or_error, send_error, value_as_u64,
    with_transport_retries, ContentPart, VisionProvider, VisionReply, VisionRequest,
};
use crate::config::ProviderConfig;
use crate::error::{AnalysisError, AnalysisResult};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API transport with base64 image blocks.
pub struct AnthropicProvider {
    config: ProviderConfig,
    http: HttpClient,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> AnalysisResult<Self> {
        let http = http_client(&config)?;
        Ok(Self { config, http })
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.config.api_base.trim_end_matches('/'))
    }

    fn post_messages(&self, api_key: &str, payload: &Value) -> AnalysisResult<Value> {
        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(payload)
            .send()
            .map_err(|err| send_error(self.name(), &endpoint, err))?;
        response_json_or_error(self.name(), response)
    }
}

impl VisionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn complete(&self, request: &VisionRequest) -> AnalysisResult<VisionReply> {
        let api_key = require_api_key(&self.config)?;
        let payload = build_messages_payload(&self.config.model, request);
        debug!(
            provider = self.name(),
            mode = %request.mode,
            max_tokens = request.max_tokens,
            "sending vision request"
        );
        let response = with_transport_retries(&self.config, || {
            self.post_messages(api_key, &payload)
        })?;
        parse_messages_reply(&self.config.model, &response)
    }
}

pub(crate) fn build_messages_payload(model: &str, request: &VisionRequest) -> Value {
    let content: Vec<Value> = request
        .content
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => json!({"type": "text", "text": text}),
            ContentPart::Image(image) => json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.media_type.mime(),
                    "data": image.data,
                },
            }),
        })
        .collect();
    json!({
        "model": model,
        "max_tokens": request.max_tokens,
        "messages": [{
            "role": "user",
            "content": content,
        }],
    })
}

pub(crate) fn parse_messages_reply(
    requested_model: &str,
    response: &Value,
) -> AnalysisResult<VisionReply> {
    let blocks = response
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            AnalysisError::malformed(
                "anthropic reply has no content blocks",
                &response.to_string(),
            )
        })?;
    let text = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect::<Vec<&str>>()
        .join("");
    if text.trim().is_empty() {
        return Err(AnalysisError::malformed(
            "anthropic reply carried no text",
            &response.to_string(),
        ));
    }
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
