use std::sync::Arc;

use prodlens_contracts::analysis::{
    AnalysisMode, FullReport, ImageAsset, MultilingualContent, ProductAnalysis,
};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::codec::encode_asset;
use crate::config::ProviderConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::extract::extract_json_payload;
use crate::normalize::{normalize_multilingual, normalize_product_analysis, Normalized};
use crate::prompts;
use crate::providers::{build_provider, ContentPart, VisionProvider, VisionRequest};

/// One pipeline invocation: the mode plus its inputs and parameters.
#[derive(Debug, Clone, Copy)]
pub enum AnalysisRequest<'a> {
    StructuredAnalysis {
        image: &'a ImageAsset,
        category: Option<&'a str>,
    },
    Comparison {
        first: &'a ImageAsset,
        second: &'a ImageAsset,
    },
    Ocr {
        image: &'a ImageAsset,
    },
    AltText {
        image: &'a ImageAsset,
        context: Option<&'a str>,
    },
    Multilingual {
        image: &'a ImageAsset,
        languages: &'a [String],
    },
}

impl AnalysisRequest<'_> {
    pub fn mode(&self) -> AnalysisMode {
        match self {
            Self::StructuredAnalysis { .. } => AnalysisMode::StructuredAnalysis,
            Self::Comparison { .. } => AnalysisMode::Comparison,
            Self::Ocr { .. } => AnalysisMode::Ocr,
            Self::AltText { .. } => AnalysisMode::AltText,
            Self::Multilingual { .. } => AnalysisMode::Multilingual,
        }
    }

    /// Images go before the task text. Comparison labels each image ahead of
    /// its data so the model can refer to them by name.
    pub fn to_vision_request(&self) -> VisionRequest {
        let mode = self.mode();
        let mut metadata = Map::new();
        let content = match *self {
            Self::StructuredAnalysis { image, category } => {
                metadata.insert("image".to_string(), json!(image.identity()));
                if let Some(category) = category {
                    metadata.insert("category".to_string(), json!(category));
                }
                vec![
                    ContentPart::Image(encode_asset(image)),
                    ContentPart::Text(prompts::structured_analysis(category)),
                ]
            }
            Self::Comparison { first, second } => {
                metadata.insert(
                    "images".to_string(),
                    json!([first.identity(), second.identity()]),
                );
                // Each label precedes the image it names.
                vec![
                    ContentPart::Text(prompts::COMPARISON_LABEL_A.to_string()),
                    ContentPart::Image(encode_asset(first)),
                    ContentPart::Text(prompts::COMPARISON_LABEL_B.to_string()),
                    ContentPart::Image(encode_asset(second)),
                    ContentPart::Text(prompts::comparison()),
                ]
            }
            Self::Ocr { image } => {
                metadata.insert("image".to_string(), json!(image.identity()));
                vec![
                    ContentPart::Image(encode_asset(image)),
                    ContentPart::Text(prompts::ocr()),
                ]
            }
            Self::AltText { image, context } => {
                metadata.insert("image".to_string(), json!(image.identity()));
                vec![
                    ContentPart::Image(encode_asset(image)),
                    ContentPart::Text(prompts::alt_text(context)),
                ]
            }
            Self::Multilingual { image, languages } => {
                metadata.insert("image".to_string(), json!(image.identity()));
                metadata.insert("languages".to_string(), json!(languages));
                vec![
                    ContentPart::Image(encode_asset(image)),
                    ContentPart::Text(prompts::multilingual(languages)),
                ]
            }
        };
        VisionRequest {
            mode,
            max_tokens: mode.max_tokens(),
            content,
            metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutput {
    Structured(Normalized<ProductAnalysis>),
    Multilingual(Normalized<MultilingualContent>),
    Text(String),
}

impl AnalysisOutput {
    /// JSON view used by the shell: structured results as objects, text
    /// results as a string.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Structured(normalized) => {
                serde_json::to_value(&normalized.value).unwrap_or(Value::Null)
            }
            Self::Multilingual(normalized) => {
                serde_json::to_value(&normalized.value).unwrap_or(Value::Null)
            }
            Self::Text(text) => Value::String(text.clone()),
        }
    }
}

/// Runs single-image and image-pair analyses against one provider. Holds no
/// per-call state, so one instance is shared by every batch worker.
pub struct AnalysisService {
    provider: Arc<dyn VisionProvider>,
}

impl AnalysisService {
    pub fn new(provider: Arc<dyn VisionProvider>) -> Self {
        Self { provider }
    }

    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        Ok(Self::new(build_provider(config)?))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn run(&self, request: &AnalysisRequest<'_>) -> AnalysisResult<AnalysisOutput> {
        let mode = request.mode();
        let reply = self.provider.complete(&request.to_vision_request())?;
        debug!(
            provider = self.provider.name(),
            model = %reply.model,
            %mode,
            input_tokens = ?reply.input_tokens,
            output_tokens = ?reply.output_tokens,
            "model reply received"
        );
        match *request {
            AnalysisRequest::StructuredAnalysis { image, .. } => {
                let normalized = normalize_product_analysis(extract_json_payload(&reply.text)?)?;
                if normalized.is_partial() {
                    warn!(
                        image = image.identity(),
                        missing = ?normalized.missing,
                        "structured reply omitted canonical fields"
                    );
                }
                Ok(AnalysisOutput::Structured(normalized))
            }
            AnalysisRequest::Multilingual { image, languages } => {
                let normalized =
                    normalize_multilingual(extract_json_payload(&reply.text)?, languages)?;
                if normalized.is_partial() {
                    warn!(
                        image = image.identity(),
                        missing = ?normalized.missing,
                        "multilingual reply skipped requested languages"
                    );
                }
                Ok(AnalysisOutput::Multilingual(normalized))
            }
            AnalysisRequest::Comparison { .. }
            | AnalysisRequest::Ocr { .. }
            | AnalysisRequest::AltText { .. } => Ok(AnalysisOutput::Text(reply.text)),
        }
    }

    pub fn analyze_product(
        &self,
        image: &ImageAsset,
        category: Option<&str>,
    ) -> AnalysisResult<ProductAnalysis> {
        Ok(self.analyze_product_detailed(image, category)?.value)
    }

    /// Like [`Self::analyze_product`] but keeps the list of canonical fields
    /// the reply left out.
    pub fn analyze_product_detailed(
        &self,
        image: &ImageAsset,
        category: Option<&str>,
    ) -> AnalysisResult<Normalized<ProductAnalysis>> {
        match self.run(&AnalysisRequest::StructuredAnalysis { image, category })? {
            AnalysisOutput::Structured(normalized) => Ok(normalized),
            other => unreachable_output(AnalysisMode::StructuredAnalysis, other),
        }
    }

    pub fn compare_products(
        &self,
        first: &ImageAsset,
        second: &ImageAsset,
    ) -> AnalysisResult<String> {
        self.run_text(&AnalysisRequest::Comparison { first, second })
    }

    pub fn extract_text(&self, image: &ImageAsset) -> AnalysisResult<String> {
        self.run_text(&AnalysisRequest::Ocr { image })
    }

    pub fn generate_alt_text(
        &self,
        image: &ImageAsset,
        context: Option<&str>,
    ) -> AnalysisResult<String> {
        self.run_text(&AnalysisRequest::AltText { image, context })
    }

    pub fn generate_multilingual(
        &self,
        image: &ImageAsset,
        languages: &[String],
    ) -> AnalysisResult<MultilingualContent> {
        match self.run(&AnalysisRequest::Multilingual { image, languages })? {
            AnalysisOutput::Multilingual(normalized) => Ok(normalized.value),
            other => unreachable_output(AnalysisMode::Multilingual, other),
        }
    }

    /// Structured analysis, alt text and OCR of one image. Stops at the first
    /// failing call.
    pub fn full_report(&self, image: &ImageAsset) -> AnalysisResult<FullReport> {
        let analysis = self.analyze_product(image, None)?;
        let alt_text = self.generate_alt_text(image, None)?;
        let extracted_text = self.extract_text(image)?;
        Ok(FullReport {
            analysis,
            alt_text,
            extracted_text,
        })
    }

    fn run_text(&self, request: &AnalysisRequest<'_>) -> AnalysisResult<String> {
        match self.run(request)? {
            AnalysisOutput::Text(text) => Ok(text),
            other => unreachable_output(request.mode(), other),
        }
    }
}

fn unreachable_output<T>(mode: AnalysisMode, output: AnalysisOutput) -> AnalysisResult<T> {
    Err(AnalysisError::malformed(
        format!("{mode} produced an unexpected output shape"),
        &output.to_json().to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use prodlens_contracts::analysis::{AnalysisMode, ImageAsset};
    use serde_json::json;

    use super::{AnalysisOutput, AnalysisRequest, AnalysisService};
    use crate::error::AnalysisError;
    use crate::providers::ContentPart;
    use crate::test_support::{Scripted, ScriptedProvider};

    const ANALYSIS_REPLY: &str = "Sure! Here you go:\n```json\n{\n  \"Product Type\": \"Running shoe\",\n  \"Category\": \"Footwear\",\n  \"Key Features\": [\"mesh upper\"],\n  \"Suggested Title\": \"Lightweight Trail Runner\",\n  \"confidence_score\": 0.82\n}\n```";

    fn shoe() -> ImageAsset {
        ImageAsset::new("shoe.jpg", b"shoe-bytes".to_vec())
    }

    fn service(provider: ScriptedProvider) -> (Arc<ScriptedProvider>, AnalysisService) {
        let provider = Arc::new(provider);
        (provider.clone(), AnalysisService::new(provider))
    }

    #[test]
    fn structured_analysis_extracts_and_normalizes() -> anyhow::Result<()> {
        let (provider, service) = service(ScriptedProvider::replying(ANALYSIS_REPLY));
        let detailed = service.analyze_product_detailed(&shoe(), Some("Footwear"))?;
        let analysis = &detailed.value;
        assert_eq!(analysis.product_type.as_deref(), Some("Running shoe"));
        assert_eq!(analysis.features, vec![json!("mesh upper")]);
        assert_eq!(analysis.suggested_title.as_deref(), Some("Lightweight Trail Runner"));
        assert_eq!(analysis.confidence_score, Some(0.82));
        assert!(analysis.colors.is_empty());
        assert!(detailed.missing.contains(&"colors".to_string()));

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].mode, AnalysisMode::StructuredAnalysis);
        assert_eq!(requests[0].max_tokens, 2000);
        assert!(matches!(requests[0].content[0], ContentPart::Image(_)));
        match &requests[0].content[1] {
            ContentPart::Text(text) => assert!(text.contains("Product Category: Footwear")),
            other => panic!("expected task text, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn comparison_labels_precede_each_image() -> anyhow::Result<()> {
        let (provider, service) = service(ScriptedProvider::replying("Both are sneakers."));
        let bag = ImageAsset::new("bag.png", b"bag".to_vec());
        let text = service.compare_products(&shoe(), &bag)?;
        assert_eq!(text, "Both are sneakers.");

        let request = &provider.requests()[0];
        assert_eq!(request.max_tokens, 1500);
        let shape: Vec<String> = request
            .content
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) if text.starts_with("Image ") => text.clone(),
                ContentPart::Text(_) => "instruction".to_string(),
                ContentPart::Image(image) => image.media_type.mime().to_string(),
            })
            .collect();
        assert_eq!(
            shape,
            vec!["Image A:", "image/jpeg", "Image B:", "image/png", "instruction"]
        );
        Ok(())
    }

    #[test]
    fn text_modes_return_reply_verbatim() -> anyhow::Result<()> {
        let reply = "```json\n{\"not\": \"parsed\"}\n```";
        let (provider, service) = service(ScriptedProvider::replying(reply));
        assert_eq!(service.extract_text(&shoe())?, reply);
        assert_eq!(service.generate_alt_text(&shoe(), None)?, reply);
        let ceilings: Vec<u32> = provider
            .requests()
            .iter()
            .map(|request| request.max_tokens)
            .collect();
        assert_eq!(ceilings, vec![2000, 500]);
        Ok(())
    }

    #[test]
    fn multilingual_keeps_only_returned_languages() -> anyhow::Result<()> {
        let reply = "```json\n{\"EN\": {\"Title\": \"Sneaker\", \"key_features\": [\"light\"]}}\n```";
        let (provider, service) = service(ScriptedProvider::replying(reply));
        let languages = vec!["en".to_string(), "fr".to_string()];
        let content = service.generate_multilingual(&shoe(), &languages)?;
        assert_eq!(content.codes().collect::<Vec<_>>(), vec!["en"]);
        assert!(content.get("fr").is_none());
        let en = content.get("en").cloned().unwrap_or_default();
        assert_eq!(en.features, vec![json!("light")]);

        let request = &provider.requests()[0];
        assert_eq!(request.max_tokens, 3000);
        assert_eq!(request.metadata["languages"], json!(["en", "fr"]));
        Ok(())
    }

    #[test]
    fn unparseable_structured_reply_is_malformed() {
        let (_, service) = service(ScriptedProvider::replying(
            "I'm unable to analyze this image.",
        ));
        assert!(matches!(
            service.analyze_product(&shoe(), None),
            Err(AnalysisError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn provider_errors_propagate_unchanged() {
        let provider = ScriptedProvider::replying(ANALYSIS_REPLY).on_image(
            b"shoe-bytes",
            Scripted::Fail(|| AnalysisError::auth("scripted", "invalid x-api-key")),
        );
        let (_, service) = service(provider);
        let err = service.analyze_product(&shoe(), None).err();
        assert!(matches!(err, Some(AnalysisError::AuthFailure { .. })));
    }

    #[test]
    fn full_report_runs_three_modes_in_order() -> anyhow::Result<()> {
        let (provider, service) = service(ScriptedProvider::replying(ANALYSIS_REPLY));
        let report = service.full_report(&shoe())?;
        assert_eq!(report.analysis.category.as_deref(), Some("Footwear"));
        assert_eq!(report.alt_text, ANALYSIS_REPLY);
        let modes: Vec<AnalysisMode> = provider
            .requests()
            .iter()
            .map(|request| request.mode)
            .collect();
        assert_eq!(
            modes,
            vec![
                AnalysisMode::StructuredAnalysis,
                AnalysisMode::AltText,
                AnalysisMode::Ocr
            ]
        );
        Ok(())
    }

    #[test]
    fn run_dispatches_by_request_mode() -> anyhow::Result<()> {
        let (_, service) = service(ScriptedProvider::replying("plain text"));
        let image = shoe();
        let output = service.run(&AnalysisRequest::Ocr { image: &image })?;
        assert_eq!(output, AnalysisOutput::Text("plain text".to_string()));
        assert_eq!(output.to_json(), json!("plain text"));
        Ok(())
    }
}
