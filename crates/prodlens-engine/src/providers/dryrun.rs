use prodlens_contracts::analysis::AnalysisMode;
use serde_json::{json, Map, Value};

use super::{VisionProvider, VisionReply, VisionRequest};
use crate::error::AnalysisResult;

/// Offline provider that answers every mode with a fixed, well-formed reply.
/// Useful for wiring checks and local batch runs without credentials.
pub struct DryrunProvider {
    model: String,
}

impl DryrunProvider {
    pub fn new(model: String) -> Self {
        Self { model }
    }
}

impl VisionProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn complete(&self, request: &VisionRequest) -> AnalysisResult<VisionReply> {
        let text = match request.mode {
            AnalysisMode::StructuredAnalysis => fenced(&canned_analysis(&request.metadata)),
            AnalysisMode::Multilingual => fenced(&canned_listings(&request.metadata)),
            AnalysisMode::Comparison => {
                "Both images show a similar product. Differences could not be assessed in dry-run mode."
                    .to_string()
            }
            AnalysisMode::Ocr => "No visible text found.".to_string(),
            AnalysisMode::AltText => {
                "1. Product photo on a plain background\n2. Product shown in full view\n3. Close-up product image"
                    .to_string()
            }
        };
        Ok(VisionReply {
            text,
            model: self.model.clone(),
            input_tokens: Some(0),
            output_tokens: Some(0),
        })
    }
}

fn fenced(value: &Value) -> String {
    format!(
        "Dry-run reply.\n```json\n{}\n```",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    )
}

fn canned_analysis(metadata: &Map<String, Value>) -> Value {
    let category = metadata
        .get("category")
        .and_then(Value::as_str)
        .unwrap_or("Unknown");
    json!({
        "product_type": "Unidentified product",
        "category": category,
        "features": [],
        "colors": [],
        "materials": [],
        "condition": "unknown",
        "defects": [],
        "suggested_title": "Product listing",
        "suggested_description": "Dry-run analysis; no model was called.",
        "key_selling_points": [],
        "target_audience": "general",
        "comparable_products": [],
        "confidence_score": 0.0,
    })
}

fn canned_listings(metadata: &Map<String, Value>) -> Value {
    let mut listings = Map::new();
    let codes = metadata
        .get("languages")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    for code in codes {
        listings.insert(
            code.to_string(),
            json!({
                "title": format!("Product listing ({code})"),
                "description": "Dry-run listing.",
                "features": [],
            }),
        );
    }
    Value::Object(listings)
}
