//! Task text sent after the image parts of each request.

pub const DEFAULT_CATEGORY_HINT: &str = "Unknown";
pub const DEFAULT_ALT_TEXT_CONTEXT: &str = "Product image for e-commerce";
pub const COMPARISON_LABEL_A: &str = "Image A:";
pub const COMPARISON_LABEL_B: &str = "Image B:";

const STRUCTURED_SCHEMA: &str = r#"{
  "product_type": "",
  "category": "",
  "features": [],
  "colors": [],
  "materials": [],
  "condition": "",
  "defects": [],
  "suggested_title": "",
  "suggested_description": "",
  "key_selling_points": [],
  "target_audience": "",
  "comparable_products": [],
  "confidence_score": 0.0
}"#;

pub fn structured_analysis(category: Option<&str>) -> String {
    let category = non_blank(category).unwrap_or(DEFAULT_CATEGORY_HINT);
    format!(
        "Analyze this product image and provide detailed information in JSON format.\n\
         Product Category: {category}\n\
         Extract:\n\
         1. Product type and category\n\
         2. Key features (visible attributes)\n\
         3. Colors (all visible colors)\n\
         4. Materials (if identifiable)\n\
         5. Condition assessment (new/used, any defects)\n\
         6. Suggested title (engaging product title)\n\
         7. Suggested description (2-3 sentences)\n\
         8. Key selling points (3-5 bullet points)\n\
         9. Target audience\n\
         10. Comparable products\n\
         Format as valid JSON with these fields:\n\
         {STRUCTURED_SCHEMA}"
    )
}

pub fn comparison() -> String {
    "Compare these two product images and provide:\n\
     1. Similarities (what's the same)\n\
     2. Differences (what's different)\n\
     3. Quality assessment (which image is better for e-commerce and why)\n\
     4. Recommendations (suggested improvements)\n\
     Be specific and detailed."
        .to_string()
}

pub fn ocr() -> String {
    "Extract ALL text visible in this image.\n\
     Maintain formatting where possible.\n\
     Include product names, brand names, instructions, warnings, specifications \
     and any other text.\n\
     Output as plain text, maintaining structure."
        .to_string()
}

pub fn alt_text(context: Option<&str>) -> String {
    let context = non_blank(context).unwrap_or(DEFAULT_ALT_TEXT_CONTEXT);
    format!(
        "Generate accessibility alt text for this image.\n\
         Context: {context}\n\
         Requirements:\n\
         - Concise (50-125 characters)\n\
         - Descriptive of key visual elements\n\
         - Useful for screen readers\n\
         - SEO-friendly\n\
         Provide 3 options:\n\
         1. Short (for quick scanning)\n\
         2. Medium (balanced)\n\
         3. Long (detailed)"
    )
}

pub fn multilingual(languages: &[String]) -> String {
    let joined = languages.join(", ");
    format!(
        "Analyze this product image and provide information in these languages: {joined}\n\
         For EACH language, provide:\n\
         1. Product title (optimized for that market)\n\
         2. Product description (2-3 sentences, culturally appropriate)\n\
         3. Key features (3-5 bullet points)\n\
         Format as JSON keyed by lowercase language code:\n\
         {{\n  \"en\": {{\"title\": \"\", \"description\": \"\", \"features\": []}}\n}}\n\
         Ensure natural phrasing for each language."
    )
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
