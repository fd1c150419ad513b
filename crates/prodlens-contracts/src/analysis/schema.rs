use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Alias table applied after key normalization: `(alias, canonical)`.
/// An alias only fills the canonical slot when the canonical key is absent.
pub const FEATURE_ALIASES: &[(&str, &str)] = &[("key_features", "features")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    ProductType,
    Category,
    Features,
    Colors,
    Materials,
    Condition,
    Defects,
    SuggestedTitle,
    SuggestedDescription,
    KeySellingPoints,
    TargetAudience,
    ComparableProducts,
    ConfidenceScore,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 13] = [
        CanonicalField::ProductType,
        CanonicalField::Category,
        CanonicalField::Features,
        CanonicalField::Colors,
        CanonicalField::Materials,
        CanonicalField::Condition,
        CanonicalField::Defects,
        CanonicalField::SuggestedTitle,
        CanonicalField::SuggestedDescription,
        CanonicalField::KeySellingPoints,
        CanonicalField::TargetAudience,
        CanonicalField::ComparableProducts,
        CanonicalField::ConfidenceScore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductType => "product_type",
            Self::Category => "category",
            Self::Features => "features",
            Self::Colors => "colors",
            Self::Materials => "materials",
            Self::Condition => "condition",
            Self::Defects => "defects",
            Self::SuggestedTitle => "suggested_title",
            Self::SuggestedDescription => "suggested_description",
            Self::KeySellingPoints => "key_selling_points",
            Self::TargetAudience => "target_audience",
            Self::ComparableProducts => "comparable_products",
            Self::ConfidenceScore => "confidence_score",
        }
    }

    /// Exact match on an already-normalized key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == key)
    }

    pub fn is_list(self) -> bool {
        matches!(
            self,
            Self::Features
                | Self::Colors
                | Self::Materials
                | Self::Defects
                | Self::KeySellingPoints
                | Self::ComparableProducts
        )
    }
}

/// Normalized structured-analysis result. List fields are always present;
/// scalars the model did not return stay `None` and are omitted on output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub features: Vec<Value>,
    #[serde(default)]
    pub colors: Vec<Value>,
    #[serde(default)]
    pub materials: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub defects: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_description: Option<String>,
    #[serde(default)]
    pub key_selling_points: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub comparable_products: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    /// Keys outside the canonical schema, already normalized.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductAnalysis {
    pub fn list_mut(&mut self, field: CanonicalField) -> Option<&mut Vec<Value>> {
        match field {
            CanonicalField::Features => Some(&mut self.features),
            CanonicalField::Colors => Some(&mut self.colors),
            CanonicalField::Materials => Some(&mut self.materials),
            CanonicalField::Defects => Some(&mut self.defects),
            CanonicalField::KeySellingPoints => Some(&mut self.key_selling_points),
            CanonicalField::ComparableProducts => Some(&mut self.comparable_products),
            _ => None,
        }
    }

    pub fn text_mut(&mut self, field: CanonicalField) -> Option<&mut Option<String>> {
        match field {
            CanonicalField::ProductType => Some(&mut self.product_type),
            CanonicalField::Category => Some(&mut self.category),
            CanonicalField::Condition => Some(&mut self.condition),
            CanonicalField::SuggestedTitle => Some(&mut self.suggested_title),
            CanonicalField::SuggestedDescription => Some(&mut self.suggested_description),
            CanonicalField::TargetAudience => Some(&mut self.target_audience),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingField {
    Title,
    Description,
    Features,
}

impl ListingField {
    pub const ALL: [ListingField; 3] = [
        ListingField::Title,
        ListingField::Description,
        ListingField::Features,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Features => "features",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == key)
    }
}

/// One language's block of a multilingual reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizedListing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Lowercase language code to listing, in the order the model returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultilingualContent {
    pub languages: IndexMap<String, LocalizedListing>,
}

impl MultilingualContent {
    pub fn get(&self, code: &str) -> Option<&LocalizedListing> {
        self.languages.get(&code.to_lowercase())
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }
}

/// Structured analysis, alt text and OCR of a single image in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullReport {
    pub analysis: ProductAnalysis,
    pub alt_text: String,
    pub extracted_text: String,
}
