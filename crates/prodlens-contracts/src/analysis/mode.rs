use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    StructuredAnalysis,
    Comparison,
    Ocr,
    AltText,
    Multilingual,
}

impl AnalysisMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StructuredAnalysis => "structured_analysis",
            Self::Comparison => "comparison",
            Self::Ocr => "ocr",
            Self::AltText => "alt_text",
            Self::Multilingual => "multilingual",
        }
    }

    /// Output ceiling sent with every request of this mode.
    pub fn max_tokens(self) -> u32 {
        match self {
            Self::StructuredAnalysis => 2000,
            Self::Comparison => 1500,
            Self::Ocr => 2000,
            Self::AltText => 500,
            Self::Multilingual => 3000,
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
