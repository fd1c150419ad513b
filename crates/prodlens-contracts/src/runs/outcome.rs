use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::ProductAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnreadableInput,
    TransportFailure,
    AuthFailure,
    MalformedResponse,
    ArtifactWrite,
    WorkerPanic,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnreadableInput => "unreadable_input",
            Self::TransportFailure => "transport_failure",
            Self::AuthFailure => "auth_failure",
            Self::MalformedResponse => "malformed_response",
            Self::ArtifactWrite => "artifact_write",
            Self::WorkerPanic => "worker_panic",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Success,
    Error,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Capitalized form written to the summary report.
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OutcomeBody {
    Success {
        analysis: ProductAnalysis,
        artifact: PathBuf,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

/// Result of one image in a batch run. Built once by the worker that
/// processed the image and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemOutcome {
    image: PathBuf,
    #[serde(flatten)]
    body: OutcomeBody,
}

impl BatchItemOutcome {
    pub fn success(image: PathBuf, analysis: ProductAnalysis, artifact: PathBuf) -> Self {
        Self {
            image,
            body: OutcomeBody::Success { analysis, artifact },
        }
    }

    pub fn error(image: PathBuf, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            image,
            body: OutcomeBody::Error {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn image(&self) -> &Path {
        &self.image
    }

    pub fn body(&self) -> &OutcomeBody {
        &self.body
    }

    pub fn status(&self) -> ItemStatus {
        match self.body {
            OutcomeBody::Success { .. } => ItemStatus::Success,
            OutcomeBody::Error { .. } => ItemStatus::Error,
        }
    }

    pub fn analysis(&self) -> Option<&ProductAnalysis> {
        match &self.body {
            OutcomeBody::Success { analysis, .. } => Some(analysis),
            OutcomeBody::Error { .. } => None,
        }
    }

    pub fn artifact(&self) -> Option<&Path> {
        match &self.body {
            OutcomeBody::Success { artifact, .. } => Some(artifact),
            OutcomeBody::Error { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.body {
            OutcomeBody::Success { .. } => None,
            OutcomeBody::Error { kind, .. } => Some(*kind),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.body {
            OutcomeBody::Success { .. } => None,
            OutcomeBody::Error { message, .. } => Some(message),
        }
    }
}

/// Reportable projection of one outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub image: String,
    pub status: ItemStatus,
    pub product_type: String,
    pub category: String,
    pub suggested_title: String,
    pub confidence: f64,
}

impl SummaryRow {
    pub const HEADERS: [&'static str; 6] = [
        "Image",
        "Status",
        "Product Type",
        "Category",
        "Suggested Title",
        "Confidence",
    ];

    pub fn from_outcome(outcome: &BatchItemOutcome) -> Self {
        let image = outcome.image().to_string_lossy().to_string();
        match outcome.analysis() {
            Some(analysis) => Self {
                image,
                status: ItemStatus::Success,
                product_type: analysis.product_type.clone().unwrap_or_default(),
                category: analysis.category.clone().unwrap_or_default(),
                suggested_title: analysis.suggested_title.clone().unwrap_or_default(),
                confidence: analysis.confidence_score.unwrap_or(0.0),
            },
            None => Self {
                image,
                status: ItemStatus::Error,
                product_type: String::new(),
                category: String::new(),
                suggested_title: String::new(),
                confidence: 0.0,
            },
        }
    }

    pub fn cells(&self) -> [String; 6] {
        [
            self.image.clone(),
            self.status.label().to_string(),
            self.product_type.clone(),
            self.category.clone(),
            self.suggested_title.clone(),
            self.confidence.to_string(),
        ]
    }
}
