use std::path::PathBuf;

use prodlens_contracts::runs::outcome::ErrorKind;
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("cannot read image {}", path.display())]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{provider} transport failure: {message}")]
    TransportFailure {
        provider: String,
        status: Option<u16>,
        message: String,
    },
    #[error("{provider} authentication failed: {message}")]
    AuthFailure { provider: String, message: String },
    #[error("malformed model response: {reason}")]
    MalformedResponse { reason: String, excerpt: String },
}

impl AnalysisError {
    pub fn transport(
        provider: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::TransportFailure {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AuthFailure {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
            excerpt: truncate_text(raw.trim(), 240),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnreadableInput { .. } => ErrorKind::UnreadableInput,
            Self::TransportFailure { .. } => ErrorKind::TransportFailure,
            Self::AuthFailure { .. } => ErrorKind::AuthFailure,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::TransportFailure { .. })
    }
}

/// Flattens an error and its causes into one line, dropping repeats.
pub fn error_chain_text(err: &(dyn std::error::Error + 'static), max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut cursor = Some(err);
    while let Some(cause) = cursor {
        let text = cause.to_string();
        let trimmed = text.trim();
        if !trimmed.is_empty() && parts.last().map(String::as_str) != Some(trimmed) {
            parts.push(trimmed.to_string());
        }
        cursor = cause.source();
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
