use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Extensions the batch walker and upload surfaces accept, lowercase, no dot.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl MediaType {
    pub fn from_extension(ext: &str) -> Option<Self> {
        let normalized = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Resolves from a file name or path hint. Unknown and missing extensions
    /// fall back to jpeg; bytes are never inspected.
    pub fn from_name_hint(name: &str) -> Self {
        Path::new(name)
            .extension()
            .and_then(|value| value.to_str())
            .and_then(Self::from_extension)
            .unwrap_or_default()
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Raw image as read from disk or an upload. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    identity: String,
    bytes: Vec<u8>,
    media_type: MediaType,
}

impl ImageAsset {
    pub fn new(identity: impl Into<String>, bytes: Vec<u8>) -> Self {
        let identity = identity.into();
        let media_type = MediaType::from_name_hint(&identity);
        Self {
            identity,
            bytes,
            media_type,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }
}

/// Transport form of an image: standard base64 plus the declared media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub data: String,
    pub media_type: MediaType,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type.mime(), self.data)
    }
}
