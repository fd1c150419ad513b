use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use prodlens_contracts::analysis::{EncodedImage, ImageAsset, MediaType};

use crate::error::{AnalysisError, AnalysisResult};

/// Encodes raw bytes for transport. The media type comes from the name hint
/// alone; malformed image bytes are left for the model endpoint to reject.
pub fn encode_image(bytes: &[u8], name_hint: &str) -> EncodedImage {
    EncodedImage {
        data: BASE64.encode(bytes),
        media_type: MediaType::from_name_hint(name_hint),
    }
}

pub fn encode_asset(asset: &ImageAsset) -> EncodedImage {
    EncodedImage {
        data: BASE64.encode(asset.bytes()),
        media_type: asset.media_type(),
    }
}

pub fn decode_payload(encoded: &EncodedImage) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(encoded.data.as_bytes())
}

pub fn read_image_asset(path: &Path) -> AnalysisResult<ImageAsset> {
    let bytes = fs::read(path).map_err(|source| AnalysisError::UnreadableInput {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ImageAsset::new(path.to_string_lossy(), bytes))
}
