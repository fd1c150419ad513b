//! Product-image analysis pipeline: encode, ask a vision model, extract and
//! normalize its reply, and fan that out over a directory of images.

pub mod batch;
pub mod codec;
pub mod config;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod prompts;
pub mod providers;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

pub use batch::{discover_images, BatchConfig, BatchProcessor, BatchReport};
pub use config::ProviderConfig;
pub use error::{error_chain_text, AnalysisError, AnalysisResult};
pub use normalize::Normalized;
pub use providers::{build_provider, VisionProvider};
pub use service::{AnalysisOutput, AnalysisRequest, AnalysisService};
