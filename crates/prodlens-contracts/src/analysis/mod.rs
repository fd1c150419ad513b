mod media;
mod mode;
mod schema;

pub use media::{EncodedImage, ImageAsset, MediaType, SUPPORTED_IMAGE_EXTENSIONS};
pub use mode::AnalysisMode;
pub use schema::{
    CanonicalField, FullReport, ListingField, LocalizedListing, MultilingualContent,
    ProductAnalysis, FEATURE_ALIASES,
};
