mod parseextract;

pub use parseextract::ParseExtractClient;

use serde_json::Value;

use crate::config::ExtractorConfig;
use crate::model::{ExtractError, ImageUpload};

/// Outbound extraction seam. The HTTP layer only sees this trait, so tests
/// can swap in a canned extractor.
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        config: &ExtractorConfig,
        upload: ImageUpload,
    ) -> Result<Value, ExtractError>;
}
