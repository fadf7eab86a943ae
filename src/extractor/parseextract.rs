use reqwest::multipart::{Form, Part};
use reqwest::{Client, header::AUTHORIZATION};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::Extractor;
use crate::config::ExtractorConfig;
use crate::model::{ExtractError, ImageUpload};

/// Upstream error bodies are truncated to this many characters.
const ERROR_BODY_LIMIT: usize = 500;

/// Client for the ParseExtract data-extraction API.
pub struct ParseExtractClient {
    client: Client,
}

impl ParseExtractClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("dart-ingest/0.1")
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default();

        Self { client }
    }

    /// Canned demo payload for stub mode, exercising both normalizer paths.
    fn stub_payload(filename: &str) -> Value {
        json!({
            "stub": true,
            "engine": "demo",
            "filename": filename,
            "text": "R1: 60 (441)\nR2: 81 (360)\nR3: 45 (315)",
            "tokens": [
                {"round": 1, "visit": 60, "after": 441, "darts": [20, 20, 20]},
                {"round": 2, "visit": 81, "after": 360, "darts": [25, 26, 30]},
            ]
        })
    }
}

impl Default for ParseExtractClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Extractor for ParseExtractClient {
    async fn extract(
        &self,
        config: &ExtractorConfig,
        upload: ImageUpload,
    ) -> Result<Value, ExtractError> {
        if config.stub {
            info!("Stub mode active, returning demo payload for {}", upload.filename);
            return Ok(Self::stub_payload(&upload.filename));
        }

        if config.parsextract_url.trim().is_empty() {
            return Err(ExtractError::NotConfigured("parsextract_url"));
        }
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ExtractError::NotConfigured("api_key"))?;

        // Accept both a raw key and a full "Bearer ..." value
        let authorization = if api_key.to_lowercase().starts_with("bearer ") {
            api_key.to_string()
        } else {
            format!("Bearer {api_key}")
        };

        let file_part = Part::bytes(upload.bytes)
            .file_name(upload.filename.clone())
            .mime_str(&upload.mime)?;
        let mut form = Form::new()
            .part("file", file_part)
            .text("prompt", config.prompt.clone());
        for (key, value) in &config.extra_params {
            form = form.text(key.clone(), value.clone());
        }

        debug!("Posting {} to {}", upload.filename, config.parsextract_url);
        let response = self
            .client
            .post(&config.parsextract_url)
            .header(AUTHORIZATION, authorization)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ExtractError::UpstreamStatus {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        // A non-JSON 2xx body is still worth keeping
        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(_) => Ok(json!({ "raw": body })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer;

    fn upload() -> ImageUpload {
        ImageUpload {
            bytes: vec![0xFF, 0xD8],
            filename: "board.jpg".to_string(),
            mime: "image/jpeg".to_string(),
        }
    }

    #[tokio::test]
    async fn stub_mode_returns_demo_payload_without_network() {
        let config = ExtractorConfig {
            stub: true,
            ..Default::default()
        };

        let raw = ParseExtractClient::new()
            .extract(&config, upload())
            .await
            .unwrap();
        assert_eq!(raw["stub"], true);
        assert_eq!(raw["filename"], "board.jpg");
        // the demo payload must drive the token path of the normalizer
        assert_eq!(normalizer::infer_visits(&raw).len(), 2);
    }

    #[tokio::test]
    async fn missing_api_key_is_a_typed_error() {
        let config = ExtractorConfig::default();

        let err = ParseExtractClient::new()
            .extract(&config, upload())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::NotConfigured("api_key")));
    }

    #[tokio::test]
    async fn blank_url_is_a_typed_error() {
        let config = ExtractorConfig {
            parsextract_url: "  ".to_string(),
            api_key: Some("k".to_string()),
            ..Default::default()
        };

        let err = ParseExtractClient::new()
            .extract(&config, upload())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::NotConfigured("parsextract_url")));
    }
}
