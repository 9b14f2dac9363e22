use crate::models::{GenerateResponse, GenerationRequest};
use async_trait::async_trait;
use reqwest::{multipart::{Form, Part}, Client};
use thiserror::Error;
use tracing::{error, info, warn};

/// Fixed address of the image-generation backend.
pub const GENERATE_ENDPOINT: &str = "http://127.0.0.1:5000/api/generate";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("status={status} body={body}")] Status { status: u16, body: String },
    #[error("parse error: {0}")] Parse(String),
    #[error("invalid input: {0}")] InvalidInput(String),
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Sends one generation attempt and returns the result image reference,
    /// if the service supplied one.
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>, ClientError>;
}

pub struct GenerationClient {
    client: Client,
    endpoint: String,
}

impl Default for GenerationClient {
    fn default() -> Self { Self::new() }
}

impl GenerationClient {
    pub fn new() -> Self {
        Self::with_endpoint(GENERATE_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        // No timeout: a request that never settles keeps the view loading.
        Self { client: Client::new(), endpoint: endpoint.into() }
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }

    fn build_form(request: &GenerationRequest) -> Result<Form, ClientError> {
        let image = Part::bytes(request.image.bytes.to_vec())
            .file_name(request.image.file_name.clone())
            .mime_str(&request.image.media_type)
            .map_err(|e| ClientError::InvalidInput(format!("invalid media type {}: {}", request.image.media_type, e)))?;
        Ok(Form::new()
            .part("image", image)
            .text("prompt", request.prompt.clone()))
    }
}

#[async_trait]
impl GenerationService for GenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>, ClientError> {
        info!("🔗 Posting '{}' ({} bytes) to {}", request.image.file_name, request.image.bytes.len(), self.endpoint);

        let form = Self::build_form(request)?;
        let response = self.client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("❌ Generation service error response: {}", body);
            return Err(ClientError::Status { status: status.as_u16(), body });
        }

        let text = response.text().await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ClientError::Parse(format!("{}: {}", e, truncate(&text, 200))))?;
        let parsed = GenerateResponse::from_json(&value);

        match &parsed.image_url {
            Some(url) => info!("✅ Generated image available at {}", url),
            None => warn!("⚠️ Success response carried no imageUrl: {}", truncate(&text, 200)),
        }
        Ok(parsed.image_url)
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
