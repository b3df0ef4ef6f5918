//! Short pet biographies from a generative text API.
//!
//! Same build/parse split as [`crate::client`]. [`PetBioClient::generate`]
//! always yields some text: an empty answer or any failure falls back to a
//! fixed line.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::error::ApiError;
use crate::http::{HttpBody, HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;

pub const EMPTY_BIO_FALLBACK: &str = "A lovable pet full of love to give!";
pub const FAILED_BIO_FALLBACK: &str = "A loyal companion ready for new adventures!";

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

fn prompt(name: &str, species: &str, breed: Option<&str>) -> String {
    let breed = breed.filter(|b| !b.trim().is_empty()).unwrap_or("Unknown");
    format!(
        "Write a short, cute and funny biography (at most 2 sentences) for a pet.\n\
         Name: {name}\n\
         Species: {species}\n\
         Breed: {breed}"
    )
}

#[derive(Clone)]
pub struct PetBioClient {
    config: AiConfig,
    transport: Arc<dyn Transport>,
}

impl PetBioClient {
    pub fn new(config: AiConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// `None` when no API key is configured.
    pub fn build_generate(
        &self,
        name: &str,
        species: &str,
        breed: Option<&str>,
    ) -> Result<Option<HttpRequest>, ApiError> {
        let Some(key) = &self.config.api_key else {
            return Ok(None);
        };
        let payload = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt(name, species, breed),
                }],
            }],
        };
        let body =
            serde_json::to_string(&payload).map_err(|e| ApiError::Serialization(e.to_string()))?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let mut req = HttpRequest::new(HttpMethod::Post, url);
        req.set_header("content-type", "application/json".to_string());
        req.set_header(API_KEY_HEADER, key.expose_secret().clone());
        req.body = Some(HttpBody::Json(body));
        Ok(Some(req))
    }

    /// The generated text, trimmed. Empty when the model returned none.
    pub fn parse_generate(&self, response: HttpResponse) -> Result<String, ApiError> {
        if !response.is_success() {
            return Err(ApiError::from_response(&response));
        }
        let parsed: GenerateResponse = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        Ok(text.trim().to_string())
    }

    pub async fn generate(&self, name: &str, species: &str, breed: Option<&str>) -> String {
        match self.try_generate(name, species, breed).await {
            Ok(text) if text.is_empty() => EMPTY_BIO_FALLBACK.to_string(),
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "biography generation failed, using fallback");
                FAILED_BIO_FALLBACK.to_string()
            }
        }
    }

    async fn try_generate(
        &self,
        name: &str,
        species: &str,
        breed: Option<&str>,
    ) -> Result<String, ApiError> {
        let request = self
            .build_generate(name, species, breed)?
            .ok_or_else(|| ApiError::Network("no generative API key configured".to_string()))?;
        let response = self.transport.execute(request).await?;
        self.parse_generate(response)
    }
}
