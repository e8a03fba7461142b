use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::KioskError;
use crate::models::{Background, GenerationOptions};

// ---------------------------------------------------------------------------
// ImageGenerator trait
// ---------------------------------------------------------------------------

/// Produces a composed image from a selfie and a background prompt.
///
/// The HTTP implementation talks to the hosted image-edit API; tests swap
/// in lightweight doubles.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        selfie: &[u8],
        mime: &str,
        background: &Background,
        options: &GenerationOptions,
    ) -> Result<Vec<u8>, KioskError>;
}

// ---------------------------------------------------------------------------
// HttpImageGenerator
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EditRequest<'a> {
    prompt: String,
    image: String,
    mime: &'a str,
}

#[derive(Debug, Deserialize)]
struct EditResponse {
    image: String,
}

pub struct HttpImageGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpImageGenerator {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            api_key,
        }
    }

    fn build_prompt(background: &Background, options: &GenerationOptions) -> String {
        format!(
            "{} The subject presents as {} and should be {} in the frame.",
            background.prompt,
            options.gender.as_str(),
            match options.prominence {
                crate::models::Prominence::Low => "a small figure",
                crate::models::Prominence::Medium => "moderately prominent",
                crate::models::Prominence::High => "the dominant element",
            }
        )
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn generate(
        &self,
        selfie: &[u8],
        mime: &str,
        background: &Background,
        options: &GenerationOptions,
    ) -> Result<Vec<u8>, KioskError> {
        let request = EditRequest {
            prompt: Self::build_prompt(background, options),
            image: base64::engine::general_purpose::STANDARD.encode(selfie),
            mime,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| KioskError::ExternalGeneration(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(KioskError::ExternalGeneration(format!(
                "upstream returned {}: {}",
                status.as_u16(),
                message
            )));
        }

        let body: EditResponse = response
            .json()
            .await
            .map_err(|e| KioskError::ExternalGeneration(format!("malformed response: {}", e)))?;

        base64::engine::general_purpose::STANDARD
            .decode(&body.image)
            .map_err(|e| KioskError::ExternalGeneration(format!("invalid image payload: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackgroundCatalog, Gender, Prominence};
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn background() -> Background {
        BackgroundCatalog::builtin()
            .get("neon-skyline")
            .cloned()
            .expect("builtin background")
    }

    #[tokio::test]
    async fn test_generate_decodes_successful_response() {
        let server = MockServer::start().await;
        let payload = base64::engine::general_purpose::STANDARD.encode(b"fake-png-bytes");
        Mock::given(method("POST"))
            .and(path("/v1/images/edits"))
            .and(bearer_token("secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "image": payload })),
            )
            .mount(&server)
            .await;

        let generator = HttpImageGenerator::new(
            format!("{}/v1/images/edits", server.uri()),
            "secret".to_string(),
        );
        let result = generator
            .generate(
                b"selfie",
                "image/jpeg",
                &background(),
                &GenerationOptions::default(),
            )
            .await
            .expect("generation succeeds");
        assert_eq!(result, b"fake-png-bytes");
    }

    #[tokio::test]
    async fn test_generate_maps_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let generator = HttpImageGenerator::new(server.uri(), "secret".to_string());
        let err = generator
            .generate(
                b"selfie",
                "image/jpeg",
                &background(),
                &GenerationOptions::default(),
            )
            .await
            .unwrap_err();
        match err {
            KioskError::ExternalGeneration(msg) => {
                assert!(msg.contains("502"), "got: {}", msg);
            }
            other => panic!("Expected ExternalGeneration, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let generator = HttpImageGenerator::new(server.uri(), "secret".to_string());
        let err = generator
            .generate(
                b"selfie",
                "image/jpeg",
                &background(),
                &GenerationOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, KioskError::ExternalGeneration(_)));
    }

    #[test]
    fn test_prompt_reflects_options() {
        let prompt = HttpImageGenerator::build_prompt(
            &background(),
            &GenerationOptions {
                gender: Gender::Male,
                prominence: Prominence::High,
            },
        );
        assert!(prompt.contains("male"));
        assert!(prompt.contains("dominant element"));
    }
}
