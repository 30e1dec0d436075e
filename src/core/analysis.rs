use crate::config::toml_config::AnalysisConfig;
use crate::domain::ports::Analyzer;
use crate::utils::error::{Result, ValuationError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

// Request/response wire types for the generateContent endpoint.

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inline_data")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Thin, stateless boundary to the AI analysis service. Submits one
/// prompt (plus optional inline JPEG) and hands back the raw text; all
/// interpretation of that text lives in `core::parse`.
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn new(config: &AnalysisConfig, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }

    fn request_url(&self, api_key: &str) -> String {
        format!(
            "{}/v1/models/{}:generateContent?key={}",
            self.endpoint, self.model, api_key
        )
    }
}

#[async_trait]
impl Analyzer for GeminiClient {
    async fn analyze(&self, prompt: &str, image_base64: Option<&str>) -> Result<String> {
        // Fail fast: no credential means no network call at all.
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ValuationError::MissingCredential {
                name: "GEMINI_API_KEY".to_string(),
            }
        })?;

        let mut parts = vec![Part::Text {
            text: prompt.to_string(),
        }];
        if let Some(data) = image_base64 {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: "image/jpeg".to_string(),
                    data: data.to_string(),
                },
            });
        }

        let request = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.request_url(api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("❌ Analysis service error {}: {}", status, body);
            return Err(ValuationError::AnalysisTransportError {
                status: status.as_u16(),
            });
        }

        let payload: GenerateResponse = response.json().await?;

        // The response may spread text across several parts; concatenate
        // whatever is there.
        let mut text = String::new();
        for candidate in &payload.candidates {
            if let Some(content) = &candidate.content {
                for part in &content.parts {
                    if let Some(fragment) = &part.text {
                        text.push_str(fragment);
                    }
                }
            }
        }

        if text.is_empty() {
            tracing::error!("❌ Analysis service returned no extractable text");
            return Err(ValuationError::EmptyAnalysisResponse);
        }

        Ok(text)
    }
}
