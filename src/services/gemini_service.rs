use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::utils::AppError;

/// Text generation backend used by the student routes.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Sends `parts` as a single user turn and returns the reply text.
    async fn generate(&self, parts: &[String]) -> Result<String, AppError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Gemini `generateContent` over REST.
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, parts: &[String]) -> Result<String, AppError> {
        log::info!("🤖 Calling {} with {} part(s)", self.config.model, parts.len());

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: parts.iter().map(|text| RequestPart { text }).collect(),
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Generative(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Generative(format!("{}: {}", status, detail)));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generative(format!("unreadable response: {}", e)))?;

        let text = reply.text();
        log::info!("✅ Model replied with {} characters", text.len());
        Ok(text)
    }
}

#[cfg(test)]
pub mod stub {
    use std::sync::Mutex;

    use super::*;

    /// Returns a fixed reply and records every prompt it receives.
    pub struct StubModel {
        reply: String,
        pub prompts: Mutex<Vec<Vec<String>>>,
    }

    impl StubModel {
        pub fn new(reply: impl Into<String>) -> Self {
            Self {
                reply: reply.into(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerativeModel for StubModel {
        async fn generate(&self, parts: &[String]) -> Result<String, AppError> {
            self.prompts.lock().unwrap().push(parts.to_vec());
            Ok(self.reply.clone())
        }
    }
}
