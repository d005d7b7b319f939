//! Gemini client with Google Search grounding
//!
//! Calls `models/{model}:generateContent` with the `google_search` tool and
//! returns the answer text plus the web pages the answer was grounded on.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LookupError;
use crate::models::company::Source;
use crate::services::response_parser::RawAnswer;

const MAX_OUTPUT_TOKENS: u32 = 200;
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct WebChunk {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Gemini REST client
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .timeout(config.lookup_timeout())
            .build()
            .map_err(|e| LookupError::Terminal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.gemini_api_key.clone(),
            api_base_url: config.gemini_api_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Run a grounded search prompt
    pub async fn grounded_search(&self, prompt: &str) -> Result<RawAnswer, LookupError> {
        if self.api_key.is_empty() {
            return Err(LookupError::Terminal(
                "Server configuration error: API key is missing".to_string(),
            ));
        }

        let url = format!("{}/models/{}:generateContent", self.api_base_url, self.model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "tools": [{ "google_search": {} }],
            "generationConfig": {
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
                "temperature": TEMPERATURE,
            },
        });

        debug!("Calling Gemini API, model: {}", self.model);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            warn!("Gemini API returned {}: {}", status, crate::utils::truncate_text(&raw, 200));
            return Err(error_for_status(status, &raw));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&raw)
            .map_err(|e| LookupError::Terminal(format!("invalid Gemini response: {}", e)))?;

        debug!("Gemini API call succeeded");
        Ok(answer_from_response(parsed))
    }
}

fn error_for_status(status: StatusCode, body: &str) -> LookupError {
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::GATEWAY_TIMEOUT {
        return LookupError::Transient("Server overloaded or timed out".to_string());
    }
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let message = envelope
        .error
        .map(|e| match (e.status, e.message) {
            (Some(code), Some(msg)) => format!("{}: {}", code, msg),
            (None, Some(msg)) => msg,
            (Some(code), None) => code,
            (None, None) => String::new(),
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Server error: {}", status.as_u16()));
    LookupError::classify(message)
}

fn answer_from_response(response: GenerateContentResponse) -> RawAnswer {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return RawAnswer::default();
    };

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let sources = candidate
        .grounding_metadata
        .map(|m| {
            m.grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .filter_map(|web| {
                    let uri = web.uri?;
                    let title = web.title.unwrap_or_else(|| uri.clone());
                    Some(Source { title, uri })
                })
                .collect()
        })
        .unwrap_or_default();

    RawAnswer {
        text: text.trim().to_string(),
        sources,
    }
}
