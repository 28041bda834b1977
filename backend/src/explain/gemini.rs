use serde::Deserialize;
use std::time::Duration;

const GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

const MAX_ERROR_DETAIL: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Raw-HTTP client for the generateContent endpoint. The request carries an
/// explicit timeout; expiry surfaces as `ExplainError::Http` and degrades
/// upstream like any other failure.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            api_key,
            endpoint: GEMINI_API_URL.to_string(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client (system error)"),
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, ExplainError> {
        let payload = serde_json::json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ExplainError::Status {
                status: status.as_u16(),
                detail: truncate(&body),
            });
        }

        parse_generate_response(&body)
    }
}

fn parse_generate_response(body: &str) -> Result<String, ExplainError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| ExplainError::Malformed(e.to_string()))?;

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| ExplainError::Malformed("no candidate text in response".to_string()))
}

fn truncate(body: &str) -> String {
    let mut end = body.len().min(MAX_ERROR_DETAIL);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
