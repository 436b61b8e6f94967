//! Client for the Gemini text-generation API.

use eyre::WrapErr;
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

pub struct GeminiClient {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_key,
            model,
        }
    }

    /// Reads `GEMINI_API_KEY` from the environment.
    pub fn from_env(model: String) -> eyre::Result<Self> {
        let api_key =
            std::env::var("GEMINI_API_KEY").wrap_err("GEMINI_API_KEY is not set")?;
        Ok(Self::new(api_key, model))
    }

    /// Sends a single prompt and returns the generated text.
    pub fn generate(&self, prompt: &str) -> eyre::Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };
        let url = format!("{API_BASE}/models/{}:generateContent", self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .wrap_err("Failed to reach the Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            eyre::bail!("Gemini API returned {status}: {body}");
        }

        let response: GenerateResponse = response
            .json()
            .wrap_err("Failed to parse the Gemini API response")?;
        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| eyre::eyre!("Gemini API response contained no candidates"))?;
        Ok(text)
    }
}
