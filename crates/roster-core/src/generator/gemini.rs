use super::{
    GenerationError, GenerationRequest, GenerationResult, ScheduleGenerator, build_prompt,
    parse_entries,
};
use crate::bar::ScheduleEntry;
use crate::config::LlmConfig;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Calls the Gemini `generateContent` endpoint with a JSON response schema.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    config: LlmConfig,
    client: reqwest::Client,
}

impl GeminiGenerator {
    /// Builds the HTTP client with the configured timeout. A client that
    /// cannot be built is a transport error.
    pub fn new(config: LlmConfig) -> GenerationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| GenerationError::Transport(err.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

pub(crate) fn request_body(prompt: &str, thinking_budget: u32) -> Value {
    json!({
        "contents": [
            { "role": "user", "parts": [{ "text": prompt }] }
        ],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "workerId": { "type": "STRING" },
                        "day": { "type": "STRING" },
                        "hour": { "type": "NUMBER" }
                    },
                    "required": ["workerId", "day", "hour"]
                }
            },
            "thinkingConfig": { "thinkingBudget": thinking_budget }
        }
    })
}

/// Concatenates the non-thought text parts of the first candidate.
pub(crate) fn response_text(body: &Value) -> String {
    body.pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

impl ScheduleGenerator for GeminiGenerator {
    #[instrument(skip_all, fields(model = %self.config.model, workers = request.workers.len()))]
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult<Vec<ScheduleEntry>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(GenerationError::MissingApiKey)?;
        let prompt = build_prompt(request)?;
        let body = request_body(&prompt, self.config.thinking_budget);
        debug!(prompt_len = prompt.len(), "sending roster request");

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GenerationError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "generator rejected request");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| GenerationError::Parse(err.to_string()))?;
        let entries = parse_entries(&response_text(&payload))?;
        debug!(entries = entries.len(), "roster received");
        Ok(entries)
    }
}
