use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{truncate_for_log, Translator};

/// Default system prompt; `{source}` and `{target}` are replaced with language names
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional subtitle translator. \
Translate the user's text from {source} to {target}. \
Keep ASS override tags such as {\\i1} exactly as they are. \
Reply with the translation only, on a single line, without quotes or explanations.";

/// Ollama client for interacting with the Ollama API
#[derive(Debug, Clone)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// Model used for generation
    model: String,
    /// System prompt template
    system_prompt: String,
    /// HTTP client for making requests
    client: Client,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub model: String,
    /// Generated text
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: Some(false),
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }
}

impl Ollama {
    /// Create a client from a base URL such as `http://localhost:11434`
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        system_prompt: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        let base_url = base_url.into();
        let base_url = if base_url.starts_with("http://") || base_url.starts_with("https://") {
            base_url
        } else {
            format!("http://{}", base_url)
        };

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            system_prompt: system_prompt
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                // Ollama speaks HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Fill the system prompt template with language names
    pub fn render_system_prompt(&self, source_language: &str, target_language: &str) -> String {
        let name = |code: &str| language_utils::get_language_name(code).unwrap_or_else(|_| code.to_string());
        self.system_prompt
            .replace("{source}", &name(source_language))
            .replace("{target}", &name(target_language))
    }

    /// Generate text from the Ollama API
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to send request to Ollama API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, truncate_for_log(&error_text, 500));
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to get response text from Ollama API: {}", e)))?;

        Self::parse_generation_response(&response_text)
    }

    /// Parse a generate response, accepting both a single JSON object and a
    /// streamed JSONL body whose `response` pieces are concatenated
    pub fn parse_generation_response(body: &str) -> Result<GenerationResponse, ProviderError> {
        if let Ok(parsed) = serde_json::from_str::<GenerationResponse>(body) {
            return Ok(parsed);
        }

        let pieces: Vec<GenerationResponse> = body
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str::<GenerationResponse>(line).ok())
            .collect();

        if pieces.is_empty() {
            return Err(ProviderError::ParseError(format!(
                "Failed to parse Ollama API response: {}",
                truncate_for_log(body, 500)
            )));
        }

        debug!("Ollama returned a streamed body with {} chunks", pieces.len());
        let model = pieces[0].model.clone();
        let done = pieces.iter().any(|p| p.done);
        let response = pieces.into_iter().map(|p| p.response).collect::<String>();
        Ok(GenerationResponse { model, response, done })
    }
}

#[async_trait]
impl Translator for Ollama {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let request = GenerationRequest::new(&self.model, text)
            .system(self.render_system_prompt(source_language, target_language))
            .temperature(0.2);

        let response = self.generate(request).await?;
        Ok(response.response.trim().to_string())
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to reach Ollama at {}: {}", self.base_url, e)))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::ApiError {
                status_code: response.status().as_u16(),
                message: "Ollama health check failed".to_string(),
            })
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
