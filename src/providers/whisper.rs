use async_trait::async_trait;
use log::{debug, error};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{truncate_for_log, Transcriber};
use crate::subtitle_processor::TimedSegment;
use crate::text_normalizer::normalize;

/// Client for an OpenAI-compatible `/audio/transcriptions` endpoint
/// (OpenAI, faster-whisper-server, whisper.cpp server)
#[derive(Debug, Clone)]
pub struct WhisperClient {
    /// Base URL up to and including the API version, e.g. `http://localhost:8000/v1`
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

/// `verbose_json` transcription response
#[derive(Debug, Deserialize)]
pub struct TranscriptionResponse {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub segments: Vec<TranscriptionSegment>,
}

/// One segment of a `verbose_json` response
#[derive(Debug, Deserialize)]
pub struct TranscriptionSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TranscriptionResponse {
    /// Convert to timed segments with normalized text, dropping empty ones
    pub fn into_segments(self) -> Vec<TimedSegment> {
        self.segments
            .into_iter()
            .filter_map(|segment| {
                let text = normalize(&segment.text);
                (!text.is_empty()).then(|| TimedSegment::new(segment.start, segment.end, text))
            })
            .collect()
    }
}

impl WhisperClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout_secs: u64) -> Self {
        WhisperClient {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }

    fn transcription_url(&self) -> String {
        format!("{}/audio/transcriptions", self.endpoint)
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(
        &self,
        audio_path: &Path,
        model: &str,
        language_hint: Option<&str>,
    ) -> Result<Vec<TimedSegment>, ProviderError> {
        let audio = tokio::fs::read(audio_path)
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("failed to read {:?}: {}", audio_path, e)))?;
        let file_name = audio_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();

        let mut form = Form::new()
            .text("model", model.to_string())
            .text("response_format", "verbose_json")
            .part("file", Part::bytes(audio).file_name(file_name));
        if let Some(language) = language_hint {
            form = form.text("language", language.to_string());
        }

        debug!("Sending {:?} to {} (model {})", audio_path, self.transcription_url(), model);
        let mut request = self.client.post(self.transcription_url()).multipart(form);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("transcription request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::AuthenticationError(
                "transcription endpoint rejected the API key".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Transcription API error ({}): {}", status, truncate_for_log(&body, 500));
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: truncate_for_log(&body, 500),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("failed to read response: {}", e)))?;
        let parsed: TranscriptionResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::ParseError(format!("{} in {}", e, truncate_for_log(&body, 200)))
        })?;

        if let Some(language) = &parsed.language {
            debug!("Transcription reports language '{}'", language);
        }
        Ok(parsed.into_segments())
    }
}
