use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{truncate_for_log, Translator};

const FREE_API_URL: &str = "https://api-free.deepl.com";
const PRO_API_URL: &str = "https://api.deepl.com";

/// DeepL REST API client
#[derive(Debug, Clone)]
pub struct DeepL {
    endpoint: String,
    api_key: String,
    client: Client,
}

/// `/v2/translate` request body
#[derive(Debug, Serialize)]
pub struct TranslateRequest {
    pub text: Vec<String>,
    pub target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_lang: Option<String>,
}

/// `/v2/translate` response body
#[derive(Debug, Deserialize)]
pub struct TranslateResponse {
    pub translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
pub struct Translation {
    #[serde(default)]
    pub detected_source_language: Option<String>,
    pub text: String,
}

impl DeepL {
    /// Create a client; without an explicit endpoint the free or pro API is picked
    /// from the key (free keys end in `:fx`)
    pub fn new(api_key: impl Into<String>, endpoint: Option<String>, timeout_secs: u64) -> Self {
        let api_key = api_key.into();
        let endpoint = endpoint
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| Self::default_endpoint(&api_key).to_string());
        DeepL {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn default_endpoint(api_key: &str) -> &'static str {
        if api_key.ends_with(":fx") {
            FREE_API_URL
        } else {
            PRO_API_URL
        }
    }

    /// DeepL source code: uppercase ISO 639-1
    pub fn source_code(language: &str) -> Option<String> {
        language_utils::normalize_to_part1_or_part2t(language)
            .ok()
            .map(|code| code.to_uppercase())
    }

    /// DeepL target code; English and Portuguese need a regional variant
    pub fn target_code(language: &str) -> String {
        match Self::source_code(language).as_deref() {
            Some("EN") => "EN-US".to_string(),
            Some("PT") => "PT-PT".to_string(),
            Some(code) => code.to_string(),
            None => language.to_uppercase(),
        }
    }

    fn build_request(text: &str, source_language: &str, target_language: &str) -> TranslateRequest {
        TranslateRequest {
            text: vec![text.to_string()],
            target_lang: Self::target_code(target_language),
            source_lang: Self::source_code(source_language),
        }
    }
}

#[async_trait]
impl Translator for DeepL {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let url = format!("{}/v2/translate", self.endpoint);
        let request = Self::build_request(text, source_language, target_language);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("DeepL request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::AuthenticationError("DeepL rejected the API key".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("DeepL API error ({}): {}", status, truncate_for_log(&body, 500));
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: truncate_for_log(&body, 500),
            });
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("DeepL response: {}", e)))?;

        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| ProviderError::ParseError("DeepL returned no translations".to_string()))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/v2/usage", self.endpoint);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("DeepL request failed: {}", e)))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::ApiError {
                status_code: response.status().as_u16(),
                message: "DeepL usage check failed".to_string(),
            })
        }
    }

    fn name(&self) -> &str {
        "deepl"
    }
}
