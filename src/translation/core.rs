/*!
 * Core translation service implementation.
 *
 * `TranslationService` wraps a `Translator` handle with caching, retries and
 * bounded concurrency, and translates whole subtitle documents while keeping
 * every segment's timing.
 */

use anyhow::{anyhow, Result};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use super::cache::TranslationCache;
use crate::app_config::{Config, TranslationProvider};
use crate::errors::{ProviderError, TranslationError};
use crate::providers::deepl::DeepL;
use crate::providers::ollama::Ollama;
use crate::providers::Translator;
use crate::subtitle_processor::SubtitleDocument;

/// Translation options for customizing the translation process
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOptions {
    /// Maximum number of concurrent requests
    pub concurrent_requests: usize,

    /// Retries after the first failed attempt
    pub retry_count: u32,

    /// Base backoff, doubled on each retry
    pub retry_backoff_ms: u64,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            concurrent_requests: 4,
            retry_count: 3,
            retry_backoff_ms: 1000,
        }
    }
}

/// Build the translator configured in `config.translation`
pub fn build_translator(config: &Config) -> Result<Arc<dyn Translator>> {
    let translation = &config.translation;
    match translation.provider {
        TranslationProvider::DeepL => {
            if translation.api_key.trim().is_empty() {
                return Err(anyhow!("DeepL requires an API key"));
            }
            let endpoint = Some(translation.get_endpoint()).filter(|e| !e.is_empty());
            Ok(Arc::new(DeepL::new(
                translation.api_key.clone(),
                endpoint,
                translation.timeout_secs,
            )))
        }
        TranslationProvider::Ollama => Ok(Arc::new(Ollama::new(
            translation.get_endpoint(),
            translation.model.clone(),
            translation.system_prompt.clone(),
            translation.timeout_secs,
        ))),
    }
}

/// Main translation service for subtitle translation
pub struct TranslationService {
    /// Provider implementation
    translator: Arc<dyn Translator>,

    source_language: String,

    target_language: String,

    /// Translation options
    pub options: TranslationOptions,

    /// Translation cache for storing and retrieving translations
    pub cache: TranslationCache,
}

impl TranslationService {
    pub fn new(
        translator: Arc<dyn Translator>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        options: TranslationOptions,
        cache: TranslationCache,
    ) -> Self {
        Self {
            translator,
            source_language: source_language.into(),
            target_language: target_language.into(),
            options,
            cache,
        }
    }

    /// Create a service around an existing translator using the config's languages and limits
    pub fn with_config(translator: Arc<dyn Translator>, config: &Config) -> Self {
        let options = TranslationOptions {
            concurrent_requests: config.translation.concurrent_requests.max(1),
            retry_count: config.translation.retry_count,
            retry_backoff_ms: config.translation.retry_backoff_ms,
        };
        Self::new(
            translator,
            config.source_language.clone(),
            config.target_language.clone(),
            options,
            TranslationCache::new(config.translation.cache_enabled),
        )
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub fn provider_name(&self) -> &str {
        self.translator.name()
    }

    /// Check that the provider is reachable
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.translator.test_connection().await
    }

    /// Translate one piece of text; blank input returns an empty string without a request
    pub async fn translate_text(&self, text: &str) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        if let Some(cached) = self.cache.get(text, &self.source_language, &self.target_language) {
            return Ok(cached);
        }

        let translated = self.translate_with_retry(text).await?;
        self.cache
            .store(text, &self.source_language, &self.target_language, &translated);
        Ok(translated)
    }

    async fn translate_with_retry(&self, text: &str) -> Result<String, ProviderError> {
        let mut attempt: u32 = 0;
        loop {
            let result = self
                .translator
                .translate(text, &self.source_language, &self.target_language)
                .await;

            match result {
                Ok(translated) => return Ok(translated),
                // A rejected key will not get better by waiting
                Err(e @ ProviderError::AuthenticationError(_)) => return Err(e),
                Err(e) if attempt < self.options.retry_count => {
                    attempt += 1;
                    let backoff_ms = self.options.retry_backoff_ms.saturating_mul(1u64 << (attempt - 1).min(16));
                    warn!(
                        "{} request failed (attempt {}/{}): {}; retrying in {} ms",
                        self.translator.name(),
                        attempt,
                        self.options.retry_count + 1,
                        e,
                        backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Translate every segment of a document, keeping timing and metadata.
    ///
    /// Requests run with at most `options.concurrent_requests` in flight and
    /// results are collected in segment order. The first segment that still
    /// fails after its retries aborts the document.
    pub async fn translate_document(
        &self,
        document: &SubtitleDocument,
        progress: Option<&ProgressBar>,
    ) -> Result<SubtitleDocument, TranslationError> {
        debug!(
            "Translating {} segments {} -> {} via {}",
            document.len(),
            self.source_language,
            self.target_language,
            self.translator.name()
        );

        let results: Vec<Result<String, TranslationError>> = stream::iter(document.segments.iter().enumerate())
            .map(|(index, segment)| async move {
                let result = self
                    .translate_text(&segment.text)
                    .await
                    .map_err(|e| TranslationError::Segment {
                        index,
                        message: e.to_string(),
                    });
                if let Some(progress) = progress {
                    progress.inc(1);
                }
                result
            })
            .buffered(self.options.concurrent_requests.max(1))
            .collect()
            .await;

        let mut translations = results.into_iter().collect::<Result<Vec<String>, TranslationError>>()?;

        let stats = self.cache.stats();
        debug!(
            "Translation cache: {} hits, {} misses ({:.0}% hit rate)",
            stats.hits,
            stats.misses,
            stats.hit_rate() * 100.0
        );

        Ok(document.map_text(|index, _| std::mem::take(&mut translations[index])))
    }
}
