/*!
 * Mock service implementations for testing.
 *
 * - `MockTranslator::working()` - prefixes text with the target language
 * - `MockTranslator::intermittent(n)` - fails every n-th request
 * - `MockTranslator::failing()` - always fails
 * - `MockTranscriber` - returns a fixed list of segments
 * - `MockMediaTool` - fakes ffmpeg by writing placeholder files
 */

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{MediaTool, SubtitleStream, Transcriber, Translator};
use crate::subtitle_processor::TimedSegment;

/// Behavior mode for the mock translator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns an empty translation
    Empty,
    /// Simulates a slow service
    Slow { delay_ms: u64 },
}

/// Mock translator with a shared request counter
#[derive(Debug, Clone)]
pub struct MockTranslator {
    behavior: MockBehavior,
    request_count: Arc<AtomicUsize>,
    custom_response: Option<fn(&str, &str, &str) -> String>,
}

impl MockTranslator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Replace the default `[target] text` output; arguments are text, source, target
    pub fn with_custom_response(mut self, generator: fn(&str, &str, &str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of calls that reached the service (empty input never does)
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn render(&self, text: &str, source: &str, target: &str) -> String {
        match self.custom_response {
            Some(generator) => generator(text, source, target),
            None => format!("[{}] {}", target, text),
        }
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => Ok(self.render(text, source_language, target_language)),
            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        status_code: 503,
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                    })
                } else {
                    Ok(self.render(text, source_language, target_language))
                }
            }
            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated provider failure".to_string(),
            }),
            MockBehavior::Empty => Ok(String::new()),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                Ok(self.render(text, source_language, target_language))
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Transcriber returning canned segments
#[derive(Debug, Clone, Default)]
pub struct MockTranscriber {
    segments: Vec<TimedSegment>,
    calls: Arc<AtomicUsize>,
}

impl MockTranscriber {
    pub fn new(segments: Vec<TimedSegment>) -> Self {
        Self {
            segments,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
        _model: &str,
        _language_hint: Option<&str>,
    ) -> Result<Vec<TimedSegment>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !audio_path.is_file() {
            return Err(ProviderError::RequestFailed(format!("audio file missing: {:?}", audio_path)));
        }
        Ok(self.segments.clone())
    }
}

/// Media tool that serves canned streams and writes placeholder outputs
#[derive(Debug, Clone, Default)]
pub struct MockMediaTool {
    streams: Vec<SubtitleStream>,
    /// Content written for any extracted subtitle stream
    stream_content: String,
}

impl MockMediaTool {
    pub fn new(streams: Vec<SubtitleStream>, stream_content: impl Into<String>) -> Self {
        Self {
            streams,
            stream_content: stream_content.into(),
        }
    }
}

#[async_trait]
impl MediaTool for MockMediaTool {
    async fn extract_audio(&self, _video_path: &Path, output_path: &Path) -> Result<(), ProviderError> {
        tokio::fs::write(output_path, b"RIFF")
            .await
            .map_err(|e| ProviderError::ProcessFailed(e.to_string()))
    }

    async fn list_subtitle_streams(&self, _video_path: &Path) -> Result<Vec<SubtitleStream>, ProviderError> {
        Ok(self.streams.clone())
    }

    async fn extract_subtitle_stream(
        &self,
        _video_path: &Path,
        stream: &SubtitleStream,
        output_dir: &Path,
    ) -> Result<PathBuf, ProviderError> {
        let path = output_dir.join(format!("stream_{}.{}", stream.index, stream.output_format().extension()));
        tokio::fs::write(&path, &self.stream_content)
            .await
            .map_err(|e| ProviderError::ProcessFailed(e.to_string()))?;
        Ok(path)
    }
}
