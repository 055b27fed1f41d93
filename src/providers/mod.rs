/*!
 * Clients for the external services the pipeline consumes.
 *
 * - `ffmpeg`: audio extraction and embedded subtitle streams (ffmpeg/ffprobe)
 * - `whisper`: OpenAI-compatible transcription endpoint
 * - `deepl`: DeepL translation API
 * - `ollama`: local LLM translation through Ollama
 * - `mock`: deterministic translator for tests
 *
 * Every service is an explicitly constructed handle; nothing here keeps global
 * model or credential state.
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::errors::ProviderError;
use crate::subtitle_processor::TimedSegment;

pub mod deepl;
pub mod ffmpeg;
pub mod mock;
pub mod ollama;
pub mod whisper;

pub use self::ffmpeg::SubtitleStream;

/// Text translation service
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Translate one piece of text.
    ///
    /// Implementations return an empty string for empty input without calling the service.
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError>;

    /// Check that the service is reachable
    async fn test_connection(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Speech-to-text service producing timed segments
#[async_trait]
pub trait Transcriber: Send + Sync + Debug {
    async fn transcribe(
        &self,
        audio_path: &Path,
        model: &str,
        language_hint: Option<&str>,
    ) -> Result<Vec<TimedSegment>, ProviderError>;
}

/// Video container operations
#[async_trait]
pub trait MediaTool: Send + Sync + Debug {
    /// Write the audio track as mono 16 kHz PCM WAV
    async fn extract_audio(&self, video_path: &Path, output_path: &Path) -> Result<(), ProviderError>;

    /// List the subtitle streams of a video
    async fn list_subtitle_streams(&self, video_path: &Path) -> Result<Vec<SubtitleStream>, ProviderError>;

    /// Extract one subtitle stream into `output_dir`, returning the written file
    async fn extract_subtitle_stream(
        &self,
        video_path: &Path,
        stream: &SubtitleStream,
        output_dir: &Path,
    ) -> Result<PathBuf, ProviderError>;
}

// Cut long service responses down for error messages
pub(crate) fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}
