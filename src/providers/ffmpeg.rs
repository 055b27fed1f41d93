use async_trait::async_trait;
use log::{debug, error, warn};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::MediaTool;
use crate::subtitle_processor::SubtitleFormat;

// @const: Sample rate expected by speech-to-text models
const AUDIO_SAMPLE_RATE: &str = "16000";

/// One subtitle stream as reported by ffprobe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleStream {
    /// Absolute stream index in the container
    pub index: usize,
    pub codec_name: String,
    pub language: Option<String>,
    pub title: Option<String>,
}

impl SubtitleStream {
    /// Image-based subtitles cannot be converted to text without OCR
    pub fn is_bitmap(&self) -> bool {
        is_bitmap_codec(&self.codec_name)
    }

    /// Text format ffmpeg should convert this stream to
    pub fn output_format(&self) -> SubtitleFormat {
        match self.codec_name.as_str() {
            "ass" | "ssa" => SubtitleFormat::Ass,
            "webvtt" => SubtitleFormat::Vtt,
            _ => SubtitleFormat::Srt,
        }
    }
}

/// Check if a subtitle codec is bitmap-based
pub fn is_bitmap_codec(codec_name: &str) -> bool {
    matches!(
        codec_name,
        "hdmv_pgs_subtitle" | "dvd_subtitle" | "dvb_subtitle" | "xsub"
    )
}

/// Filter ffmpeg stderr to the meaningful error lines, dropping the banner,
/// build configuration and stream metadata
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Chapter",
        "Stream #",
        "title",
        "BPS",
        "DURATION",
        "NUMBER_OF",
        "_STATISTICS",
        "Output #",
        "Stream mapping:",
        "Press [q]",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}

/// Parse `ffprobe -print_format json -show_streams` output
pub fn parse_ffprobe_streams(json: &str) -> Result<Vec<SubtitleStream>, ProviderError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(json)
        .map_err(|e| ProviderError::ParseError(format!("invalid ffprobe JSON: {}", e)))?;

    let streams = value
        .get("streams")
        .and_then(|s| s.as_array())
        .map(|streams| {
            streams
                .iter()
                .map(|stream| {
                    let tag = |name: &str| {
                        stream
                            .get("tags")
                            .and_then(|t| t.get(name))
                            .and_then(|v| v.as_str())
                            .map(str::to_string)
                    };
                    SubtitleStream {
                        index: stream.get("index").and_then(|v| v.as_u64()).unwrap_or(0) as usize,
                        codec_name: stream
                            .get("codec_name")
                            .and_then(|v| v.as_str())
                            .unwrap_or("unknown")
                            .to_string(),
                        language: tag("language"),
                        title: tag("title"),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(streams)
}

/// Pick a text subtitle stream: preferred language (by code or title), then English,
/// then the first text stream
pub fn select_subtitle_stream<'a>(
    streams: &'a [SubtitleStream],
    preferred_language: &str,
) -> Option<&'a SubtitleStream> {
    let text_streams: Vec<&SubtitleStream> = streams.iter().filter(|s| !s.is_bitmap()).collect();

    let skipped = streams.len() - text_streams.len();
    if skipped > 0 {
        warn!("Skipping {} bitmap subtitle stream(s); only text streams can be converted", skipped);
    }

    let matches_language = |stream: &SubtitleStream, code: &str| {
        if stream
            .language
            .as_deref()
            .is_some_and(|lang| language_utils::language_codes_match(lang, code))
        {
            return true;
        }
        stream.title.as_deref().is_some_and(|title| {
            let title = title.to_lowercase();
            language_utils::get_language_name(code)
                .map(|name| title.contains(&name.to_lowercase()))
                .unwrap_or(false)
        })
    };

    text_streams
        .iter()
        .find(|&&s| matches_language(s, preferred_language))
        .or_else(|| text_streams.iter().find(|&&s| matches_language(s, "en")))
        .or_else(|| text_streams.first())
        .copied()
}

/// ffmpeg/ffprobe command-line wrapper
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffmpeg_path: String,
    ffprobe_path: String,
    timeout: Duration,
}

impl Default for FfmpegTool {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe", 600)
    }
}

impl FfmpegTool {
    pub fn new(ffmpeg_path: impl Into<String>, ffprobe_path: impl Into<String>, timeout_secs: u64) -> Self {
        FfmpegTool {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    // Run a command with the configured timeout
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output, ProviderError> {
        debug!("Running {} {}", program, args.join(" "));
        let future = Command::new(program).args(args).kill_on_drop(true).output();

        tokio::select! {
            result = future => {
                result.map_err(|e| ProviderError::ProcessFailed(format!("failed to start {}: {}", program, e)))
            },
            _ = tokio::time::sleep(self.timeout) => {
                Err(ProviderError::Timeout(self.timeout.as_secs()))
            }
        }
    }

    fn check_status(program: &str, output: &Output) -> Result<(), ProviderError> {
        if output.status.success() {
            return Ok(());
        }
        let stderr = filter_ffmpeg_stderr(&String::from_utf8_lossy(&output.stderr));
        error!("{} failed: {}", program, stderr);
        Err(ProviderError::ProcessFailed(format!("{} failed: {}", program, stderr)))
    }
}

fn path_arg(path: &Path) -> Result<&str, ProviderError> {
    path.to_str()
        .ok_or_else(|| ProviderError::ProcessFailed(format!("path is not valid UTF-8: {:?}", path)))
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn extract_audio(&self, video_path: &Path, output_path: &Path) -> Result<(), ProviderError> {
        let output = self
            .run(
                &self.ffmpeg_path,
                &[
                    "-y",
                    "-v",
                    "error",
                    "-i",
                    path_arg(video_path)?,
                    "-vn",
                    "-ac",
                    "1",
                    "-ar",
                    AUDIO_SAMPLE_RATE,
                    "-acodec",
                    "pcm_s16le",
                    path_arg(output_path)?,
                ],
            )
            .await?;
        Self::check_status(&self.ffmpeg_path, &output)
    }

    async fn list_subtitle_streams(&self, video_path: &Path) -> Result<Vec<SubtitleStream>, ProviderError> {
        let output = self
            .run(
                &self.ffprobe_path,
                &[
                    "-v",
                    "quiet",
                    "-print_format",
                    "json",
                    "-show_streams",
                    "-select_streams",
                    "s",
                    path_arg(video_path)?,
                ],
            )
            .await?;
        Self::check_status(&self.ffprobe_path, &output)?;
        parse_ffprobe_streams(&String::from_utf8_lossy(&output.stdout))
    }

    async fn extract_subtitle_stream(
        &self,
        video_path: &Path,
        stream: &SubtitleStream,
        output_dir: &Path,
    ) -> Result<PathBuf, ProviderError> {
        if stream.is_bitmap() {
            return Err(ProviderError::ProcessFailed(format!(
                "stream {} uses bitmap codec {} and cannot be converted to text",
                stream.index, stream.codec_name
            )));
        }

        let output_path = output_dir.join(format!(
            "stream_{}.{}",
            stream.index,
            stream.output_format().extension()
        ));
        let map = format!("0:{}", stream.index);
        let output = self
            .run(
                &self.ffmpeg_path,
                &[
                    "-y",
                    "-v",
                    "error",
                    "-i",
                    path_arg(video_path)?,
                    "-map",
                    &map,
                    path_arg(&output_path)?,
                ],
            )
            .await?;
        Self::check_status(&self.ffmpeg_path, &output)?;
        Ok(output_path)
    }
}
