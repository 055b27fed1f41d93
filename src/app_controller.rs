use anyhow::{anyhow, Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::{Config, SourceMode};
use crate::document_cache;
use crate::errors::SubtitleError;
use crate::file_utils::FileManager;
use crate::formats::{AssStyling, StyleTemplate};
use crate::language_utils;
use crate::providers::ffmpeg::{select_subtitle_stream, FfmpegTool};
use crate::providers::whisper::WhisperClient;
use crate::providers::{MediaTool, Transcriber, Translator};
use crate::subtitle_matcher::{self, MatchOptions};
use crate::subtitle_processor::{Provenance, SubtitleDocument, SubtitleFormat};
use crate::text_normalizer;
use crate::timecode::TimeParseMode;
use crate::translation::{build_translator, TranslationService};

// @module: Pipeline controller: acquire source subtitles, translate, assemble styled ASS

/// Result of processing one video
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Output written to the path
    Written(PathBuf),
    /// Output already existed and overwriting was not requested
    Skipped(PathBuf),
}

impl RunOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Written(path) | Self::Skipped(path) => path,
        }
    }
}

/// Main application controller for styled subtitle assembly
pub struct Controller {
    // @field: App configuration
    config: Config,
    media: Arc<dyn MediaTool>,
    transcriber: Arc<dyn Transcriber>,
    translation: TranslationService,
}

impl Controller {
    // @method: Create a controller whose services are built from the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let media: Arc<dyn MediaTool> = Arc::new(FfmpegTool::new(
            config.media.ffmpeg_path.clone(),
            config.media.ffprobe_path.clone(),
            config.media.timeout_secs,
        ));
        let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperClient::new(
            config.transcription.endpoint.clone(),
            Some(config.transcription.api_key.clone()),
            config.transcription.timeout_secs,
        ));
        let translator = build_translator(&config).context("Failed to create translation provider")?;
        Ok(Self::with_services(config, media, transcriber, translator))
    }

    // @method: Create a controller around explicitly provided services
    pub fn with_services(
        config: Config,
        media: Arc<dyn MediaTool>,
        transcriber: Arc<dyn Transcriber>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        let translation = TranslationService::with_config(translator, &config);
        Self {
            config,
            media,
            transcriber,
            translation,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn translation_service(&self) -> &TranslationService {
        &self.translation
    }

    /// Process one video: `<output_dir>/<stem>.ass` plus any extra formats
    pub async fn run(&self, video_path: &Path, output_dir: &Path, force_overwrite: bool) -> Result<RunOutcome> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(video_path, output_dir, &multi_progress, force_overwrite)
            .await
    }

    async fn run_with_progress(
        &self,
        video_path: &Path,
        output_dir: &Path,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<RunOutcome> {
        let start_time = Instant::now();

        if !video_path.is_file() {
            return Err(SubtitleError::NotFound(format!("video file {:?}", video_path)).into());
        }

        FileManager::ensure_dir(output_dir)?;

        let output_path = FileManager::derived_path(video_path, output_dir, SubtitleFormat::Ass.extension());
        if output_path.exists() && !force_overwrite {
            warn!("Skipping {:?}, output already exists (use -f to force overwrite)", output_path);
            return Ok(RunOutcome::Skipped(output_path));
        }

        let provenance = Provenance::for_video(video_path)
            .with_context(|| format!("Failed to fingerprint {:?}", video_path))?;

        let source = self.load_source_document(video_path, output_dir, &provenance).await?;
        let acquired_in = start_time.elapsed();
        info!("Source subtitles: {} segments ({})", source.len(), source.metadata.source_format);

        let translated = self
            .load_translated_document(video_path, output_dir, &provenance, &source, multi_progress)
            .await?;

        self.write_outputs(&translated, video_path, output_dir, &output_path)?;

        let elapsed = start_time.elapsed();
        info!(
            "Done in {} (source: {}, translation: {})",
            Self::format_duration(elapsed),
            Self::format_duration(acquired_in),
            Self::format_duration(elapsed.saturating_sub(acquired_in))
        );
        Ok(RunOutcome::Written(output_path))
    }

    /// Process every video directly inside a directory; failures are logged and counted
    pub async fn run_folder(&self, input_dir: &Path, output_dir: Option<&Path>, force_overwrite: bool) -> Result<()> {
        let video_files = FileManager::find_video_files(input_dir)?;
        if video_files.is_empty() {
            return Err(anyhow!("No video files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(video_files.len() as u64));
        folder_pb.set_style(Self::progress_style("files"));
        folder_pb.set_message("Processing files");

        let mut success_count = 0;
        let mut skip_count = 0;
        let mut error_count = 0;

        for video_file in &video_files {
            let file_name = video_file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            let target_dir = output_dir.unwrap_or(input_dir);
            match self
                .run_with_progress(video_file, target_dir, &multi_progress, force_overwrite)
                .await
            {
                Ok(RunOutcome::Written(_)) => success_count += 1,
                Ok(RunOutcome::Skipped(_)) => skip_count += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    error_count += 1;
                }
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");
        info!(
            "Folder processing completed: {} processed, {} skipped, {} errors",
            success_count, skip_count, error_count
        );
        Ok(())
    }

    async fn load_source_document(
        &self,
        video_path: &Path,
        output_dir: &Path,
        provenance: &Provenance,
    ) -> Result<SubtitleDocument> {
        let cache_path = document_cache::source_document_path(video_path, output_dir);
        if self.config.output.cache_documents {
            if let Some(document) = document_cache::load_if_valid(&cache_path, provenance) {
                return Ok(document);
            }
        }

        let document = self
            .acquire_source(video_path)
            .await?
            .with_provenance(provenance.clone());

        if self.config.output.cache_documents {
            document_cache::store(&cache_path, &document)
                .with_context(|| format!("Failed to store {:?}", cache_path))?;
        }
        Ok(document)
    }

    /// Get source subtitles according to the configured mode
    pub async fn acquire_source(&self, video_path: &Path) -> Result<SubtitleDocument> {
        let mode = self.config.source.mode;
        debug!("Acquiring source subtitles for {:?} (mode {})", video_path, mode);

        match mode {
            SourceMode::External => self
                .from_external(video_path)?
                .ok_or_else(|| anyhow!("No external subtitle file found for {:?}", video_path)),
            SourceMode::Embedded => self
                .from_embedded(video_path)
                .await?
                .ok_or_else(|| anyhow!("No usable subtitle stream in {:?}", video_path)),
            SourceMode::Transcribe => self.from_transcription(video_path).await,
            SourceMode::Auto => {
                match self.from_external(video_path) {
                    Ok(Some(document)) => return Ok(document),
                    Ok(None) => debug!("No external subtitles, trying embedded streams"),
                    Err(e) => warn!("External subtitles unusable: {:#}", e),
                }
                match self.from_embedded(video_path).await {
                    Ok(Some(document)) => return Ok(document),
                    Ok(None) => debug!("No embedded subtitles, falling back to transcription"),
                    Err(e) => warn!("Embedded subtitles unusable: {:#}", e),
                }
                self.from_transcription(video_path).await
            }
        }
    }

    fn time_parse_mode(&self) -> TimeParseMode {
        TimeParseMode::from_lenient_flag(self.config.codec.lenient_ass_time)
    }

    /// Explicit subtitle file, else the best filename match; `None` when nothing usable exists
    fn from_external(&self, video_path: &Path) -> Result<Option<SubtitleDocument>> {
        let path = match &self.config.source.subtitle_file {
            Some(path) => path.clone(),
            None => {
                let mut search_dirs = Vec::new();
                if let Some(parent) = video_path.parent() {
                    let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
                    search_dirs.push(parent.to_path_buf());
                }
                search_dirs.extend(self.config.source.search_dirs.iter().cloned());

                let options = MatchOptions {
                    min_score: self.config.source.min_match_score,
                    ..MatchOptions::default()
                };
                let candidates = subtitle_matcher::find_external_subtitles(video_path, &search_dirs, &options);
                match subtitle_matcher::select_candidate(&candidates, Some(self.config.source_language.as_str())) {
                    Some(candidate) => {
                        info!("Using external subtitles: {}", candidate);
                        candidate.path.clone()
                    }
                    None => return Ok(None),
                }
            }
        };

        let document = SubtitleDocument::parse_file(&path, self.time_parse_mode())
            .with_context(|| format!("Failed to read subtitles from {:?}", path))?;
        if document.is_empty() {
            warn!("{:?} contains no subtitle segments", path);
            return Ok(None);
        }
        Ok(Some(document))
    }

    /// Extract a text subtitle stream from the container
    async fn from_embedded(&self, video_path: &Path) -> Result<Option<SubtitleDocument>> {
        let streams = self
            .media
            .list_subtitle_streams(video_path)
            .await
            .with_context(|| format!("Failed to list subtitle streams of {:?}", video_path))?;

        let stream = match self.config.source.stream_index {
            Some(index) => Some(
                streams
                    .iter()
                    .find(|s| s.index == index)
                    .ok_or_else(|| anyhow!("Stream {} not found in {:?}", index, video_path))?,
            ),
            None => {
                let preferred = self
                    .config
                    .source
                    .preferred_stream_language
                    .as_deref()
                    .unwrap_or(self.config.source_language.as_str());
                select_subtitle_stream(&streams, preferred)
            }
        };
        let Some(stream) = stream else {
            return Ok(None);
        };
        if stream.is_bitmap() {
            return Err(anyhow!("Stream {} is a bitmap subtitle ({})", stream.index, stream.codec_name));
        }

        info!(
            "Extracting subtitle stream {} ({}, {})",
            stream.index,
            stream.codec_name,
            stream.language.as_deref().unwrap_or("unknown")
        );
        let temp_dir = tempfile::tempdir().context("Failed to create temporary directory")?;
        let extracted = self
            .media
            .extract_subtitle_stream(video_path, stream, temp_dir.path())
            .await
            .with_context(|| format!("Failed to extract stream {}", stream.index))?;

        let document = SubtitleDocument::parse_file(&extracted, self.time_parse_mode())
            .with_context(|| format!("Failed to parse extracted stream {}", stream.index))?;
        if document.is_empty() {
            warn!("Subtitle stream {} contains no text segments", stream.index);
            return Ok(None);
        }
        Ok(Some(document))
    }

    /// Extract the audio track and run speech recognition
    async fn from_transcription(&self, video_path: &Path) -> Result<SubtitleDocument> {
        let temp_dir = tempfile::tempdir().context("Failed to create temporary directory")?;
        let audio_path = temp_dir.path().join("audio.wav");

        info!("Extracting audio from {:?}", video_path);
        self.media
            .extract_audio(video_path, &audio_path)
            .await
            .with_context(|| format!("Failed to extract audio from {:?}", video_path))?;

        let language_hint = language_utils::normalize_to_part1_or_part2t(&self.config.source_language).ok();
        info!("Transcribing with model '{}'", self.config.transcription.model);
        let segments = self
            .transcriber
            .transcribe(&audio_path, &self.config.transcription.model, language_hint.as_deref())
            .await
            .context("Transcription failed")?;

        let segments = segments
            .into_iter()
            .filter_map(|mut segment| {
                segment.text = text_normalizer::normalize(&segment.text);
                (!segment.text.is_empty()).then_some(segment)
            })
            .collect();
        // Transcripts are plain timed lines, closest to SRT
        Ok(SubtitleDocument::with_segments(SubtitleFormat::Srt, segments))
    }

    async fn load_translated_document(
        &self,
        video_path: &Path,
        output_dir: &Path,
        provenance: &Provenance,
        source: &SubtitleDocument,
        multi_progress: &MultiProgress,
    ) -> Result<SubtitleDocument> {
        if language_utils::language_codes_match(&self.config.source_language, &self.config.target_language) {
            info!("Source and target language are the same, skipping translation");
            return Ok(source.clone());
        }

        let cache_path =
            document_cache::translated_document_path(video_path, output_dir, &self.config.target_language);
        if self.config.output.cache_documents {
            if let Some(document) = document_cache::load_if_valid(&cache_path, provenance) {
                return Ok(document);
            }
        }

        let progress_bar = multi_progress.add(ProgressBar::new(source.len() as u64));
        progress_bar.set_style(Self::progress_style("segments"));
        info!(
            "Translating {} -> {} with {}",
            self.config.source_language,
            self.config.target_language,
            self.config.translation.provider.display_name()
        );
        progress_bar.set_message("Translating");

        let result = self.translation.translate_document(source, Some(&progress_bar)).await;
        progress_bar.finish_and_clear();
        let translated = result?.with_provenance(provenance.clone());

        if self.config.output.cache_documents {
            document_cache::store(&cache_path, &translated)
                .with_context(|| format!("Failed to store {:?}", cache_path))?;
        }
        Ok(translated)
    }

    /// Styling from the configured template file (or the built-in one) and style rules
    pub fn styling(&self) -> Result<AssStyling> {
        let template = match &self.config.styling.template_path {
            Some(path) => StyleTemplate::from_file(path)
                .with_context(|| format!("Failed to load style template {:?}", path))?,
            None => StyleTemplate::default(),
        };
        Ok(AssStyling::new(template, self.config.styling.rules()))
    }

    fn write_outputs(
        &self,
        document: &SubtitleDocument,
        video_path: &Path,
        output_dir: &Path,
        ass_path: &Path,
    ) -> Result<()> {
        let styling = self.styling()?;
        document
            .write_to_file(ass_path, SubtitleFormat::Ass, &styling)
            .with_context(|| format!("Failed to write {:?}", ass_path))?;
        info!("Success: {}", ass_path.display());

        for format in &self.config.output.extra_formats {
            if format.is_ass_family() {
                continue;
            }
            let path = FileManager::derived_path(video_path, output_dir, format.extension());
            document
                .write_to_file(&path, *format, &styling)
                .with_context(|| format!("Failed to write {:?}", path))?;
            info!("Success: {}", path.display());
        }
        Ok(())
    }

    fn progress_style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
                unit
            ))
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
