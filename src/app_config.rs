use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use url::Url;

use crate::formats::{StyleMap, StyleRules};
use crate::subtitle_processor::SubtitleFormat;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Where source subtitles come from
    #[serde(default)]
    pub source: SourceConfig,

    /// Speech recognition service
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// ASS output styling
    #[serde(default)]
    pub styling: StylingConfig,

    /// Time-code parsing
    #[serde(default)]
    pub codec: CodecConfig,

    /// ffmpeg / ffprobe
    #[serde(default)]
    pub media: MediaConfig,

    /// Output files
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Subtitle source selection
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    // @mode: external file, then embedded stream, then transcription
    #[default]
    Auto,
    // @mode: speech recognition only
    Transcribe,
    // @mode: subtitle stream inside the container
    Embedded,
    // @mode: subtitle file next to the video
    External,
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Transcribe => "transcribe",
            Self::Embedded => "embedded",
            Self::External => "external",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for SourceMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "transcribe" => Ok(Self::Transcribe),
            "embedded" => Ok(Self::Embedded),
            "external" => Ok(Self::External),
            _ => Err(anyhow!("Invalid source mode: {}", s)),
        }
    }
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: DeepL REST API
    #[default]
    DeepL,
    // @provider: Ollama
    Ollama,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::DeepL => "DeepL",
            Self::Ollama => "Ollama",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::DeepL => "deepl".to_string(),
            Self::Ollama => "ollama".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "deepl" => Ok(Self::DeepL),
            "ollama" => Ok(Self::Ollama),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Source acquisition settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default)]
    pub mode: SourceMode,

    // @field: Extra directories searched for external subtitles
    #[serde(default)]
    pub search_dirs: Vec<PathBuf>,

    // @field: Explicit subtitle file, bypasses matching
    #[serde(default)]
    pub subtitle_file: Option<PathBuf>,

    // @field: Explicit embedded stream index, bypasses selection
    #[serde(default)]
    pub stream_index: Option<usize>,

    // @field: Minimum filename score for external candidates
    #[serde(default = "default_min_match_score")]
    pub min_match_score: f64,

    // @field: Language preferred when picking an embedded stream
    #[serde(default)]
    pub preferred_stream_language: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            search_dirs: Vec::new(),
            subtitle_file: None,
            stream_index: None,
            min_match_score: default_min_match_score(),
            preferred_stream_language: None,
        }
    }
}

/// Speech recognition settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranscriptionConfig {
    // @field: OpenAI-compatible base URL
    #[serde(default = "default_transcription_endpoint")]
    pub endpoint: String,

    // @field: Model name
    #[serde(default = "default_transcription_model")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Timeout seconds
    #[serde(default = "default_transcription_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_transcription_endpoint(),
            model: default_transcription_model(),
            api_key: String::new(),
            timeout_secs: default_transcription_timeout_secs(),
        }
    }
}

/// Translation settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    #[serde(default)]
    pub provider: TranslationProvider,

    // @field: Service URL, empty for the provider default
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Model name (Ollama)
    #[serde(default = "default_ollama_model")]
    pub model: String,

    // @field: API key (DeepL)
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Max concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Retries after the first failed attempt
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    // @field: Base backoff, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: System prompt override (Ollama)
    #[serde(default)]
    pub system_prompt: Option<String>,

    // @field: Cache identical lines
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

impl TranslationConfig {
    /// Endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.clone();
        }
        match self.provider {
            TranslationProvider::DeepL => String::new(),
            TranslationProvider::Ollama => default_ollama_endpoint(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            endpoint: String::new(),
            model: default_ollama_model(),
            api_key: String::new(),
            concurrent_requests: default_concurrent_requests(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            timeout_secs: default_timeout_secs(),
            system_prompt: None,
            cache_enabled: true,
        }
    }
}

/// ASS styling settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StylingConfig {
    // @field: ASS header file, built-in template when absent
    #[serde(default)]
    pub template_path: Option<PathBuf>,

    #[serde(default)]
    pub style_map: StyleMap,

    // @field: Segments starting before this are openings
    #[serde(default = "default_opening_threshold_secs")]
    pub opening_threshold_secs: f64,

    // @field: Segments ending after this fraction of the final end are endings
    #[serde(default = "default_ending_fraction")]
    pub ending_fraction: f64,
}

impl StylingConfig {
    pub fn rules(&self) -> StyleRules {
        StyleRules {
            style_map: self.style_map.clone(),
            opening_threshold_secs: self.opening_threshold_secs,
            ending_fraction: self.ending_fraction,
        }
    }
}

impl Default for StylingConfig {
    fn default() -> Self {
        Self {
            template_path: None,
            style_map: StyleMap::default(),
            opening_threshold_secs: default_opening_threshold_secs(),
            ending_fraction: default_ending_fraction(),
        }
    }
}

/// Time-code settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CodecConfig {
    // @field: Read malformed ASS times as 0 instead of dropping the line
    #[serde(default)]
    pub lenient_ass_time: bool,
}

/// External tool settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MediaConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    #[serde(default = "default_media_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_media_timeout_secs(),
        }
    }
}

/// Output settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    // @field: Formats written next to the ASS file
    #[serde(default)]
    pub extra_formats: Vec<SubtitleFormat>,

    // @field: Keep JSON side documents between runs
    #[serde(default = "default_true")]
    pub cache_documents: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            extra_formats: Vec::new(),
            cache_documents: true,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

fn default_source_language() -> String {
    "ru".to_string()
}

fn default_target_language() -> String {
    "uk".to_string()
}

fn default_min_match_score() -> f64 {
    0.3
}

fn default_transcription_endpoint() -> String {
    "http://localhost:8000/v1".to_string()
}

fn default_transcription_model() -> String {
    "base".to_string()
}

fn default_transcription_timeout_secs() -> u64 {
    600
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // doubled on each retry
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1".to_string()
}

fn default_opening_threshold_secs() -> f64 {
    60.0
}

fn default_ending_fraction() -> f64 {
    0.9
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_media_timeout_secs() -> u64 {
    600
}

impl Config {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open config file: {:?}", path))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Load a configuration file, writing the defaults first if it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        let config = Config::default();
        warn!("Config file {:?} not found, writing defaults", path);
        config.save(path)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        let file = File::create(path).with_context(|| format!("Failed to create config file: {:?}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        crate::language_utils::validate_language_code(&self.source_language)
            .context("Invalid source language")?;
        crate::language_utils::validate_language_code(&self.target_language)
            .context("Invalid target language")?;

        if self.translation.provider == TranslationProvider::DeepL && self.translation.api_key.trim().is_empty() {
            return Err(anyhow!("Translation API key is required for DeepL provider"));
        }
        if self.translation.concurrent_requests == 0 {
            return Err(anyhow!("translation.concurrent_requests must be at least 1"));
        }

        let endpoint = self.translation.get_endpoint();
        if !endpoint.is_empty() {
            Url::parse(&endpoint).with_context(|| format!("Invalid translation endpoint: {}", endpoint))?;
        }
        Url::parse(&self.transcription.endpoint)
            .with_context(|| format!("Invalid transcription endpoint: {}", self.transcription.endpoint))?;

        if !(0.0..=1.0).contains(&self.source.min_match_score) {
            return Err(anyhow!(
                "source.min_match_score must be within [0, 1], got {}",
                self.source.min_match_score
            ));
        }
        if let Some(language) = &self.source.preferred_stream_language {
            crate::language_utils::validate_language_code(language)
                .context("Invalid preferred stream language")?;
        }

        let styling = &self.styling;
        if !(styling.opening_threshold_secs >= 0.0) {
            return Err(anyhow!(
                "styling.opening_threshold_secs must not be negative, got {}",
                styling.opening_threshold_secs
            ));
        }
        if !(styling.ending_fraction > 0.0 && styling.ending_fraction <= 1.0) {
            return Err(anyhow!(
                "styling.ending_fraction must be within (0, 1], got {}",
                styling.ending_fraction
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            source: SourceConfig::default(),
            transcription: TranscriptionConfig::default(),
            translation: TranslationConfig::default(),
            styling: StylingConfig::default(),
            codec: CodecConfig::default(),
            media: MediaConfig::default(),
            output: OutputConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
