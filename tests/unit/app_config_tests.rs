/*!
 * Tests for configuration loading, saving and validation
 */

use anyhow::Result;
use std::str::FromStr;
use yassa::app_config::{Config, LogLevel, SourceMode, TranslationProvider};
use yassa::subtitle_processor::SubtitleFormat;
use crate::common;

fn ollama_config() -> Config {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Ollama;
    config
}

/// Test the documented defaults
#[test]
fn test_default_config_shouldHaveExpectedValues() {
    let config = Config::default();
    assert_eq!(config.source_language, "ru");
    assert_eq!(config.target_language, "uk");
    assert_eq!(config.source.mode, SourceMode::Auto);
    assert_eq!(config.source.min_match_score, 0.3);
    assert_eq!(config.translation.provider, TranslationProvider::DeepL);
    assert_eq!(config.translation.concurrent_requests, 4);
    assert_eq!(config.translation.retry_count, 3);
    assert!(config.translation.cache_enabled);
    assert_eq!(config.styling.opening_threshold_secs, 60.0);
    assert_eq!(config.styling.ending_fraction, 0.9);
    assert!(!config.codec.lenient_ass_time);
    assert!(config.output.cache_documents);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test that a partial file is completed with defaults
#[test]
fn test_load_withPartialJson_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "target_language": "de",
            "source": { "mode": "external", "search_dirs": ["subs"] },
            "translation": { "provider": "ollama", "model": "qwen2.5" },
            "output": { "extra_formats": ["srt", "vtt"] },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::load(&path)?;
    assert_eq!(config.source_language, "ru");
    assert_eq!(config.target_language, "de");
    assert_eq!(config.source.mode, SourceMode::External);
    assert_eq!(config.source.search_dirs.len(), 1);
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.translation.model, "qwen2.5");
    assert_eq!(config.translation.retry_backoff_ms, 1000);
    assert_eq!(config.output.extra_formats, vec![SubtitleFormat::Srt, SubtitleFormat::Vtt]);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.styling.style_map.opening, "OP");
    Ok(())
}

/// Test that malformed JSON is reported
#[test]
fn test_load_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;
    assert!(Config::load(&path).is_err());
    assert!(Config::load(&temp_dir.path().join("missing.json")).is_err());
    Ok(())
}

/// Test that load_or_create writes defaults and save/load round trips
#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested").join("conf.json");

    let created = Config::load_or_create(&path)?;
    assert!(path.is_file());
    assert_eq!(created.target_language, "uk");

    let mut changed = created.clone();
    changed.target_language = "en".to_string();
    changed.styling.ending_fraction = 0.8;
    changed.save(&path)?;

    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.target_language, "en");
    assert_eq!(reloaded.styling.ending_fraction, 0.8);
    Ok(())
}

/// Test that DeepL without a key fails validation and Ollama passes
#[test]
fn test_validate_withProviderSettings_shouldCheckApiKey() {
    assert!(Config::default().validate().is_err());

    let mut deepl = Config::default();
    deepl.translation.api_key = "secret:fx".to_string();
    assert!(deepl.validate().is_ok());

    assert!(ollama_config().validate().is_ok());
}

/// Test the individual validation rules
#[test]
fn test_validate_withInvalidFields_shouldFail() {
    let mut config = ollama_config();
    config.source_language = "xx".to_string();
    assert!(config.validate().is_err());

    let mut config = ollama_config();
    config.translation.concurrent_requests = 0;
    assert!(config.validate().is_err());

    let mut config = ollama_config();
    config.translation.endpoint = "not a url".to_string();
    assert!(config.validate().is_err());

    let mut config = ollama_config();
    config.source.min_match_score = 1.5;
    assert!(config.validate().is_err());

    let mut config = ollama_config();
    config.source.preferred_stream_language = Some("zz".to_string());
    assert!(config.validate().is_err());

    let mut config = ollama_config();
    config.styling.opening_threshold_secs = -1.0;
    assert!(config.validate().is_err());

    let mut config = ollama_config();
    config.styling.ending_fraction = 0.0;
    assert!(config.validate().is_err());
}

/// Test endpoint defaults per provider
#[test]
fn test_get_endpoint_withoutOverride_shouldUseProviderDefault() {
    let config = ollama_config();
    assert_eq!(config.translation.get_endpoint(), "http://localhost:11434");
    assert_eq!(Config::default().translation.get_endpoint(), "");

    let mut custom = ollama_config();
    custom.translation.endpoint = "http://gpu-box:11434".to_string();
    assert_eq!(custom.translation.get_endpoint(), "http://gpu-box:11434");
}

/// Test that configured styling maps to style rules
#[test]
fn test_styling_rules_withCustomValues_shouldCopyThem() {
    let mut config = Config::default();
    config.styling.style_map.ending = "Credits".to_string();
    config.styling.opening_threshold_secs = 90.0;

    let rules = config.styling.rules();
    assert_eq!(rules.style_map.ending, "Credits");
    assert_eq!(rules.opening_threshold_secs, 90.0);
    assert_eq!(rules.ending_fraction, 0.9);
}

/// Test parsing of enum values from strings
#[test]
fn test_from_str_withNames_shouldParseEnums() -> Result<()> {
    assert_eq!(SourceMode::from_str("Embedded")?, SourceMode::Embedded);
    assert_eq!(SourceMode::Transcribe.to_string(), "transcribe");
    assert!(SourceMode::from_str("magic").is_err());

    assert_eq!(TranslationProvider::from_str("DEEPL")?, TranslationProvider::DeepL);
    assert_eq!(TranslationProvider::Ollama.display_name(), "Ollama");
    assert_eq!(TranslationProvider::DeepL.to_string(), "deepl");

    assert_eq!(LogLevel::from_str("warning")?, LogLevel::Warn);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
    Ok(())
}
