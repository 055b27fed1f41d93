/*!
 * Full pipeline runs through the controller with mock services
 */

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use yassa::app_config::{Config, SourceMode};
use yassa::app_controller::{Controller, RunOutcome};
use yassa::errors::SubtitleError;
use yassa::providers::mock::{MockMediaTool, MockTranscriber, MockTranslator};
use yassa::providers::SubtitleStream;
use yassa::subtitle_processor::{SubtitleDocument, SubtitleFormat, TimedSegment};
use yassa::timecode::TimeParseMode;
use crate::common;

fn controller(config: Config, translator: &MockTranslator) -> Controller {
    Controller::with_services(
        config,
        Arc::new(MockMediaTool::default()),
        Arc::new(MockTranscriber::default()),
        Arc::new(translator.clone()),
    )
}

fn read_ass(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]), "ASS output must start with a BOM");
    Ok(String::from_utf8(bytes[3..].to_vec())?)
}

fn subtitle_stream(index: usize, codec_name: &str, language: &str) -> SubtitleStream {
    SubtitleStream {
        index,
        codec_name: codec_name.to_string(),
        language: Some(language.to_string()),
        title: None,
    }
}

/// Test a full external-subtitle run, the side documents and the skip on rerun
#[tokio::test]
async fn test_run_withExternalSubtitles_shouldWriteStyledAss() -> Result<()> {
    common::init_test_logging();
    let input_dir = common::create_temp_dir()?;
    let output_dir = common::create_temp_dir()?;
    let video = common::create_dummy_video(input_dir.path(), "episode01.mkv")?;
    common::create_test_file(input_dir.path(), "episode01.ru.srt", common::SAMPLE_SRT)?;
    common::create_test_file(input_dir.path(), "other_show.en.srt", common::SAMPLE_SRT)?;

    let translator = MockTranslator::working();
    let app = controller(common::offline_config(), &translator);

    let outcome = app.run(&video, output_dir.path(), false).await?;
    let ass_path = output_dir.path().join("episode01.ass");
    assert_eq!(outcome, RunOutcome::Written(ass_path.clone()));

    let ass = read_ass(&ass_path)?;
    assert!(ass.starts_with("[Script Info]"));
    assert!(ass.contains("Dialogue: 0,0:00:01.50,0:00:03.00,OP,,0,0,0,,[uk] Привет\u{FF0C} мир!"));
    assert!(ass.contains(",ED,,0,0,0,,[uk] Всё хорошо\u{FF0C} спасибо."));
    assert_eq!(translator.request_count(), 3);

    assert!(output_dir.path().join("episode01.source.json").is_file());
    assert!(output_dir.path().join("episode01.uk.json").is_file());

    // Existing output is left alone
    let outcome = app.run(&video, output_dir.path(), false).await?;
    assert_eq!(outcome, RunOutcome::Skipped(ass_path));
    assert_eq!(translator.request_count(), 3);
    Ok(())
}

/// Test that a forced rerun reuses side documents while the video is unchanged
#[tokio::test]
async fn test_run_withForceAndCachedDocuments_shouldNotTranslateAgain() -> Result<()> {
    let input_dir = common::create_temp_dir()?;
    let output_dir = common::create_temp_dir()?;
    let video = common::create_dummy_video(input_dir.path(), "episode01.mkv")?;
    common::create_test_file(input_dir.path(), "episode01.ru.srt", common::SAMPLE_SRT)?;

    let translator = MockTranslator::working();
    let app = controller(common::offline_config(), &translator);

    app.run(&video, output_dir.path(), false).await?;
    app.run(&video, output_dir.path(), true).await?;
    assert_eq!(translator.request_count(), 3);

    // A different video invalidates both side documents; a fresh controller has a cold line cache
    fs::write(&video, "another encode")?;
    let app = controller(common::offline_config(), &translator);
    app.run(&video, output_dir.path(), true).await?;
    assert_eq!(translator.request_count(), 6);
    Ok(())
}

/// Test that a missing video is reported as a typed not-found error
#[test]
fn test_run_withMissingVideo_shouldReturnNotFound() -> Result<()> {
    let output_dir = common::create_temp_dir()?;
    let app = controller(common::offline_config(), &MockTranslator::working());

    let result = tokio_test::block_on(async {
        app.run(&output_dir.path().join("missing.mkv"), output_dir.path(), false).await
    });
    let error = result.unwrap_err();

    assert!(matches!(error.downcast_ref::<SubtitleError>(), Some(SubtitleError::NotFound(_))));
    Ok(())
}

/// Test that external mode without any matching file fails
#[tokio::test]
async fn test_run_withNoExternalMatch_shouldFail() -> Result<()> {
    let input_dir = common::create_temp_dir()?;
    let video = common::create_dummy_video(input_dir.path(), "episode01.mkv")?;
    common::create_test_file(input_dir.path(), "unrelated.srt", common::SAMPLE_SRT)?;

    let app = controller(common::offline_config(), &MockTranslator::working());

    assert!(app.run(&video, input_dir.path(), false).await.is_err());
    assert!(!input_dir.path().join("episode01.ass").exists());
    Ok(())
}

/// Test that an explicit subtitle file bypasses name matching
#[tokio::test]
async fn test_run_withExplicitSubtitleFile_shouldUseIt() -> Result<()> {
    let input_dir = common::create_temp_dir()?;
    let output_dir = common::create_temp_dir()?;
    let video = common::create_dummy_video(input_dir.path(), "episode01.mkv")?;
    let subtitle = common::create_test_file(input_dir.path(), "whatever.vtt", common::SAMPLE_VTT)?;

    let mut config = common::offline_config();
    config.source.subtitle_file = Some(subtitle);
    let app = controller(config, &MockTranslator::working());

    app.run(&video, output_dir.path(), false).await?;

    let ass = read_ass(&output_dir.path().join("episode01.ass"))?;
    assert!(ass.contains(",,[uk] Hi there"));
    Ok(())
}

/// Test transcription mode: normalized text, empty segments dropped, SRT-tagged source
#[tokio::test]
async fn test_run_withTranscribeMode_shouldUseTranscriber() -> Result<()> {
    let input_dir = common::create_temp_dir()?;
    let video = common::create_dummy_video(input_dir.path(), "lecture.mp4")?;

    let transcriber = MockTranscriber::new(vec![
        TimedSegment::new(0.5, 2.0, "  Добрый   день "),
        TimedSegment::new(2.0, 3.0, "   "),
        TimedSegment::new(3.0, 4.5, "Начнём."),
    ]);
    let translator = MockTranslator::working();
    let mut config = common::offline_config();
    config.source.mode = SourceMode::Transcribe;
    let app = Controller::with_services(
        config,
        Arc::new(MockMediaTool::default()),
        Arc::new(transcriber.clone()),
        Arc::new(translator.clone()),
    );

    app.run(&video, input_dir.path(), false).await?;

    assert_eq!(transcriber.call_count(), 1);
    assert_eq!(translator.request_count(), 2);

    let source_json = input_dir.path().join("lecture.source.json");
    let source = yassa::document_cache::read_document(&source_json)?;
    assert_eq!(source.metadata.source_format, SubtitleFormat::Srt);
    assert_eq!(source.segments[0].text, "Добрый день");
    assert_eq!(source.len(), 2);

    let ass = read_ass(&input_dir.path().join("lecture.ass"))?;
    assert!(ass.contains("Dialogue: 0,0:00:00.50,0:00:02.00,OP,,0,0,0,,[uk] Добрый день"));
    Ok(())
}

/// Test embedded mode: bitmap streams are skipped and the language preference applies
#[tokio::test]
async fn test_run_withEmbeddedMode_shouldExtractTextStream() -> Result<()> {
    let input_dir = common::create_temp_dir()?;
    let video = common::create_dummy_video(input_dir.path(), "movie.mkv")?;

    let media = MockMediaTool::new(
        vec![
            subtitle_stream(2, "hdmv_pgs_subtitle", "rus"),
            subtitle_stream(3, "subrip", "eng"),
            subtitle_stream(4, "subrip", "rus"),
        ],
        common::SAMPLE_SRT,
    );
    let mut config = common::offline_config();
    config.source.mode = SourceMode::Embedded;
    let app = Controller::with_services(
        config.clone(),
        Arc::new(media.clone()),
        Arc::new(MockTranscriber::default()),
        Arc::new(MockTranslator::working()),
    );

    assert!(matches!(app.run(&video, input_dir.path(), false).await?, RunOutcome::Written(_)));
    let document = SubtitleDocument::parse_file(input_dir.path().join("movie.ass"), TimeParseMode::Strict)?;
    assert_eq!(document.len(), 3);

    // An explicitly chosen bitmap stream cannot be used
    config.source.stream_index = Some(2);
    let app = Controller::with_services(
        config.clone(),
        Arc::new(media.clone()),
        Arc::new(MockTranscriber::default()),
        Arc::new(MockTranslator::working()),
    );
    assert!(app.acquire_source(&video).await.is_err());

    // So can an index the container does not have
    config.source.stream_index = Some(9);
    let app = Controller::with_services(
        config,
        Arc::new(media),
        Arc::new(MockTranscriber::default()),
        Arc::new(MockTranslator::working()),
    );
    assert!(app.acquire_source(&video).await.is_err());
    Ok(())
}

/// Test that auto mode falls back to transcription when nothing else exists
#[tokio::test]
async fn test_acquire_source_withAutoModeAndNoSubtitles_shouldTranscribe() -> Result<()> {
    let input_dir = common::create_temp_dir()?;
    let video = common::create_dummy_video(input_dir.path(), "clip.mkv")?;

    let transcriber = MockTranscriber::new(vec![TimedSegment::new(0.0, 1.0, "Привет")]);
    let mut config = common::offline_config();
    config.source.mode = SourceMode::Auto;
    let app = Controller::with_services(
        config,
        Arc::new(MockMediaTool::default()),
        Arc::new(transcriber.clone()),
        Arc::new(MockTranslator::working()),
    );

    let document = app.acquire_source(&video).await?;
    assert_eq!(document.segments, vec![TimedSegment::new(0.0, 1.0, "Привет")]);
    assert_eq!(transcriber.call_count(), 1);
    Ok(())
}

/// Test that matching languages skip translation entirely
#[tokio::test]
async fn test_run_withSameSourceAndTarget_shouldNotTranslate() -> Result<()> {
    let input_dir = common::create_temp_dir()?;
    let video = common::create_dummy_video(input_dir.path(), "episode01.mkv")?;
    common::create_test_file(input_dir.path(), "episode01.ru.srt", common::SAMPLE_SRT)?;

    let translator = MockTranslator::working();
    let mut config = common::offline_config();
    config.target_language = "rus".to_string();
    let app = controller(config, &translator);

    app.run(&video, input_dir.path(), false).await?;

    assert_eq!(translator.request_count(), 0);
    let ass = read_ass(&input_dir.path().join("episode01.ass"))?;
    assert!(ass.contains(",,Как дела?"));
    assert!(!input_dir.path().join("episode01.rus.json").exists());
    Ok(())
}

/// Test that extra formats are written next to the ASS file
#[tokio::test]
async fn test_run_withExtraFormats_shouldWriteEachFormat() -> Result<()> {
    let input_dir = common::create_temp_dir()?;
    let output_dir = common::create_temp_dir()?;
    let video = common::create_dummy_video(input_dir.path(), "episode01.mkv")?;
    common::create_test_file(input_dir.path(), "episode01.ru.srt", common::SAMPLE_SRT)?;

    let mut config = common::offline_config();
    config.output.extra_formats = vec![SubtitleFormat::Srt, SubtitleFormat::Vtt, SubtitleFormat::Ass];
    let app = controller(config, &MockTranslator::working());

    app.run(&video, output_dir.path(), false).await?;

    let srt = fs::read_to_string(output_dir.path().join("episode01.srt"))?;
    assert!(srt.starts_with("1\n00:00:01,500 --> 00:00:03,000\n[uk] Привет, мир!\n"));
    let vtt = fs::read_to_string(output_dir.path().join("episode01.vtt"))?;
    assert!(vtt.starts_with("WEBVTT\n\n00:00:01.500 --> 00:00:03.000\n[uk] Привет, мир!\n"));
    Ok(())
}

/// Test that translation failure aborts the run without writing output
#[tokio::test]
async fn test_run_withFailingTranslator_shouldNotWriteOutput() -> Result<()> {
    let input_dir = common::create_temp_dir()?;
    let output_dir = common::create_temp_dir()?;
    let video = common::create_dummy_video(input_dir.path(), "episode01.mkv")?;
    common::create_test_file(input_dir.path(), "episode01.ru.srt", common::SAMPLE_SRT)?;

    let app = controller(common::offline_config(), &MockTranslator::failing());

    assert!(app.run(&video, output_dir.path(), false).await.is_err());
    assert!(!output_dir.path().join("episode01.ass").exists());
    assert!(!output_dir.path().join("episode01.uk.json").exists());
    // The source side document is kept for the next attempt
    assert!(output_dir.path().join("episode01.source.json").is_file());
    Ok(())
}

/// Test that a folder run processes every video and tolerates failures
#[tokio::test]
async fn test_run_folder_withSeveralVideos_shouldProcessEach() -> Result<()> {
    let input_dir = common::create_temp_dir()?;
    let output_dir = common::create_temp_dir()?;
    for name in ["alpha", "beta", "gamma"] {
        common::create_dummy_video(input_dir.path(), &format!("{}.mkv", name))?;
    }
    common::create_test_file(input_dir.path(), "alpha.ru.srt", common::SAMPLE_SRT)?;
    common::create_test_file(input_dir.path(), "beta.ru.vtt", common::SAMPLE_VTT)?;

    let app = controller(common::offline_config(), &MockTranslator::working());

    app.run_folder(input_dir.path(), Some(output_dir.path()), false).await?;

    assert!(output_dir.path().join("alpha.ass").is_file());
    assert!(output_dir.path().join("beta.ass").is_file());
    // gamma has no subtitles and fails on its own
    assert!(!output_dir.path().join("gamma.ass").exists());

    let empty_dir = common::create_temp_dir()?;
    assert!(app.run_folder(empty_dir.path(), None, false).await.is_err());
    Ok(())
}

/// Test controller construction from configuration
#[test]
fn test_with_config_withProviderSettings_shouldBuildServices() {
    assert!(Controller::with_config(Config::default()).is_err());

    let app = Controller::with_config(common::offline_config());
    assert!(app.is_ok());
    if let Ok(app) = app {
        assert_eq!(app.translation_service().provider_name(), "ollama");
        assert_eq!(app.config().source.mode, SourceMode::External);
    }
}
