/*!
 * Tests for external subtitle discovery and ranking
 */

use anyhow::Result;
use isolang::Language;
use std::fs;
use yassa::subtitle_matcher::{
    clean_name, find_external_subtitles, get_subtitle_preview, match_score, select_candidate, MatchOptions,
};
use yassa::subtitle_processor::SubtitleFormat;
use crate::common;

/// Test that release noise, brackets and trailing language tags are dropped
#[test]
fn test_clean_name_withReleaseName_shouldKeepTitleWords() {
    assert_eq!(clean_name("[Subs] My.Show.S02E05.720p.HDTV.x265-GRP.mkv"), "my show s02e05 grp");
    assert_eq!(clean_name("My_Show_S02E05.eng.sdh.srt"), "my show s02e05");
    assert_eq!(clean_name("  "), "");
}

/// Test the fixed score tiers
#[test]
fn test_match_score_withNameRelations_shouldUseTiers() {
    assert_eq!(match_score("Show.S01E02.1080p.mkv", "Show.S01E02.rus.srt"), 1.0);
    assert_eq!(match_score("Show.S01E02.mkv", "Show.S01E02.Extended.srt"), 0.9);
    assert_eq!(match_score("Show.S01E02.Extended.mkv", "Show.S01E02.srt"), 0.8);
}

/// Test word-set similarity with and without the bonus
#[test]
fn test_match_score_withPartialOverlap_shouldUseJaccard() {
    assert_eq!(match_score("alpha.beta.gamma.mkv", "alpha.beta.delta.srt"), 0.5);
    assert_eq!(match_score("alpha.beta.gamma.delta.mkv", "alpha.beta.gamma.omega.srt"), 0.75);

    let third = match_score("alpha.beta.mkv", "alpha.gamma.srt");
    assert!((third - 1.0 / 3.0).abs() < 1e-9);
}

/// Test that unrelated or empty names score zero
#[test]
fn test_match_score_withUnrelatedNames_shouldReturnZero() {
    assert_eq!(match_score("episode01.mkv", "totally_unrelated.srt"), 0.0);
    assert_eq!(match_score("[Group].mkv", "episode01.srt"), 0.0);
}

/// Test discovery, ranking, language detection and filtering in one folder
#[test]
fn test_find_external_subtitles_withMixedFolder_shouldRankMatches() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let video = common::create_dummy_video(dir, "episode01.mkv")?;
    common::create_test_file(dir, "episode01.ru.srt", common::SAMPLE_SRT)?;
    common::create_test_file(dir, "episode01.en.vtt", common::SAMPLE_VTT)?;
    common::create_test_file(dir, "totally_unrelated.srt", common::SAMPLE_SRT)?;
    common::create_test_file(dir, "episode01.txt", "not a subtitle")?;

    let candidates = find_external_subtitles(&video, &[dir.to_path_buf()], &MatchOptions::default());

    assert_eq!(candidates.len(), 2);
    // Equal scores keep file name order
    assert_eq!(candidates[0].file_name(), "episode01.en.vtt");
    assert_eq!(candidates[0].format, SubtitleFormat::Vtt);
    assert_eq!(candidates[0].language, Some(Language::Eng));
    assert_eq!(candidates[1].file_name(), "episode01.ru.srt");
    assert_eq!(candidates[1].language_code(), "ru");
    assert_eq!(candidates[1].match_score, 1.0);
    assert_eq!(candidates[1].size, common::SAMPLE_SRT.len() as u64);
    Ok(())
}

/// Test that subdirectories are searched and duplicate directories deduplicated
#[test]
fn test_find_external_subtitles_withRepeatedDirs_shouldNotDuplicate() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let video = common::create_dummy_video(dir, "episode01.mkv")?;
    fs::create_dir(dir.join("subs"))?;
    common::create_test_file(&dir.join("subs"), "episode01.ukr.ass", common::SAMPLE_ASS)?;

    let search_dirs = vec![dir.to_path_buf(), dir.join("subs"), dir.join("missing")];
    let candidates = find_external_subtitles(&video, &search_dirs, &MatchOptions::default());

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].language, Some(Language::Ukr));

    let shallow = MatchOptions {
        recursive: false,
        ..MatchOptions::default()
    };
    assert!(find_external_subtitles(&video, &[dir.to_path_buf()], &shallow).is_empty());
    Ok(())
}

/// Test that the minimum score is an exclusive bound
#[test]
fn test_find_external_subtitles_withScoreAtThreshold_shouldExclude() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let video = common::create_dummy_video(dir, "alpha.beta.gamma.mkv")?;
    common::create_test_file(dir, "alpha.beta.delta.srt", common::SAMPLE_SRT)?;

    let at_half = MatchOptions {
        min_score: 0.5,
        ..MatchOptions::default()
    };
    assert!(find_external_subtitles(&video, &[dir.to_path_buf()], &at_half).is_empty());
    assert_eq!(find_external_subtitles(&video, &[dir.to_path_buf()], &MatchOptions::default()).len(), 1);
    Ok(())
}

/// Test that the preferred language wins over rank and falls back to the best match
#[test]
fn test_select_candidate_withPreferredLanguage_shouldPickIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let video = common::create_dummy_video(dir, "episode01.mkv")?;
    common::create_test_file(dir, "episode01.en.srt", "1\n00:00:01,000 --> 00:00:02,000\nHello\n")?;
    common::create_test_file(dir, "episode01.ru.srt", common::SAMPLE_SRT)?;

    let candidates = find_external_subtitles(&video, &[dir.to_path_buf()], &MatchOptions::default());

    let russian = select_candidate(&candidates, Some("rus")).map(|c| c.file_name());
    assert_eq!(russian.as_deref(), Some("episode01.ru.srt"));

    let fallback = select_candidate(&candidates, Some("ja")).map(|c| c.file_name());
    assert_eq!(fallback.as_deref(), Some("episode01.en.srt"));

    assert!(select_candidate(&[], Some("ru")).is_none());
    Ok(())
}

/// Test that the preview skips short lines and truncates long ones
#[test]
fn test_get_subtitle_preview_withMixedLines_shouldFilterAndTruncate() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let long_line = "x".repeat(150);
    let content = format!(
        "1\n00:00:01,000 --> 00:00:02,000\nHey!\n\n\
         2\n00:00:03,000 --> 00:00:04,000\nThis is the first real line\n\n\
         3\n00:00:05,000 --> 00:00:06,000\n{}\n\n\
         4\n00:00:07,000 --> 00:00:08,000\nAnother readable line\n",
        long_line
    );
    let path = common::create_test_file(temp_dir.path(), "preview.srt", &content)?;

    let preview = get_subtitle_preview(&path, 2)?;
    assert_eq!(preview.len(), 2);
    assert_eq!(preview[0], "This is the first real line");
    assert_eq!(preview[1], format!("{}...", "x".repeat(100)));
    Ok(())
}

/// Test the preview of ASS dialogue and WebVTT cues
#[test]
fn test_get_subtitle_preview_withAssAndVtt_shouldReadDialogue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let ass_path = common::create_test_file(temp_dir.path(), "preview.ass", common::SAMPLE_ASS)?;
    let vtt_path = common::create_test_file(temp_dir.path(), "preview.vtt", common::SAMPLE_VTT)?;

    assert_eq!(get_subtitle_preview(&ass_path, 5)?, vec!["Hello, world", "Second line wrapped"]);
    assert_eq!(get_subtitle_preview(&vtt_path, 1)?, vec!["Hi there"]);
    assert!(get_subtitle_preview(&vtt_path, 0)?.is_empty());
    Ok(())
}

/// Test that a subtitle file without a subtitle extension is recognized by content
#[test]
fn test_get_subtitle_preview_withoutExtension_shouldSniffFormat() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "subs.txt", common::SAMPLE_SRT)?;

    assert_eq!(get_subtitle_preview(&path, 1)?, vec!["Привет, мир!"]);

    let notes = common::create_test_file(temp_dir.path(), "notes.txt", "nothing to see")?;
    assert!(get_subtitle_preview(&notes, 1).is_err());
    Ok(())
}
