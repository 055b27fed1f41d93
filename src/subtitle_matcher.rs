/*!
 * External subtitle discovery.
 *
 * Subtitle files sitting next to (or near) a video are ranked by how closely
 * their cleaned file names match the video's cleaned name:
 *
 * | score        | meaning                                   |
 * |--------------|-------------------------------------------|
 * | 1.0          | identical cleaned names                   |
 * | 0.9          | subtitle name contains the video name     |
 * | 0.8          | video name contains the subtitle name     |
 * | 0.0 .. 0.75  | word-set Jaccard similarity (with bonus)  |
 */

use isolang::Language;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::SubtitleError;
use crate::file_utils::FileManager;
use crate::formats::{ass, normalize_line_endings};
use crate::language_utils::{self, language_code};
use crate::subtitle_processor::SubtitleFormat;
use crate::text_normalizer::{normalize, strip_markup_tags};

// @const: Preview lines shorter than this are noise (sound cues, "...", numbers)
const PREVIEW_MIN_CHARS: usize = 5;

// @const: Preview line truncation length
const PREVIEW_MAX_CHARS: usize = 100;

// @const: Cap for the Jaccard bonus, below the containment tiers
const JACCARD_BONUS_CAP: f64 = 0.75;

static KNOWN_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.(?:mkv|mp4|avi|mov|wmv|flv|webm|m4v|mpe?g|ts|m2ts|srt|ass|ssa|vtt)$").unwrap()
});

static BRACKET_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").unwrap());

// Release noise, applied in order: resolution, source, codec/audio
static RELEASE_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(?:2160|1440|1080|720|576|480)[pi]\b|\b(?:4k|uhd)\b",
        r"\b(?:web[ ._-]?dl|web[ ._-]?rip|blu[ ._-]?ray|bd[ ._-]?rip|br[ ._-]?rip|hd[ ._-]?rip|dvd[ ._-]?rip|hdtv|remux)\b",
        r"\b(?:[xh][ .]?26[45]|hevc|avc|xvid|divx|10[ ._-]?bit|8[ ._-]?bit|hdr(?:10)?|aac(?:2[ .]0)?|ac3|e?ac3|dts(?:[ ._-]?hd)?|flac|ddp?[ .]?[257][ .][01]|mp3|opus)\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[._-]+").unwrap());

static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// Language codes and subtitle flags that trail subtitle names ("show.e01.rus.forced.srt")
const TRAILING_TOKENS: [&str; 21] = [
    "ru", "rus", "en", "eng", "uk", "ukr", "ua", "ja", "jpn", "jap", "de", "ger", "fr", "fra",
    "es", "esp", "spa", "forced", "sdh", "full", "signs",
];

/// Reduce a media or subtitle file name to the words that identify the title/episode
pub fn clean_name(name: &str) -> String {
    let mut cleaned = name.trim().to_lowercase();
    cleaned = KNOWN_EXTENSION.replace(&cleaned, "").into_owned();
    cleaned = BRACKET_GROUP.replace_all(&cleaned, " ").into_owned();
    for pattern in RELEASE_NOISE.iter() {
        cleaned = pattern.replace_all(&cleaned, " ").into_owned();
    }
    cleaned = SEPARATORS.replace_all(&cleaned, " ").into_owned();

    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    while words.len() > 1 && words.last().is_some_and(|w| TRAILING_TOKENS.contains(w)) {
        words.pop();
    }

    SPACES.replace_all(&words.join(" "), " ").trim().to_string()
}

/// Score how well a subtitle file name matches a video file name, in `[0, 1]`
pub fn match_score(video_name: &str, subtitle_name: &str) -> f64 {
    let video = clean_name(video_name);
    let subtitle = clean_name(subtitle_name);

    if video.is_empty() || subtitle.is_empty() {
        return 0.0;
    }
    if video == subtitle {
        return 1.0;
    }
    if subtitle.contains(&video) {
        return 0.9;
    }
    if video.contains(&subtitle) {
        return 0.8;
    }

    let video_words: HashSet<&str> = video.split_whitespace().collect();
    let subtitle_words: HashSet<&str> = subtitle.split_whitespace().collect();
    let union = video_words.union(&subtitle_words).count();
    if union == 0 {
        return 0.0;
    }
    let jaccard = video_words.intersection(&subtitle_words).count() as f64 / union as f64;

    if jaccard > 0.5 {
        (jaccard + 0.2).min(JACCARD_BONUS_CAP)
    } else {
        jaccard
    }
}

/// Search settings for external subtitles
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    /// Candidates must score strictly above this
    pub min_score: f64,

    /// Descend into subdirectories
    pub recursive: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            min_score: 0.3,
            recursive: true,
        }
    }
}

/// A subtitle file that plausibly belongs to a video
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCandidate {
    pub path: PathBuf,
    pub language: Option<Language>,
    pub format: SubtitleFormat,
    pub match_score: f64,
    /// File size in bytes
    pub size: u64,
}

impl SubtitleCandidate {
    /// Detected language code or `"unknown"`
    pub fn language_code(&self) -> String {
        language_code(self.language)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

impl fmt::Display for SubtitleCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}  {:<7}  {:<3}  {:>9} B  {}",
            self.match_score,
            self.language_code(),
            self.format,
            self.size,
            self.path.display()
        )
    }
}

/// Find subtitle files for a video across several directories, best match first.
///
/// Missing directories are skipped. Ties keep discovery order (directory order, then
/// file name order).
pub fn find_external_subtitles<P: AsRef<Path>>(
    video_path: P,
    search_dirs: &[PathBuf],
    options: &MatchOptions,
) -> Vec<SubtitleCandidate> {
    let video_path = video_path.as_ref();
    let video_name = video_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for dir in search_dirs {
        if !FileManager::dir_exists(dir) {
            debug!("Subtitle search directory does not exist: {:?}", dir);
            continue;
        }

        let files = match FileManager::find_subtitle_files(dir, options.recursive) {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to scan {:?} for subtitles: {}", dir, e);
                continue;
            }
        };

        for path in files {
            let key = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            if !seen.insert(key) {
                continue;
            }
            if let Some(candidate) = evaluate_candidate(&video_name, path, options) {
                candidates.push(candidate);
            }
        }
    }

    // Stable sort: equal scores keep discovery order
    candidates.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
    debug!("Found {} external subtitle candidates for {}", candidates.len(), video_name);
    candidates
}

fn evaluate_candidate(
    video_name: &str,
    path: PathBuf,
    options: &MatchOptions,
) -> Option<SubtitleCandidate> {
    let format = SubtitleFormat::from_path(&path)?;
    let file_name = path.file_name()?.to_string_lossy().to_string();

    let score = match_score(video_name, &file_name);
    if score <= options.min_score {
        return None;
    }

    let size = match fs::metadata(&path) {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            debug!("Skipping {:?}: {}", path, e);
            return None;
        }
    };

    Some(SubtitleCandidate {
        language: language_utils::detect_subtitle_language(&path),
        path,
        format,
        match_score: score,
        size,
    })
}

/// Pick a candidate: the best one in the preferred language if any, else the best overall
pub fn select_candidate<'a>(
    candidates: &'a [SubtitleCandidate],
    preferred_language: Option<&str>,
) -> Option<&'a SubtitleCandidate> {
    let preferred = preferred_language.and_then(language_utils::resolve_language);
    preferred
        .and_then(|language| candidates.iter().find(|c| c.language == Some(language)))
        .or_else(|| candidates.first())
}

/// First `max_lines` dialogue lines of a subtitle file, for a quick look.
///
/// A light line scan per format that stops as soon as enough lines are found.
/// Lines of five characters or fewer are skipped, long ones are cut at 100
/// characters with `...` appended.
pub fn get_subtitle_preview<P: AsRef<Path>>(path: P, max_lines: usize) -> Result<Vec<String>, SubtitleError> {
    let (content, format) = FileManager::read_subtitle_with_format(path.as_ref())?;
    let content = normalize_line_endings(&content);

    let mut preview = Vec::new();
    if max_lines == 0 {
        return Ok(preview);
    }
    let mut keep = |text: String| {
        if text.chars().count() > PREVIEW_MIN_CHARS {
            preview.push(truncate_preview(&text));
        }
        preview.len() >= max_lines
    };

    match format {
        SubtitleFormat::Ass | SubtitleFormat::Ssa => {
            for line in content.lines() {
                let Some(fields) = line.trim_start().strip_prefix("Dialogue:") else {
                    continue;
                };
                let Some(raw_text) = fields.splitn(10, ',').nth(9) else {
                    continue;
                };
                if keep(ass::clean_dialogue_text(raw_text)) {
                    break;
                }
            }
        }
        // Cue text is whatever follows a timing line, up to the next blank line
        SubtitleFormat::Srt | SubtitleFormat::Vtt => {
            let mut lines = content.lines();
            while let Some(line) = lines.next() {
                if !line.contains("-->") {
                    continue;
                }
                let cue: Vec<&str> = lines.by_ref().map(str::trim).take_while(|l| !l.is_empty()).collect();
                if keep(normalize(&strip_markup_tags(&cue.join(" ")))) {
                    break;
                }
            }
        }
    }

    Ok(preview)
}

fn truncate_preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_MAX_CHARS {
        let mut cut: String = text.chars().take(PREVIEW_MAX_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}
