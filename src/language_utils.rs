/*!
 * Language utilities: ISO 639 code handling and subtitle language detection.
 *
 * Codes may be ISO 639-1 (2-letter), ISO 639-2/T or ISO 639-2/B (3-letter).
 */

use anyhow::{anyhow, Result};
use isolang::Language;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::errors::SubtitleError;
use crate::file_utils::FileManager;
use crate::subtitle_processor::{SubtitleDocument, SubtitleFormat};

// @const: Characters sampled for content-based detection
const CONTENT_SAMPLE_CHARS: usize = 1000;

// Letters that only occur in Ukrainian among Cyrillic languages we detect
const UKRAINIAN_LETTERS: [char; 8] = ['ґ', 'є', 'і', 'ї', 'Ґ', 'Є', 'І', 'Ї'];

// Filename tokens per language, checked in this order
static FILENAME_PATTERNS: Lazy<Vec<(Language, Regex)>> = Lazy::new(|| {
    [
        (Language::Rus, r"\b(?:ru|russian|rus|рус)\b"),
        (Language::Eng, r"\b(?:en|english|eng)\b"),
        (Language::Ukr, r"\b(?:ukr|ukrainian|ua|укр)\b"),
        (Language::Jpn, r"\b(?:jap|japanese|jpn|ja)\b"),
        (Language::Deu, r"\b(?:ger|german|deu|de)\b"),
        (Language::Fra, r"\b(?:fra|french|fre|fr)\b"),
        (Language::Spa, r"\b(?:esp|spanish|spa|es)\b"),
    ]
    .into_iter()
    .map(|(language, pattern)| (language, Regex::new(pattern).unwrap()))
    .collect()
});

// ISO 639-2/B codes that differ from their 639-2/T form
fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    let part2t = match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        _ => return None,
    };
    Some(part2t)
}

/// Resolve an ISO 639-1, 639-2/T or 639-2/B code to a language
pub fn resolve_language(code: &str) -> Option<Language> {
    let code = code.trim().to_lowercase();
    match code.len() {
        2 => Language::from_639_1(&code),
        3 => Language::from_639_3(&code)
            .or_else(|| part2b_to_part2t(&code).and_then(Language::from_639_3)),
        _ => None,
    }
}

/// Validate that a code names a known language
pub fn validate_language_code(code: &str) -> Result<Language> {
    resolve_language(code).ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 if one exists, else ISO 639-2/T
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let language = resolve_language(code)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;
    Ok(short_code(language))
}

/// Check if two language codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (resolve_language(code1), resolve_language(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let language = validate_language_code(code)?;
    Ok(language.to_name().to_string())
}

/// Two-letter code when one exists, otherwise the three-letter code
pub fn short_code(language: Language) -> String {
    language
        .to_639_1()
        .unwrap_or_else(|| language.to_639_3())
        .to_string()
}

/// Display code for a detected language, `"unknown"` when undetected
pub fn language_code(language: Option<Language>) -> String {
    language.map(short_code).unwrap_or_else(|| "unknown".to_string())
}

/// Lowercase English name for a detected language, `"unknown"` when undetected
pub fn language_name(language: Option<Language>) -> String {
    language
        .map(|l| l.to_name().to_lowercase())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Detect a language from language tokens in a file name
pub fn detect_language_from_filename(file_name: &str) -> Option<Language> {
    // `_` is a word character for `\b`, so treat it as a separator first
    let name = file_name.to_lowercase().replace('_', ".");
    FILENAME_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(&name))
        .map(|(language, _)| *language)
}

/// Detect Russian, Ukrainian or English from the ratio of Cyrillic to Latin letters
pub fn detect_language_from_text(text: &str) -> Option<Language> {
    let mut cyrillic = 0usize;
    let mut latin = 0usize;
    let mut ukrainian = 0usize;

    for c in text.chars().take(CONTENT_SAMPLE_CHARS) {
        if ('\u{0400}'..='\u{04FF}').contains(&c) && c.is_alphabetic() {
            cyrillic += 1;
            if UKRAINIAN_LETTERS.contains(&c) {
                ukrainian += 1;
            }
        } else if c.is_ascii_alphabetic() {
            latin += 1;
        }
    }

    let total = cyrillic + latin;
    if total == 0 {
        return None;
    }

    let cyrillic_ratio = cyrillic as f64 / total as f64;
    if cyrillic_ratio > 0.7 {
        if ukrainian as f64 > cyrillic as f64 * 0.1 {
            Some(Language::Ukr)
        } else {
            Some(Language::Rus)
        }
    } else if cyrillic_ratio < 0.3 {
        Some(Language::Eng)
    } else {
        None
    }
}

/// Detect a subtitle file's language from its dialogue text.
///
/// Header and markup are skipped when the file parses; otherwise the raw text is used.
pub fn detect_language_from_content<P: AsRef<Path>>(path: P) -> Result<Option<Language>, SubtitleError> {
    let path = path.as_ref();
    let content = FileManager::read_subtitle_file(path)?;

    let dialogue = SubtitleFormat::from_path(path)
        .map(|format| SubtitleDocument::parse_str(&content, format))
        .filter(|document| !document.is_empty())
        .map(|document| {
            let mut text = String::new();
            for segment in &document.segments {
                if text.chars().count() >= CONTENT_SAMPLE_CHARS {
                    break;
                }
                text.push_str(&segment.text);
                text.push(' ');
            }
            text
        });

    Ok(detect_language_from_text(dialogue.as_deref().unwrap_or(&content)))
}

/// Detect a subtitle file's language: file name first, then content
pub fn detect_subtitle_language<P: AsRef<Path>>(path: P) -> Option<Language> {
    let path = path.as_ref();
    let file_name = path.file_name()?.to_string_lossy();

    if let Some(language) = detect_language_from_filename(&file_name) {
        return Some(language);
    }

    match detect_language_from_content(path) {
        Ok(language) => language,
        Err(e) => {
            debug!("Content language detection failed for {:?}: {}", path, e);
            None
        }
    }
}
