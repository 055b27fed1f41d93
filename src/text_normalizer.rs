/*!
 * Dialogue text cleanup.
 *
 * `normalize` is safe to call any number of times: the output of one pass is a
 * fixed point of the next.
 */

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// A tag never contains another brace, so a stray `{` cannot start one
static SPACE_AFTER_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\{[^{}]*\})\s+").unwrap());

static SPACE_BEFORE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+(\{[^{}]*\})").unwrap());

static OVERRIDE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").unwrap());

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Collapse whitespace and tighten spacing around `{...}` override tags
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let collapsed = collapse_whitespace(text);
    let tightened = SPACE_AFTER_TAG.replace_all(&collapsed, "$1");
    SPACE_BEFORE_TAG.replace_all(&tightened, "$1").into_owned()
}

/// Replace every whitespace run (tabs, NBSP and other Unicode spaces included)
/// with one ASCII space and trim both ends
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

/// Remove `{...}` ASS override blocks
pub fn strip_override_tags(text: &str) -> String {
    OVERRIDE_TAG.replace_all(text, "").into_owned()
}

/// Remove `<...>` HTML-like markup (SRT italics, VTT class/voice spans)
pub fn strip_markup_tags(text: &str) -> String {
    MARKUP_TAG.replace_all(text, "").into_owned()
}

/// Turn the literal ASS line-break markers `\N` and `\n` (and real newlines) into spaces
pub fn flatten_ass_line_breaks(text: &str) -> String {
    text.replace("\\N", " ")
        .replace("\\n", " ")
        .replace(['\r', '\n'], " ")
}
