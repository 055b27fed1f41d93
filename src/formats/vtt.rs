use once_cell::sync::Lazy;
use regex::Regex;
use log::debug;
use std::fmt::Write;

use crate::subtitle_processor::TimedSegment;
use crate::text_normalizer::{normalize, strip_markup_tags};
use crate::timecode::{format_vtt_time, parse_vtt_time};

use super::normalize_line_endings;

// @const: Cue timing line; cue settings after the end time are ignored
static TIMING_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((?:\d{2,}:)?\d{2}:\d{2}\.\d{3})\s*-->\s*((?:\d{2,}:)?\d{2}:\d{2}\.\d{3})").unwrap()
});

// Blocks that carry no cues
const NON_CUE_BLOCKS: [&str; 3] = ["NOTE", "STYLE", "REGION"];

/// Parse WebVTT content into segments, skipping malformed cues
pub fn parse(content: &str) -> Vec<TimedSegment> {
    let content = normalize_line_endings(content);
    let lines: Vec<&str> = content.lines().collect();
    let mut segments = Vec::new();
    let mut i = skip_blank(&lines, 0);

    // Header: the WEBVTT line plus metadata lines, stopping early at a cue timing line
    if i < lines.len() && lines[i].trim_start_matches('\u{FEFF}').starts_with("WEBVTT") {
        i += 1;
        while i < lines.len() && !lines[i].trim().is_empty() && !lines[i].contains("-->") {
            i += 1;
        }
    }

    loop {
        i = skip_blank(&lines, i);
        if i >= lines.len() {
            break;
        }

        let current = lines[i].trim();
        if !current.contains("-->") && is_non_cue_block(current) {
            i = skip_block(&lines, i);
            continue;
        }

        // Optional cue identifier
        if !current.contains("-->") {
            i += 1;
            if i >= lines.len() {
                break;
            }
        }

        let timing = lines[i].trim();
        let times = TIMING_LINE.captures(timing).and_then(|caps| {
            match (parse_vtt_time(&caps[1]), parse_vtt_time(&caps[2])) {
                (Ok(start), Ok(end)) => Some((start, end)),
                _ => None,
            }
        });
        i += 1;

        let Some((start, end)) = times else {
            debug!("Skipping malformed VTT timing line '{}'", timing);
            continue;
        };

        let mut text_lines = Vec::new();
        while i < lines.len() && !lines[i].trim().is_empty() {
            text_lines.push(lines[i].trim());
            i += 1;
        }

        let text = normalize(&decode_entities(&strip_markup_tags(&text_lines.join(" "))));
        if text.is_empty() {
            debug!("Skipping VTT cue at {}: empty text", timing);
            continue;
        }
        segments.push(TimedSegment::new(start, end, text));
    }

    segments
}

fn is_non_cue_block(line: &str) -> bool {
    NON_CUE_BLOCKS.iter().any(|keyword| {
        line == *keyword
            || line
                .strip_prefix(keyword)
                .is_some_and(|rest| rest.starts_with(char::is_whitespace))
    })
}

fn skip_blank(lines: &[&str], mut i: usize) -> usize {
    while i < lines.len() && lines[i].trim().is_empty() {
        i += 1;
    }
    i
}

fn skip_block(lines: &[&str], mut i: usize) -> usize {
    while i < lines.len() && !lines[i].trim().is_empty() {
        i += 1;
    }
    i
}

/// Decode the few entities that show up in real cue text
fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Serialize segments as WebVTT
pub fn serialize(segments: &[TimedSegment]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in segments {
        // Writing into a String cannot fail
        let _ = write!(
            out,
            "{} --> {}\n{}\n\n",
            format_vtt_time(segment.start),
            format_vtt_time(segment.end),
            segment.text
        );
    }
    out
}
