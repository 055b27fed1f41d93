/*!
 * Tests for the SRT, WebVTT and ASS parsers and serializers
 */

use yassa::formats::ass::{self, dialogue_line, escape_dialogue_text, FULLWIDTH_COMMA};
use yassa::formats::{srt, vtt, AssStyling, StyleMap, StyleRules, StyleTemplate};
use yassa::subtitle_processor::TimedSegment;
use yassa::timecode::TimeParseMode;
use crate::common;

fn sample_segments() -> Vec<TimedSegment> {
    vec![
        TimedSegment::new(1.5, 3.0, "Привет, мир!"),
        TimedSegment::new(4.0, 6.25, "Как дела?"),
        TimedSegment::new(70.0, 72.0, "Всё хорошо, спасибо."),
    ]
}

/// Test that SRT blocks parse with markup removed and lines joined
#[test]
fn test_srt_parse_withSampleContent_shouldReturnSegments() {
    let segments = srt::parse(common::SAMPLE_SRT);
    assert_eq!(segments, sample_segments());
}

/// Test that CRLF line endings parse like LF
#[test]
fn test_srt_parse_withCrlfLineEndings_shouldParse() {
    let content = common::SAMPLE_SRT.replace('\n', "\r\n");
    assert_eq!(srt::parse(&content), sample_segments());
}

/// Test that malformed and empty blocks are skipped without dropping the rest
#[test]
fn test_srt_parse_withMalformedBlocks_shouldSkipThem() {
    let content = "x\n00:00:01,000 --> 00:00:02,000\nbad index\n\n\
                   2\n00:00:02,000 -> 00:00:03,000\nbad arrow\n\n\
                   3\n00:00:03,000 --> 00:00:04,000\n<i></i>\n\n\
                   4\n00:00:05,000 --> 00:00:06,000 X1:10 X2:20\nkept\n";
    let segments = srt::parse(content);
    assert_eq!(segments, vec![TimedSegment::new(5.0, 6.0, "kept")]);
}

/// Test that a leading byte-order mark does not hide the first block
#[test]
fn test_srt_parse_withBom_shouldParseFirstBlock() {
    let content = "\u{FEFF}1\n00:00:01,000 --> 00:00:02,000\nFirst\n\n2\n00:00:03,000 --> 00:00:04,000\nSecond\n";
    let segments = srt::parse(content);
    assert_eq!(
        segments,
        vec![TimedSegment::new(1.0, 2.0, "First"), TimedSegment::new(3.0, 4.0, "Second")]
    );
}

/// Test that empty content yields no segments
#[test]
fn test_srt_parse_withEmptyContent_shouldReturnEmpty() {
    assert!(srt::parse("").is_empty());
    assert!(srt::parse("\n\n  \n").is_empty());
}

/// Test that SRT serialization renumbers from one
#[test]
fn test_srt_serialize_withSegments_shouldNumberSequentially() {
    let out = srt::serialize(&sample_segments()[..2]);
    assert_eq!(
        out,
        "1\n00:00:01,500 --> 00:00:03,000\nПривет, мир!\n\n2\n00:00:04,000 --> 00:00:06,250\nКак дела?\n\n"
    );
}

/// Test that VTT cues parse with identifiers, notes and spans handled
#[test]
fn test_vtt_parse_withSampleContent_shouldReturnSegments() {
    let segments = vtt::parse(common::SAMPLE_VTT);
    assert_eq!(
        segments,
        vec![
            TimedSegment::new(1.5, 3.0, "Hi there"),
            TimedSegment::new(4.0, 6.25, "Second cue"),
        ]
    );
}

/// Test that a VTT file without the header still parses its cues
#[test]
fn test_vtt_parse_withoutHeader_shouldParseCues() {
    let content = "00:00:01.000 --> 00:00:02.000\nA &lt;tag&gt;\n";
    assert_eq!(vtt::parse(content), vec![TimedSegment::new(1.0, 2.0, "A <tag>")]);
}

/// Test that a cue directly under the WEBVTT line is not taken for header metadata
#[test]
fn test_vtt_parse_withCueRightAfterHeader_shouldKeepIt() {
    let segments = vtt::parse("\u{FEFF}WEBVTT\n00:00:01.000 --> 00:00:02.000\nA\n\n00:00:03.000 --> 00:00:04.000\nB\n");
    assert_eq!(
        segments,
        vec![TimedSegment::new(1.0, 2.0, "A"), TimedSegment::new(3.0, 4.0, "B")]
    );
}

/// Test that VTT serialization writes the header and full timestamps
#[test]
fn test_vtt_serialize_withSegments_shouldWriteHeader() {
    let out = vtt::serialize(&[TimedSegment::new(1.5, 3.0, "Hi there")]);
    assert_eq!(out, "WEBVTT\n\n00:00:01.500 --> 00:00:03.000\nHi there\n\n");
}

/// Test that only Dialogue lines are read and the text field keeps its commas
#[test]
fn test_ass_parse_withSampleContent_shouldReturnDialogue() {
    let segments = ass::parse(common::SAMPLE_ASS, TimeParseMode::Strict);
    assert_eq!(
        segments,
        vec![
            TimedSegment::new(1.5, 3.0, "Hello, world"),
            TimedSegment::new(4.0, 6.25, "Second line wrapped"),
        ]
    );
}

/// Test that a leading byte-order mark does not hide the first dialogue
#[test]
fn test_ass_parse_withBom_shouldParseFirstLine() {
    let content = "\u{FEFF}Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,first";
    let segments = ass::parse(content, TimeParseMode::Strict);
    assert_eq!(segments, vec![TimedSegment::new(1.0, 2.0, "first")]);
}

/// Test that commas and newlines are escaped for the last Dialogue field
#[test]
fn test_escape_dialogue_text_withCommas_shouldUseFullwidthComma() {
    let escaped = escape_dialogue_text("Hello, world\nagain");
    assert_eq!(escaped, format!("Hello{} world again", FULLWIDTH_COMMA));
    assert!(!escaped.contains(','));
}

/// Test the rendered Dialogue line layout
#[test]
fn test_dialogue_line_withSegment_shouldRenderTenFields() {
    let line = dialogue_line(&TimedSegment::new(1.5, 3.0, "Hello, world"), "Default");
    assert_eq!(line, "Dialogue: 0,0:00:01.50,0:00:03.00,Default,,0,0,0,,Hello\u{FF0C} world");
}

/// Test that the default template is emitted and styles follow position
#[test]
fn test_ass_serialize_withDefaultStyling_shouldAssignOpeningAndEndingStyles() {
    let out = ass::serialize(&sample_segments(), &AssStyling::default());
    assert!(out.starts_with("[Script Info]"));
    assert!(out.contains("Style: OP,"));

    let dialogue: Vec<&str> = out.lines().filter(|l| l.starts_with("Dialogue:")).collect();
    assert_eq!(dialogue.len(), 3);
    assert!(dialogue[0].contains(",OP,"));
    assert!(dialogue[1].contains(",OP,"));
    assert!(dialogue[2].contains(",ED,"));
    assert!(out.ends_with('\n'));
}

/// Test that a dialogue in the middle of a long document uses the default style
#[test]
fn test_ass_serialize_withMiddleSegment_shouldUseDefaultStyle() {
    let segments = vec![
        TimedSegment::new(10.0, 12.0, "opening"),
        TimedSegment::new(300.0, 302.0, "middle"),
        TimedSegment::new(1000.0, 1002.0, "ending"),
    ];
    let out = ass::serialize(&segments, &AssStyling::default());
    assert!(out.contains("Dialogue: 0,0:05:00.00,0:05:02.00,Default,,0,0,0,,middle"));
}

/// Test that custom style names and thresholds are honored
#[test]
fn test_ass_serialize_withCustomRules_shouldUseMappedNames() {
    let rules = StyleRules {
        style_map: StyleMap {
            opening: "Intro".to_string(),
            ending: "Outro".to_string(),
            default: "Main".to_string(),
        },
        opening_threshold_secs: 5.0,
        ending_fraction: 0.95,
    };
    let styling = AssStyling::new(StyleTemplate::new("[Events]\n"), rules);
    let segments = vec![
        TimedSegment::new(1.0, 2.0, "a"),
        TimedSegment::new(10.0, 20.0, "b"),
        TimedSegment::new(90.0, 100.0, "c"),
    ];
    let out = ass::serialize(&segments, &styling);
    assert_eq!(
        out,
        "[Events]\n\
         Dialogue: 0,0:00:01.00,0:00:02.00,Intro,,0,0,0,,a\n\
         Dialogue: 0,0:00:10.00,0:00:20.00,Main,,0,0,0,,b\n\
         Dialogue: 0,0:01:30.00,0:01:40.00,Outro,,0,0,0,,c\n"
    );
}

/// Test that ASS output parses back to the same timing
#[test]
fn test_ass_serialize_thenParse_shouldKeepTiming() {
    let out = ass::serialize(&sample_segments(), &AssStyling::default());
    let parsed = ass::parse(&out, TimeParseMode::Strict);
    assert_eq!(parsed.len(), 3);
    for (parsed, original) in parsed.iter().zip(sample_segments()) {
        assert_eq!(parsed.start, original.start);
        assert_eq!(parsed.end, original.end);
    }
    assert_eq!(parsed[0].text, "Привет\u{FF0C} мир!");
}
