/*!
 * Per-format parsers and serializers.
 *
 * - `srt`: SubRip blocks
 * - `ass`: Advanced SubStation Alpha (also used for SSA), style template and style rules
 * - `vtt`: WebVTT cues
 *
 * Parsers are best effort: malformed blocks are skipped and logged at debug level,
 * never fatal to the document.
 */

pub mod ass;
pub mod srt;
pub mod vtt;

pub use self::ass::{AssStyling, StyleMap, StyleRules, StyleTemplate};

/// Drop a leading byte-order mark and normalize `\r\n` and lone `\r` line endings to `\n`
pub(crate) fn normalize_line_endings(content: &str) -> String {
    content
        .trim_start_matches('\u{FEFF}')
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}
