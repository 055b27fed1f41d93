use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1251, WINDOWS_1252};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::SubtitleError;
use crate::subtitle_processor::SubtitleFormat;

// @module: File and directory utilities

const UTF8_BOM: &str = "\u{FEFF}";

// @const: Read buffer for content hashing
const HASH_BUFFER_SIZE: usize = 8192;

// @const: Common video extensions supported by ffmpeg
const VIDEO_EXTENSIONS: [&str; 14] = [
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ogv", "ts", "mts",
    "m2ts",
];

static SRT_SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+\s*\r?\n\d{2,}:\d{2}:\d{2},\d{3}\s*-->\s*\d{2,}:\d{2}:\d{2},\d{3}").unwrap()
});

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: `<output_dir>/<video stem>.<suffix>`
    // @params: video_file, output_dir, suffix (e.g. "ass", "source.json", "uk.json")
    pub fn derived_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        video_file: P1,
        output_dir: P2,
        suffix: &str,
    ) -> PathBuf {
        let stem = video_file.as_ref().file_stem().unwrap_or_default();
        let mut file_name = stem.to_string_lossy().to_string();
        file_name.push('.');
        file_name.push_str(suffix);
        output_dir.as_ref().join(file_name)
    }

    /// Find subtitle files under a directory, sorted by path.
    ///
    /// Entries that cannot be read are skipped; only a missing root is an error.
    pub fn find_subtitle_files<P: AsRef<Path>>(dir: P, recursive: bool) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(anyhow::anyhow!("Not a directory: {:?}", dir));
        }

        let mut walker = WalkDir::new(dir).follow_links(true).sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut result = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry under {:?}: {}", dir, e);
                    continue;
                }
            };
            let path = entry.path();
            if entry.file_type().is_file() && SubtitleFormat::from_path(path).is_some() {
                result.push(path.to_path_buf());
            }
        }

        Ok(result)
    }

    /// Find video files (by extension) directly inside a directory, sorted by name
    pub fn find_video_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(anyhow::anyhow!("Not a directory: {:?}", dir));
        }

        let files = WalkDir::new(dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| Self::has_video_extension(path))
            .collect();
        Ok(files)
    }

    pub fn has_video_extension<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_string_lossy().to_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Decode raw bytes with BOM sniffing and the default fallback chain
    pub fn decode_bytes(bytes: &[u8]) -> Option<(String, &'static Encoding)> {
        Self::decode_with_chain(bytes, &Self::fallback_encodings())
    }

    /// Decoders tried in order when a file carries no byte-order mark
    pub fn fallback_encodings() -> [&'static Encoding; 3] {
        [UTF_8, WINDOWS_1251, WINDOWS_1252]
    }

    /// Decode raw bytes: a byte-order mark decides the encoding (and is dropped),
    /// otherwise the first encoding in `chain` that decodes without errors wins
    pub fn decode_with_chain(
        bytes: &[u8],
        chain: &[&'static Encoding],
    ) -> Option<(String, &'static Encoding)> {
        if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
            let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
            if !had_errors {
                return Some((text.into_owned(), encoding));
            }
        }

        chain.iter().find_map(|encoding| {
            let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
            (!had_errors).then(|| (text.into_owned(), *encoding))
        })
    }

    /// Read a subtitle (or template) file and decode it to text
    pub fn read_subtitle_file<P: AsRef<Path>>(path: P) -> Result<String, SubtitleError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| SubtitleError::io(path, e))?;
        match Self::decode_bytes(&bytes) {
            Some((text, encoding)) => {
                debug!("Decoded {:?} as {}", path.file_name().unwrap_or_default(), encoding.name());
                Ok(text)
            }
            None => Err(SubtitleError::Encoding {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Write UTF-8 text, creating parent directories
    pub fn write_utf8<P: AsRef<Path>>(path: P, content: &str) -> Result<(), SubtitleError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SubtitleError::io(parent, e))?;
        }
        fs::write(path, content).map_err(|e| SubtitleError::io(path, e))
    }

    /// Write UTF-8 text prefixed with a byte-order mark
    pub fn write_with_bom<P: AsRef<Path>>(path: P, content: &str) -> Result<(), SubtitleError> {
        let mut with_bom = String::with_capacity(content.len() + UTF8_BOM.len());
        with_bom.push_str(UTF8_BOM);
        with_bom.push_str(content.strip_prefix(UTF8_BOM).unwrap_or(content));
        Self::write_utf8(path, &with_bom)
    }

    /// Hex SHA-256 of a file's full content, read in 8 KiB chunks
    pub fn hash_file<P: AsRef<Path>>(path: P) -> Result<String, SubtitleError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| SubtitleError::io(path, e))?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; HASH_BUFFER_SIZE];

        loop {
            let bytes_read = file.read(&mut buffer).map_err(|e| SubtitleError::io(path, e))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Guess a subtitle format from content, for files without a subtitle extension
    pub fn sniff_subtitle_format(content: &str) -> Option<SubtitleFormat> {
        let head = content.trim_start_matches(UTF8_BOM).trim_start();
        if head.starts_with("WEBVTT") {
            Some(SubtitleFormat::Vtt)
        } else if head.starts_with("[Script Info]") {
            Some(SubtitleFormat::Ass)
        } else if SRT_SIGNATURE.is_match(head) {
            Some(SubtitleFormat::Srt)
        } else {
            None
        }
    }

    /// Read a subtitle file and work out its format.
    ///
    /// The extension decides first; other files (except videos) are sniffed for
    /// subtitle signatures.
    pub fn read_subtitle_with_format<P: AsRef<Path>>(path: P) -> Result<(String, SubtitleFormat), SubtitleError> {
        let path = path.as_ref();

        if let Some(format) = SubtitleFormat::from_path(path) {
            return Ok((Self::read_subtitle_file(path)?, format));
        }

        if Self::has_video_extension(path) {
            return Err(SubtitleError::format(format!("{:?} is a video, not a subtitle file", path)));
        }

        // Fall back to examining file contents
        let content = Self::read_subtitle_file(path)?;
        match Self::sniff_subtitle_format(&content) {
            Some(format) => {
                debug!("Detected {} content in {:?}", format, path.file_name().unwrap_or_default());
                Ok((content, format))
            }
            None => Err(SubtitleError::format(format!("unrecognized subtitle file: {:?}", path))),
        }
    }
}
