/*!
 * JSON side documents cached next to the output.
 *
 * A side document is the serde form of a `SubtitleDocument`. It is reused only
 * while its provenance (video file name and SHA-256) matches the video being
 * processed, so replacing the video invalidates it.
 */

use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::errors::SubtitleError;
use crate::file_utils::FileManager;
use crate::subtitle_processor::{Provenance, SubtitleDocument};

// @const: suffix of the source-language side document
pub const SOURCE_SUFFIX: &str = "source.json";

/// `<output_dir>/<stem>.source.json`
pub fn source_document_path(video_path: &Path, output_dir: &Path) -> PathBuf {
    FileManager::derived_path(video_path, output_dir, SOURCE_SUFFIX)
}

/// `<output_dir>/<stem>.<target>.json`
pub fn translated_document_path(video_path: &Path, output_dir: &Path, target_language: &str) -> PathBuf {
    FileManager::derived_path(video_path, output_dir, &format!("{}.json", target_language))
}

/// Load a side document if it exists and belongs to the given video.
///
/// Unreadable or mismatching documents are treated as absent.
pub fn load_if_valid(path: &Path, provenance: &Provenance) -> Option<SubtitleDocument> {
    if !path.is_file() {
        return None;
    }

    let document = match read_document(path) {
        Ok(document) => document,
        Err(e) => {
            warn!("Ignoring unreadable side document {:?}: {}", path, e);
            return None;
        }
    };

    match &document.metadata.provenance {
        Some(stored) if stored == provenance => {
            info!("Reusing {:?} ({} segments)", path, document.len());
            Some(document)
        }
        Some(stored) => {
            debug!(
                "Side document {:?} belongs to {} ({}), not {}",
                path, stored.video_name, stored.video_hash, provenance.video_name
            );
            None
        }
        None => {
            debug!("Side document {:?} has no provenance", path);
            None
        }
    }
}

/// Read a side document without checking its provenance
pub fn read_document(path: &Path) -> Result<SubtitleDocument, SubtitleError> {
    let file = File::open(path).map_err(|e| SubtitleError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| SubtitleError::format(format!("invalid side document {:?}: {}", path, e)))
}

/// Write a side document as pretty-printed UTF-8 JSON
pub fn store(path: &Path, document: &SubtitleDocument) -> Result<(), SubtitleError> {
    let file = File::create(path).map_err(|e| SubtitleError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, document)
        .map_err(|e| SubtitleError::format(format!("failed to serialize side document: {}", e)))?;
    writer.flush().map_err(|e| SubtitleError::io(path, e))?;
    debug!("Stored {} segments in {:?}", document.len(), path);
    Ok(())
}
