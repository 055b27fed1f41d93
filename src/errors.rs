/*!
 * Error types for the yassa application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when talking to external services
/// (media tool, transcription endpoint, translation API)
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// An external process (ffmpeg, ffprobe) failed or could not be started
    #[error("External process failed: {0}")]
    ProcessFailed(String),

    /// The call did not finish in time
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// None of the supported character encodings could decode the file
    #[error("No supported character encoding could decode {path:?}")]
    Encoding {
        /// File that could not be decoded
        path: PathBuf,
    },

    /// A timecode or structural token did not match its grammar
    #[error("Format error: {0}")]
    Format(String),

    /// A video, subtitle file or stream does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Reading or writing a subtitle file failed
    #[error("I/O error on {path:?}: {source}")]
    Io {
        /// File involved in the failed operation
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl SubtitleError {
    /// Build a format error from anything printable
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Build an I/O error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A segment kept failing after all retries
    #[error("Segment {index} could not be translated: {message}")]
    Segment {
        /// Zero-based segment index
        index: usize,
        /// Last error seen
        message: String,
    },
}
