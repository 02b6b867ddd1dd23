//! Error types for RelPM core operations.
//!
//! Errors are grouped by domain. Each domain enum is wrapped by the crate-wide
//! [`Error`] so callers can either match on the detailed cause or just show the
//! message to the user.
//!
//! User cancellation is deliberately absent: aborting a read or write is a
//! normal outcome (see [`crate::reader::ReadOutcome`] and
//! [`crate::writer::WriteOutcome`]), not a failure.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while relativizing or normalizing paths.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    /// The two paths share no leading segment (e.g. different drives).
    #[error("No common path element found for '{target}' and '{base}'")]
    NoCommonRoot {
        /// Normalized target path.
        target: String,
        /// Normalized base path.
        base: String,
    },

    /// The path could not be normalized.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors produced while resolving a playlist entry to a file on disk.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackError {
    /// The path line resolves neither as absolute nor relative to the playlist.
    #[error("File not found: {path}")]
    NotFound {
        /// The unresolved path exactly as written in the playlist.
        path: String,
    },

    /// The user-supplied replacement did not lead to an existing file.
    #[error("Replacement file not found: {path}")]
    ReplacementNotFound {
        /// The path that was tried.
        path: PathBuf,
    },
}

/// Errors produced by playlist list operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaylistError {
    /// An index was outside the list.
    #[error("Index {index} is out of range for a playlist of {len} tracks")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Current list length.
        len: usize,
    },
}

/// File system errors with the path that caused them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FileSystemError {
    /// A required file or directory does not exist.
    #[error("Path not found: {path}")]
    NotFound {
        /// Missing path.
        path: PathBuf,
    },

    /// Reading failed.
    #[error("Failed to read {path}: {reason}")]
    ReadFailed {
        /// Path being read.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// Writing failed.
    #[error("Failed to write {path}: {reason}")]
    WriteFailed {
        /// Path being written.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// A directory could not be created.
    #[error("Failed to create directory {path}: {reason}")]
    CreateDirFailed {
        /// Directory path.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },
}

/// Errors related to text encodings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// The label does not name a known encoding.
    #[error("Unknown text encoding: {label}")]
    UnknownLabel {
        /// Label as supplied.
        label: String,
    },

    /// Some characters cannot be represented in the chosen encoding.
    #[error("The playlist contains characters that cannot be written as {encoding}")]
    Unmappable {
        /// Encoding name.
        encoding: String,
    },

    /// The encoding can be decoded but not produced.
    #[error("Writing playlists as {encoding} is not supported")]
    UnsupportedForWriting {
        /// Encoding name.
        encoding: String,
    },
}

/// Errors that can occur in RelPM core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Path relativization or normalization failed.
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// A playlist entry could not be resolved.
    #[error("Track error: {0}")]
    Track(#[from] TrackError),

    /// Playlist list operation failed.
    #[error("Playlist error: {0}")]
    Playlist(#[from] PlaylistError),

    /// File system operation failed.
    #[error("File system error: {0}")]
    FileSystem(#[from] FileSystemError),

    /// Text encoding problem.
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Background task failed to complete.
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Broad error category for programmatic handling by front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Path could not be relativized.
    PathResolution,
    /// Track could not be located.
    TrackNotFound,
    /// Invalid list operation.
    Playlist,
    /// File system or IO failure.
    FileSystem,
    /// Encoding failure.
    Encoding,
    /// Bad configuration.
    Configuration,
    /// Task infrastructure failure.
    Task,
}

impl Error {
    /// Get the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Path(_) => ErrorKind::PathResolution,
            Self::Track(_) => ErrorKind::TrackNotFound,
            Self::Playlist(_) => ErrorKind::Playlist,
            Self::FileSystem(_) => ErrorKind::FileSystem,
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::Configuration(_) | Self::Serialization(_) => ErrorKind::Configuration,
            Self::TaskFailed(_) => ErrorKind::Task,
        }
    }

    /// Whether the not-found recovery protocol can handle this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Track(_))
    }

    /// Shorthand for a [`TrackError::NotFound`].
    pub fn track_not_found(path: impl Into<String>) -> Self {
        Self::Track(TrackError::NotFound { path: path.into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_common_root_display() {
        let err = Error::Path(PathError::NoCommonRoot {
            target: "D:\\a\\b".to_string(),
            base: "C:\\x\\y".to_string(),
        });
        let msg = err.to_string();
        assert!(msg.contains("D:\\a\\b"));
        assert!(msg.contains("C:\\x\\y"));
        assert_eq!(err.kind(), ErrorKind::PathResolution);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_track_not_found_is_recoverable() {
        let err = Error::track_not_found("music/song.mp3");
        assert_eq!(err.to_string(), "Track error: File not found: music/song.mp3");
        assert!(err.is_recoverable());
        assert_eq!(err.kind(), ErrorKind::TrackNotFound);
    }

    #[test]
    fn test_file_system_error_display() {
        let err = Error::FileSystem(FileSystemError::WriteFailed {
            path: PathBuf::from("/test/list.m3u"),
            reason: "permission denied".to_string(),
        });
        assert!(err.to_string().contains("/test/list.m3u"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_every_message_is_non_empty() {
        let errors = vec![
            Error::Playlist(PlaylistError::IndexOutOfRange { index: 3, len: 1 }),
            Error::Encoding(EncodingError::UnknownLabel {
                label: "klingon".to_string(),
            }),
            Error::Configuration(String::new()),
            Error::TaskFailed(String::new()),
        ];
        for err in errors {
            assert!(!err.to_string().trim().is_empty());
        }
    }
}
