//! Callbacks into the controlling front end.
//!
//! Reading and writing stop at exactly two points to ask the user something:
//! which text encoding to use, and where a missing track went. Both are
//! answered through [`RecoveryHandler`]. Progress flows the other way as
//! [`ProgressEvent`]s.

use std::path::PathBuf;

use serde::Serialize;

use crate::encoding::TextEncoding;

/// Answers the questions a read or write session may ask.
///
/// Returning `None` from either method aborts the session.
#[cfg_attr(test, mockall::automock)]
pub trait RecoveryHandler {
    /// Text outside printable ASCII was found; pick an encoding from
    /// `candidates`.
    fn on_encoding_needed(&mut self, candidates: &[TextEncoding]) -> Option<TextEncoding>;

    /// The track written as `path` in the playlist could not be found; supply
    /// a file in the directory it moved to.
    fn on_track_not_found(&mut self, path: &str) -> Option<PathBuf>;
}

/// Handler that always uses one encoding and never recovers missing tracks.
///
/// Suitable for non-interactive runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive {
    /// Encoding to answer with; `None` aborts on non-ASCII content.
    pub encoding: Option<TextEncoding>,
}

impl RecoveryHandler for NonInteractive {
    fn on_encoding_needed(&mut self, _candidates: &[TextEncoding]) -> Option<TextEncoding> {
        self.encoding
    }

    fn on_track_not_found(&mut self, _path: &str) -> Option<PathBuf> {
        None
    }
}

/// Progress of a read or write session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Loading raw bytes.
    Reading,
    /// Looking for non-ASCII content.
    ScanningEncoding,
    /// Waiting for an encoding choice.
    EncodingNeeded,
    /// Line parsing starts.
    BeginParsing {
        /// Number of lines in the file.
        total_lines: usize,
    },
    /// Line `n` (1-based) was parsed, or record `n` rendered when writing.
    Line(usize),
    /// Waiting for the location of a missing track.
    TrackNotFound {
        /// The path line as written in the playlist.
        path: String,
    },
    /// Rendering and writing starts.
    BeginWriting {
        /// Number of records to write.
        total_tracks: usize,
    },
    /// Writing the last-100 companion file.
    WritingLast100,
}
