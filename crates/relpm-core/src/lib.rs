//! `RelPM` Core Library
//!
//! This crate provides the core functionality for the `RelPM` playlist
//! manager, which keeps M3U playlists portable by storing every track
//! relative to the playlist file:
//! - Relative path calculation between absolute POSIX or Windows paths
//! - Reading M3U/EXTM3U playlists, including interactive recovery of tracks
//!   that moved and of files in legacy text encodings
//! - Writing playlists back, recalculating paths for a new location and
//!   optionally emitting a last-100 companion playlist
//! - Index based list editing (insert, remove, move)
//! - Application configuration management
//!
//! # Error Handling
//!
//! Errors are typed per domain and wrapped by [`Error`]. Aborting a session
//! is not an error; see [`ReadOutcome`] and [`WriteOutcome`].
//!
//! ```rust,ignore
//! use relpm_core::{NonInteractive, PlaylistReader, ReadOptions};
//! use std::path::Path;
//!
//! let mut reader = PlaylistReader::new(ReadOptions::default());
//! let outcome = reader.read(Path::new("list.m3u"), &mut NonInteractive::default(), |_| {})?;
//! for track in &outcome.into_list() {
//!     println!("{track}");
//! }
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod list;
pub mod m3u;
pub mod metadata;
pub mod path;
pub mod reader;
pub mod recovery;
pub mod task;
pub mod track;
pub mod writer;

pub use config::{AppConfig, ExportSettings, ImportSettings};
pub use encoding::{TextEncoding, contains_non_ascii, read_candidates, write_candidates};
pub use error::{
    EncodingError, Error, ErrorKind, FileSystemError, PathError, PlaylistError, Result, TrackError,
};
pub use list::PlaylistList;
pub use m3u::{M3uLineParser, M3uLineWriter, last100_path, parse_extinf};
pub use metadata::{AudioFormat, TagReader, TrackMetadata, is_audio_file, read_tags};
pub use path::{Separator, relative_path, relative_to_directory, resolve_relative};
pub use reader::{PlaylistReader, ReadOptions, ReadOutcome, ReadState};
pub use recovery::{NonInteractive, ProgressEvent, RecoveryHandler};
pub use task::{PlaylistTask, TaskEvent, spawn_read, spawn_write};
pub use track::TrackRecord;
pub use writer::{PlaylistWriter, WriteOptions, WriteOutcome};
