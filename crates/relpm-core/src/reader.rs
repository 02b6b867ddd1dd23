//! Reading playlist files into a [`PlaylistList`].
//!
//! A read session moves through these states:
//!
//! ```text
//! Reading -> ScanningEncoding -> [AwaitEncodingChoice -> ReReading] -> Parsing
//! Parsing <-> AwaitFileLocation      (once per unresolved path line)
//! Parsing -> Done | Aborted
//! ```
//!
//! The two `Await*` states are the only places the session waits for the
//! user, through [`RecoveryHandler`]. A missing track suspends parsing at its
//! line; a replacement resumes at the same line, so the resulting list stays
//! aligned with the file.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::encoding::{TextEncoding, contains_non_ascii, read_candidates};
use crate::error::{Error, FileSystemError, Result};
use crate::list::PlaylistList;
use crate::m3u::M3uLineParser;
use crate::path;
use crate::recovery::{ProgressEvent, RecoveryHandler};

/// Options for reading a playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Take metadata from `#EXTINF` lines instead of the audio files.
    pub parse_extinf_tags: bool,
    /// Preset encoding used instead of asking when non-ASCII text is found.
    pub encoding: Option<TextEncoding>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            parse_extinf_tags: true,
            encoding: None,
        }
    }
}

/// State of a read session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// Not started.
    Idle,
    /// Loading raw bytes.
    Reading,
    /// Looking for non-ASCII content.
    ScanningEncoding,
    /// Suspended until an encoding is chosen.
    AwaitEncodingChoice,
    /// Decoding again with the chosen encoding.
    ReReading,
    /// Feeding lines to the parser.
    Parsing,
    /// Suspended until a missing track is located.
    AwaitFileLocation,
    /// Finished successfully.
    Done,
    /// Stopped by the user.
    Aborted,
}

/// How a read session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Every line was processed.
    Completed(PlaylistList),
    /// The user aborted; `partial` holds the records parsed before that.
    Cancelled {
        /// Records accumulated up to the abort.
        partial: PlaylistList,
    },
}

impl ReadOutcome {
    /// The list, complete or partial.
    #[must_use]
    pub fn into_list(self) -> PlaylistList {
        match self {
            Self::Completed(list) | Self::Cancelled { partial: list } => list,
        }
    }

    /// Whether the session was aborted.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Reads playlist files.
#[derive(Debug)]
pub struct PlaylistReader {
    options: ReadOptions,
    cancelled: Arc<AtomicBool>,
    state: ReadState,
}

impl PlaylistReader {
    /// Create a reader.
    #[must_use]
    pub fn new(options: ReadOptions) -> Self {
        Self::with_cancellation(options, Arc::new(AtomicBool::new(false)))
    }

    /// Create a reader sharing an existing cancellation flag.
    #[must_use]
    pub const fn with_cancellation(options: ReadOptions, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            options,
            cancelled,
            state: ReadState::Idle,
        }
    }

    /// Request cancellation; honoured before the next line.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Get a cancellation token that can be shared across threads.
    #[must_use]
    pub fn cancellation_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Current session state.
    #[must_use]
    pub const fn state(&self) -> ReadState {
        self.state
    }

    fn enter(&mut self, state: ReadState) {
        debug!("Read state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Read and parse `playlist`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, or if a track cannot be made
    /// relative to the playlist. Missing tracks are not errors unless the
    /// handler's replacement cannot be used either, in which case it is
    /// asked again.
    pub fn read(
        &mut self,
        playlist: &Path,
        handler: &mut dyn RecoveryHandler,
        mut progress: impl FnMut(ProgressEvent),
    ) -> Result<ReadOutcome> {
        let playlist = path::absolute(playlist)?;
        let mut parser = M3uLineParser::new(&playlist, self.options.parse_extinf_tags);

        self.enter(ReadState::Reading);
        progress(ProgressEvent::Reading);
        let bytes = fs::read(&playlist).map_err(|e| read_error(&playlist, &e))?;

        if self.is_cancelled() {
            return Ok(self.abort(&playlist, parser));
        }

        self.enter(ReadState::ScanningEncoding);
        progress(ProgressEvent::ScanningEncoding);
        let default = TextEncoding::utf8();
        let mut text = default.decode(&bytes).into_owned();

        if contains_non_ascii(&text) {
            let chosen = match self.options.encoding {
                Some(preset) => preset,
                None => {
                    self.enter(ReadState::AwaitEncodingChoice);
                    progress(ProgressEvent::EncodingNeeded);
                    match handler.on_encoding_needed(&read_candidates()) {
                        Some(chosen) => chosen,
                        None => return Ok(self.abort(&playlist, parser)),
                    }
                }
            };
            if chosen != default {
                self.enter(ReadState::ReReading);
                text = chosen.decode(&bytes).into_owned();
            }
            debug!("Decoding {} as {}", playlist.display(), chosen);
        }

        let lines: Vec<&str> = text.lines().collect();
        self.enter(ReadState::Parsing);
        progress(ProgressEvent::BeginParsing {
            total_lines: lines.len(),
        });

        for (index, line) in lines.iter().enumerate() {
            if self.is_cancelled() {
                return Ok(self.abort(&playlist, parser));
            }

            let mut result = parser.add_line(line);
            loop {
                match result {
                    Ok(()) => break,
                    Err(e) if e.is_recoverable() => {
                        warn!("Line {}: {}", index + 1, e);
                        let unresolved = line.trim();
                        self.enter(ReadState::AwaitFileLocation);
                        progress(ProgressEvent::TrackNotFound {
                            path: unresolved.to_string(),
                        });
                        let Some(replacement) = handler.on_track_not_found(unresolved) else {
                            return Ok(self.abort(&playlist, parser));
                        };
                        self.enter(ReadState::Parsing);
                        result = parser.add_line_with_replacement(line, &replacement);
                    }
                    Err(e) => return Err(e),
                }
            }

            progress(ProgressEvent::Line(index + 1));
        }

        self.enter(ReadState::Done);
        let list = PlaylistList::with_tracks(&playlist, parser.into_tracks());
        info!("Read {} tracks from {}", list.len(), playlist.display());
        Ok(ReadOutcome::Completed(list))
    }

    fn abort(&mut self, playlist: &Path, parser: M3uLineParser) -> ReadOutcome {
        self.enter(ReadState::Aborted);
        let partial = PlaylistList::with_tracks(playlist, parser.into_tracks());
        info!(
            "Reading {} aborted after {} tracks",
            playlist.display(),
            partial.len()
        );
        ReadOutcome::Cancelled { partial }
    }
}

fn read_error(path: &Path, e: &std::io::Error) -> Error {
    if e.kind() == IoErrorKind::NotFound {
        FileSystemError::NotFound {
            path: path.to_path_buf(),
        }
        .into()
    } else {
        FileSystemError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
        .into()
    }
}
