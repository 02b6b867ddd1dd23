//! Audio tag reading.
//!
//! Tag reading is dispatched on the file's [`AudioFormat`]. Only MP3 (ID3v1,
//! ID3v2.3 and ID3v2.4) has a reader; every other format yields unknown
//! metadata. The playing time comes from the MPEG stream itself, with the
//! ID3 `TLEN` frame as a fallback. Reading never fails: a broken or missing tag is logged and
//! treated as "nothing known", because metadata is optional for a playlist.
//!
//! # Example
//!
//! ```rust,ignore
//! use relpm_core::metadata::read_tags;
//! use std::path::Path;
//!
//! let metadata = read_tags(Path::new("song.mp3"));
//! println!("Title: {:?}", metadata.title);
//! ```

use std::path::Path;

use id3::{Tag, TagLike};
use lofty::file::AudioFile;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Tag information relevant to a playlist entry.
///
/// `None` means unknown, which is different from an empty string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackMetadata {
    /// Track title.
    pub title: Option<String>,
    /// Track artist.
    pub artist: Option<String>,
    /// Playing time in whole seconds.
    pub duration_secs: Option<u32>,
}

impl TrackMetadata {
    /// Metadata with every field unknown.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if any field is known.
    #[must_use]
    pub const fn has_content(&self) -> bool {
        self.title.is_some() || self.artist.is_some() || self.duration_secs.is_some()
    }

    /// Check if every field is known, i.e. an `#EXTINF` line can be written.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.title.is_some() && self.artist.is_some() && self.duration_secs.is_some()
    }

    /// Format duration as M:SS.
    #[must_use]
    pub fn formatted_duration(&self) -> Option<String> {
        self.duration_secs.map(|secs| {
            let mins = secs / 60;
            let secs = secs % 60;
            format!("{mins}:{secs:02}")
        })
    }
}

/// Audio container format, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// MPEG-1/2 Layer III.
    Mp3,
    /// Free Lossless Audio Codec.
    Flac,
    /// Ogg container.
    Ogg,
    /// RIFF WAVE.
    Wav,
    /// MPEG-4 audio (`.m4a`, `.mp4`).
    Mp4,
    /// AAC (ADTS).
    Aac,
    /// Not a recognised audio file.
    Unsupported,
}

impl AudioFormat {
    /// Classify a path by its extension (case-insensitive).
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Self::Unsupported;
        };
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => Self::Mp3,
            "flac" => Self::Flac,
            "ogg" | "oga" => Self::Ogg,
            "wav" => Self::Wav,
            "m4a" | "mp4" => Self::Mp4,
            "aac" => Self::Aac,
            _ => Self::Unsupported,
        }
    }

    /// Whether this is an audio format at all.
    #[must_use]
    pub const fn is_audio(self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Check if a file looks like an audio file based on its extension.
#[must_use]
pub fn is_audio_file(path: &Path) -> bool {
    AudioFormat::from_path(path).is_audio()
}

/// Reader capable of extracting tags from one audio format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagReader {
    /// ID3 tags of MP3 files.
    Mp3,
    /// Formats without a tag reader; always yields unknown metadata.
    None,
}

impl TagReader {
    /// Pick the reader for a format.
    #[must_use]
    pub const fn for_format(format: AudioFormat) -> Self {
        match format {
            AudioFormat::Mp3 => Self::Mp3,
            _ => Self::None,
        }
    }

    /// Read tags from `path`.
    ///
    /// Never fails; decode errors degrade to [`TrackMetadata::empty`].
    #[must_use]
    pub fn read(self, path: &Path) -> TrackMetadata {
        match self {
            Self::Mp3 => read_id3(path),
            Self::None => TrackMetadata::empty(),
        }
    }
}

/// Read tags from a file, choosing the reader from its extension.
///
/// Files whose format has no reader are skipped with a warning.
#[must_use]
pub fn read_tags(path: &Path) -> TrackMetadata {
    let format = AudioFormat::from_path(path);
    let reader = TagReader::for_format(format);
    if reader == TagReader::None {
        warn!(
            "Reading the tag info of {:?} files is not supported: {}",
            format,
            path.display()
        );
    }
    reader.read(path)
}

fn read_id3(path: &Path) -> TrackMetadata {
    debug!("Extracting metadata from: {}", path.display());

    let stream_secs = stream_duration_secs(path);

    let tag = match Tag::read_from_path(path) {
        Ok(tag) => tag,
        Err(id3::Error {
            kind: id3::ErrorKind::NoTag,
            ..
        }) => {
            debug!("No ID3 tag found in: {}", path.display());
            return TrackMetadata {
                duration_secs: stream_secs,
                ..TrackMetadata::empty()
            };
        }
        Err(e) => {
            warn!("Could not read MP3 tag info from {}: {}", path.display(), e);
            return TrackMetadata {
                duration_secs: stream_secs,
                ..TrackMetadata::empty()
            };
        }
    };

    // TLEN is stored in milliseconds.
    let metadata = TrackMetadata {
        title: tag.title().map(String::from),
        artist: tag.artist().map(String::from),
        duration_secs: stream_secs.or_else(|| tag.duration().map(|ms| ms / 1000)),
    };

    debug!(
        "Extracted metadata - title: {:?}, artist: {:?}, duration: {:?}",
        metadata.title, metadata.artist, metadata.duration_secs
    );

    metadata
}

/// Playing time of the audio stream, or `None` if no MPEG frames were found.
fn stream_duration_secs(path: &Path) -> Option<u32> {
    match lofty::read_from_path(path) {
        Ok(tagged) => {
            let secs = tagged.properties().duration().as_secs();
            (secs > 0).then(|| u32::try_from(secs).unwrap_or(u32::MAX))
        }
        Err(e) => {
            debug!("No audio stream properties for {}: {}", path.display(), e);
            None
        }
    }
}
