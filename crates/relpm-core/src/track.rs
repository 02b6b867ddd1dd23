//! Playlist entries resolved to files on disk.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, PathError, Result, TrackError};
use crate::metadata::{TrackMetadata, read_tags};
use crate::path::{self, Separator, file_name_of, relative_to_directory};

/// Separator used for relative paths stored in and written to playlists.
pub const PLAYLIST_SEPARATOR: Separator = Separator::Unix;

/// One playlist entry.
///
/// The absolute path is checked to be an existing file when the record is
/// built and never re-checked afterwards. The relative path is always
/// relative to the directory of the origin playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    origin_playlist: PathBuf,
    absolute_path: PathBuf,
    relative_path: String,
    metadata: TrackMetadata,
}

/// Directory containing an (absolute) playlist path.
pub(crate) fn playlist_dir(playlist: &Path) -> Result<&Path> {
    playlist.parent().ok_or_else(|| {
        PathError::InvalidPath {
            path: playlist.to_string_lossy().into_owned(),
            reason: "playlist has no parent directory".to_string(),
        }
        .into()
    })
}

/// `line` joined onto `dir` with `\\` read as a separator, when the host
/// itself does not treat it as one.
fn foreign_separator_candidate(dir: &Path, line: &str) -> Option<PathBuf> {
    (Separator::native() == Separator::Unix && line.contains('\\'))
        .then(|| dir.join(line.replace('\\', "/")))
}

impl TrackRecord {
    /// Resolve a path line read from `playlist`.
    ///
    /// The line is tried as an absolute path first, then relative to the
    /// playlist's directory. On POSIX hosts a relative line that does not
    /// resolve as written is retried with `\\` read as a separator, for
    /// playlists written on Windows. A relative line that resolves is stored
    /// verbatim so a rewrite to the same playlist reproduces it exactly.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::NotFound`] carrying the line as written when
    /// neither resolution finds a regular file.
    pub fn resolve(playlist: &Path, path_line: &str) -> Result<Self> {
        let origin = path::absolute(playlist)?;
        let dir = playlist_dir(&origin)?;

        let candidate = Path::new(path_line);
        if candidate.is_absolute() && candidate.is_file() {
            trace!(line = path_line, "resolved as absolute path");
            let relative = relative_to_directory(dir, candidate, PLAYLIST_SEPARATOR)?;
            return Ok(Self::new(origin, path::absolute(candidate)?, relative));
        }

        let joined = dir.join(path_line);
        let found = if joined.is_file() {
            Some(joined)
        } else {
            foreign_separator_candidate(dir, path_line).filter(|p| p.is_file())
        };
        if let Some(found) = found {
            trace!(line = path_line, "resolved relative to playlist");
            let absolute = path::absolute(&found)?;
            return Ok(Self::new(origin, absolute, path_line.to_string()));
        }

        debug!("Track not found: {}", path_line);
        Err(Error::track_not_found(path_line))
    }

    /// Resolve a path line using a user-supplied replacement file.
    ///
    /// The file with the same name as the one in `path_line` is looked up in
    /// the directory of `replacement`. This lets one answer fix every track
    /// of a moved album.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::ReplacementNotFound`] if the replacement or the
    /// same-named sibling does not exist.
    pub fn resolve_with_replacement(playlist: &Path, path_line: &str, replacement: &Path) -> Result<Self> {
        if !replacement.is_file() {
            return Err(TrackError::ReplacementNotFound {
                path: replacement.to_path_buf(),
            }
            .into());
        }

        let replacement_dir = replacement.parent().unwrap_or_else(|| Path::new(""));
        let native = Path::new(path_line).file_name().map(|name| replacement_dir.join(name));
        let wanted = match native {
            Some(native) if native.is_file() => native,
            _ => replacement_dir.join(file_name_of(path_line)),
        };
        if !wanted.is_file() {
            return Err(TrackError::ReplacementNotFound { path: wanted }.into());
        }

        debug!("Replacing '{}' with {}", path_line, wanted.display());
        Self::from_file(playlist, &wanted)
    }

    /// Build a record for an existing file chosen by the user.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::NotFound`] if `file` is not a regular file and a
    /// [`PathError`] if it cannot be made relative to the playlist.
    pub fn from_file(playlist: &Path, file: &Path) -> Result<Self> {
        if !file.is_file() {
            return Err(Error::track_not_found(file.to_string_lossy()));
        }
        let origin = path::absolute(playlist)?;
        let absolute = path::absolute(file)?;
        let relative = relative_to_directory(playlist_dir(&origin)?, &absolute, PLAYLIST_SEPARATOR)?;
        Ok(Self::new(origin, absolute, relative))
    }

    fn new(origin_playlist: PathBuf, absolute_path: PathBuf, relative_path: String) -> Self {
        Self {
            origin_playlist,
            absolute_path,
            relative_path,
            metadata: TrackMetadata::empty(),
        }
    }

    /// Fill title, artist and duration from the audio file's own tags.
    pub fn read_tags_from_file(&mut self) {
        self.metadata = read_tags(&self.absolute_path);
    }

    /// Replace all metadata at once.
    pub fn set_metadata(&mut self, metadata: TrackMetadata) {
        self.metadata = metadata;
    }

    /// Set the title.
    pub fn set_title(&mut self, title: Option<String>) {
        self.metadata.title = title;
    }

    /// Set the artist.
    pub fn set_artist(&mut self, artist: Option<String>) {
        self.metadata.artist = artist;
    }

    /// Set the duration in seconds.
    pub const fn set_duration_secs(&mut self, duration_secs: Option<u32>) {
        self.metadata.duration_secs = duration_secs;
    }

    /// Absolute path of the playlist this record was first read from.
    #[must_use]
    pub fn origin_playlist(&self) -> &Path {
        &self.origin_playlist
    }

    /// Absolute path of the audio file.
    #[must_use]
    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    /// Path relative to the origin playlist's directory.
    #[must_use]
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// All known metadata.
    #[must_use]
    pub const fn metadata(&self) -> &TrackMetadata {
        &self.metadata
    }

    /// Track title.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.metadata.title.as_deref()
    }

    /// Track artist.
    #[must_use]
    pub fn artist(&self) -> Option<&str> {
        self.metadata.artist.as_deref()
    }

    /// Duration in seconds.
    #[must_use]
    pub const fn duration_secs(&self) -> Option<u32> {
        self.metadata.duration_secs
    }

    /// The path to write for this record into `target_playlist`.
    ///
    /// The stored relative path is reused when `target_playlist` is the
    /// origin playlist; otherwise it is recomputed against the target's
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::NoCommonRoot`] when the track and the target
    /// playlist share no root.
    pub fn path_for(&self, target_playlist: &Path) -> Result<Cow<'_, str>> {
        if target_playlist == self.origin_playlist {
            return Ok(Cow::Borrowed(&self.relative_path));
        }
        let dir = playlist_dir(target_playlist)?;
        let relative = relative_to_directory(dir, &self.absolute_path, PLAYLIST_SEPARATOR)?;
        Ok(Cow::Owned(relative))
    }
}

impl fmt::Display for TrackRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.artist(), self.title()) {
            (Some(artist), Some(title)) => write!(f, "{artist} - {title}"),
            (None, Some(title)) => f.write_str(title),
            _ => f.write_str(&self.relative_path),
        }
    }
}
