//! M3U / EXTM3U dialect: line classification, `#EXTINF` parsing and line
//! rendering.
//!
//! A track entry is an optional `#EXTINF:<duration>,<artist> - <title>` line
//! followed by a path line. Blank lines, the `#EXTM3U` header and any other
//! `#` directive are ignored when reading. Output always uses CRLF.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;
use crate::metadata::TrackMetadata;
use crate::track::TrackRecord;

/// Header line of an extended M3U file.
pub const EXTM3U_HEADER: &str = "#EXTM3U";

/// Prefix of a metadata line.
pub const EXTINF_PREFIX: &str = "#EXTINF:";

/// Line terminator used when writing.
pub const LINE_END: &str = "\r\n";

/// Suffix inserted before the extension of the last-100 companion file.
pub const LAST100_SUFFIX: &str = "_last100";

/// Number of trailing records kept in the companion file.
pub const LAST100_LEN: usize = 100;

/// What a single playlist line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// Empty or whitespace only.
    Blank,
    /// The `#EXTM3U` header.
    Header,
    /// `#EXTINF:` with its payload.
    ExtInf(&'a str),
    /// Any other `#` directive.
    Directive(&'a str),
    /// A track path.
    Path(&'a str),
}

impl<'a> Line<'a> {
    /// Classify a raw line, trimming surrounding whitespace.
    #[must_use]
    pub fn classify(raw: &'a str) -> Self {
        let line = raw.trim();
        if line.is_empty() {
            Self::Blank
        } else if line.starts_with(EXTM3U_HEADER) {
            Self::Header
        } else if let Some(payload) = line.strip_prefix(EXTINF_PREFIX) {
            Self::ExtInf(payload)
        } else if line.starts_with('#') {
            Self::Directive(line)
        } else {
            Self::Path(line)
        }
    }
}

/// Parse an `#EXTINF` payload of the form `duration,artist - title`.
///
/// Only the first ` - ` separates artist from title, so titles may contain
/// it. Without a separator the whole remainder is the title. A negative or
/// unparseable duration is unknown. Malformed payloads never fail.
#[must_use]
pub fn parse_extinf(payload: &str) -> TrackMetadata {
    let Some((duration, rest)) = payload.split_once(',') else {
        warn!("Malformed #EXTINF payload without ',': {}", payload);
        return TrackMetadata {
            duration_secs: parse_duration(payload),
            ..TrackMetadata::default()
        };
    };

    let (artist, title) = match rest.split_once(" - ") {
        Some((artist, title)) => (Some(artist.to_string()), Some(title.to_string())),
        None if rest.is_empty() => (None, None),
        None => (None, Some(rest.to_string())),
    };

    TrackMetadata {
        title,
        artist,
        duration_secs: parse_duration(duration),
    }
}

fn parse_duration(text: &str) -> Option<u32> {
    match text.trim().parse::<i64>() {
        Ok(secs) => u32::try_from(secs).ok(),
        Err(_) => {
            warn!("Unparseable #EXTINF duration: '{}'", text);
            None
        }
    }
}

/// Path of the last-100 companion of `playlist`.
///
/// `list.m3u` becomes `list_last100.m3u`; a file without extension just
/// gets the suffix.
#[must_use]
pub fn last100_path(playlist: &Path) -> PathBuf {
    let stem = playlist
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match playlist.extension() {
        Some(ext) => format!("{stem}{LAST100_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{LAST100_SUFFIX}"),
    };
    playlist.with_file_name(name)
}

/// Turns playlist lines into track records, one line at a time.
///
/// An `#EXTINF` line stays pending until the next path line consumes it.
/// When a path line fails to resolve, the pending metadata is kept so the
/// same line can be retried with [`M3uLineParser::add_line_with_replacement`].
#[derive(Debug)]
pub struct M3uLineParser {
    playlist: PathBuf,
    parse_extinf_tags: bool,
    pending_extinf: Option<String>,
    tracks: Vec<TrackRecord>,
}

impl M3uLineParser {
    /// Create a parser for lines of `playlist`.
    ///
    /// With `parse_extinf_tags`, metadata comes from `#EXTINF` lines; tracks
    /// without one, or every track when the flag is off, get their metadata
    /// from the audio file's tags.
    pub fn new(playlist: impl Into<PathBuf>, parse_extinf_tags: bool) -> Self {
        Self {
            playlist: playlist.into(),
            parse_extinf_tags,
            pending_extinf: None,
            tracks: Vec::new(),
        }
    }

    /// Feed one line.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::TrackError::NotFound`] for a path line that
    /// does not resolve, or a path error if it cannot be relativized.
    pub fn add_line(&mut self, raw: &str) -> Result<()> {
        self.add(raw, None)
    }

    /// Feed one line, resolving a path line through a user-supplied
    /// replacement file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::TrackError::ReplacementNotFound`] if the
    /// replacement does not lead to an existing file.
    pub fn add_line_with_replacement(&mut self, raw: &str, replacement: &Path) -> Result<()> {
        self.add(raw, Some(replacement))
    }

    fn add(&mut self, raw: &str, replacement: Option<&Path>) -> Result<()> {
        match Line::classify(raw) {
            Line::Blank | Line::Header => {}
            Line::Directive(line) => debug!("Skipping directive: {}", line),
            Line::ExtInf(payload) => self.pending_extinf = Some(payload.to_string()),
            Line::Path(line) => {
                let mut record = match replacement {
                    Some(file) => TrackRecord::resolve_with_replacement(&self.playlist, line, file)?,
                    None => TrackRecord::resolve(&self.playlist, line)?,
                };
                let extinf = self.pending_extinf.take();
                match extinf {
                    Some(payload) if self.parse_extinf_tags => record.set_metadata(parse_extinf(&payload)),
                    _ => record.read_tags_from_file(),
                }
                self.tracks.push(record);
            }
        }
        Ok(())
    }

    /// Records parsed so far.
    #[must_use]
    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    /// Consume the parser, returning its records.
    #[must_use]
    pub fn into_tracks(self) -> Vec<TrackRecord> {
        self.tracks
    }
}

/// Renders track records as M3U text.
#[derive(Debug)]
pub struct M3uLineWriter<'a> {
    playlist: &'a Path,
    out: String,
}

impl<'a> M3uLineWriter<'a> {
    /// Start rendering for the (absolute) target `playlist`.
    #[must_use]
    pub const fn new(playlist: &'a Path) -> Self {
        Self {
            playlist,
            out: String::new(),
        }
    }

    /// Write the `#EXTM3U` header.
    pub fn write_intro(&mut self) {
        self.out.push_str(EXTM3U_HEADER);
        self.out.push_str(LINE_END);
    }

    /// Write one track: an `#EXTINF` line if duration, artist and title are
    /// all known, then the path line and an empty line.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PathError::NoCommonRoot`] if the track cannot
    /// be made relative to the target playlist.
    pub fn write_track(&mut self, track: &TrackRecord) -> Result<()> {
        if let (Some(duration), Some(artist), Some(title)) =
            (track.duration_secs(), track.artist(), track.title())
        {
            self.out
                .push_str(&format!("{EXTINF_PREFIX}{duration},{artist} - {title}{LINE_END}"));
        }
        let path = track.path_for(self.playlist)?;
        self.out.push_str(&path);
        self.out.push_str(LINE_END);
        self.out.push_str(LINE_END);
        Ok(())
    }

    /// The rendered text.
    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, TrackError};
    use crate::path;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_classify() {
        assert_eq!(Line::classify("   "), Line::Blank);
        assert_eq!(Line::classify("#EXTM3U"), Line::Header);
        assert_eq!(Line::classify("#EXTINF:1,a - b\r"), Line::ExtInf("1,a - b"));
        assert_eq!(Line::classify("#PLAYLIST:x"), Line::Directive("#PLAYLIST:x"));
        assert_eq!(Line::classify("music/a.mp3\r"), Line::Path("music/a.mp3"));
    }

    #[test]
    fn test_parse_extinf_full() {
        let metadata = parse_extinf("180,Artist Name - Song Title");
        assert_eq!(metadata.duration_secs, Some(180));
        assert_eq!(metadata.artist.as_deref(), Some("Artist Name"));
        assert_eq!(metadata.title.as_deref(), Some("Song Title"));
    }

    #[test]
    fn test_parse_extinf_splits_on_first_separator_only() {
        let metadata = parse_extinf("200,AC/DC - Live - Remastered");
        assert_eq!(metadata.artist.as_deref(), Some("AC/DC"));
        assert_eq!(metadata.title.as_deref(), Some("Live - Remastered"));
    }

    #[test]
    fn test_parse_extinf_malformed() {
        let metadata = parse_extinf("-1,Just A Title");
        assert_eq!(metadata.duration_secs, None);
        assert_eq!(metadata.artist, None);
        assert_eq!(metadata.title.as_deref(), Some("Just A Title"));

        let metadata = parse_extinf("abc");
        assert!(!metadata.has_content());

        let metadata = parse_extinf("42,");
        assert_eq!(metadata.duration_secs, Some(42));
        assert_eq!(metadata.title, None);
    }

    #[test]
    fn test_last100_path() {
        assert_eq!(
            last100_path(Path::new("/music/list.m3u")),
            PathBuf::from("/music/list_last100.m3u")
        );
        assert_eq!(
            last100_path(Path::new("/music/my.list.m3u8")),
            PathBuf::from("/music/my.list_last100.m3u8")
        );
        assert_eq!(last100_path(Path::new("/music/list")), PathBuf::from("/music/list_last100"));
    }

    fn fixture() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir(temp_dir.path().join("music")).expect("mkdir");
        for name in ["a.mp3", "b.mp3"] {
            fs::write(temp_dir.path().join("music").join(name), b"audio").expect("write");
        }
        let playlist = path::absolute(&temp_dir.path().join("list.m3u")).expect("abs");
        (temp_dir, playlist)
    }

    #[test]
    fn test_parser_pairs_extinf_with_next_path() {
        let (_dir, playlist) = fixture();
        let mut parser = M3uLineParser::new(&playlist, true);
        for line in [
            "#EXTM3U",
            "",
            "#EXTINF:180,Artist Name - Song Title",
            "music/a.mp3",
            "#EXTVLCOPT:network-caching=1000",
            "music/b.mp3",
        ] {
            parser.add_line(line).expect("line should parse");
        }

        let tracks = parser.tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].duration_secs(), Some(180));
        assert_eq!(tracks[0].artist(), Some("Artist Name"));
        assert_eq!(tracks[0].title(), Some("Song Title"));
        assert!(!tracks[1].metadata().has_content());
    }

    #[test]
    fn test_parser_ignores_extinf_when_disabled() {
        let (_dir, playlist) = fixture();
        let mut parser = M3uLineParser::new(&playlist, false);
        parser.add_line("#EXTINF:180,Artist - Title").expect("extinf");
        parser.add_line("music/a.mp3").expect("path");
        assert!(!parser.tracks()[0].metadata().has_content());
    }

    #[test]
    fn test_parser_keeps_extinf_for_retry() {
        let (dir, playlist) = fixture();
        let mut parser = M3uLineParser::new(&playlist, true);
        parser.add_line("#EXTINF:60,X - Y").expect("extinf");

        let err = parser.add_line("gone/b.mp3").expect_err("missing");
        assert!(matches!(err, Error::Track(TrackError::NotFound { .. })));
        assert!(parser.tracks().is_empty());

        let replacement = dir.path().join("music").join("a.mp3");
        parser
            .add_line_with_replacement("gone/b.mp3", &replacement)
            .expect("replacement");
        assert_eq!(parser.tracks()[0].relative_path(), "music/b.mp3");
        assert_eq!(parser.tracks()[0].title(), Some("Y"));
    }

    #[test]
    fn test_writer_output_format() {
        let (_dir, playlist) = fixture();
        let mut parser = M3uLineParser::new(&playlist, true);
        for line in ["#EXTINF:180,Artist - Title", "music/a.mp3", "music/b.mp3"] {
            parser.add_line(line).expect("parse");
        }

        let mut writer = M3uLineWriter::new(&playlist);
        writer.write_intro();
        for track in parser.tracks() {
            writer.write_track(track).expect("write");
        }
        assert_eq!(
            writer.finish(),
            "#EXTM3U\r\n#EXTINF:180,Artist - Title\r\nmusic/a.mp3\r\n\r\nmusic/b.mp3\r\n\r\n"
        );
    }

    #[test]
    fn test_writer_skips_incomplete_extinf() {
        let (_dir, playlist) = fixture();
        let mut parser = M3uLineParser::new(&playlist, true);
        parser.add_line("#EXTINF:-1,Artist - Title").expect("extinf");
        parser.add_line("music/a.mp3").expect("path");

        let mut writer = M3uLineWriter::new(&playlist);
        writer.write_track(&parser.tracks()[0]).expect("write");
        assert_eq!(writer.finish(), "music/a.mp3\r\n\r\n");
    }
}
