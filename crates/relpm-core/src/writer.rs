//! Writing a [`PlaylistList`] to disk.
//!
//! All text is rendered before anything touches the file system, so the
//! encoding question can be asked with the full output in hand, and an abort
//! leaves existing files untouched.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::encoding::{TextEncoding, contains_non_ascii, write_candidates};
use crate::error::{FileSystemError, Result};
use crate::list::PlaylistList;
use crate::m3u::{LAST100_LEN, M3uLineWriter, last100_path};
use crate::path;
use crate::recovery::{ProgressEvent, RecoveryHandler};
use crate::track::TrackRecord;

/// Options for writing a playlist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Also write the last-100 companion file.
    pub write_last100: bool,
    /// Preset encoding used instead of asking when non-ASCII text is found.
    pub encoding: Option<TextEncoding>,
}

/// How a write session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The playlist (and maybe its companion) was written.
    Written {
        /// Main playlist file.
        path: PathBuf,
        /// Last-100 companion, if written.
        last100: Option<PathBuf>,
        /// Encoding of both files.
        encoding: TextEncoding,
    },
    /// The user aborted; nothing was written.
    Cancelled,
}

/// Writes playlists.
#[derive(Debug)]
pub struct PlaylistWriter {
    options: WriteOptions,
    cancelled: Arc<AtomicBool>,
}

struct Rendered {
    path: PathBuf,
    text: String,
}

impl PlaylistWriter {
    /// Create a writer.
    #[must_use]
    pub fn new(options: WriteOptions) -> Self {
        Self::with_cancellation(options, Arc::new(AtomicBool::new(false)))
    }

    /// Create a writer sharing an existing cancellation flag.
    #[must_use]
    pub const fn with_cancellation(options: WriteOptions, cancelled: Arc<AtomicBool>) -> Self {
        Self { options, cancelled }
    }

    /// Request cancellation; honoured before the next record.
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

    /// Write `list` to `target`.
    ///
    /// Paths are reused verbatim for records read from `target` itself and
    /// recomputed for all others.
    ///
    /// # Errors
    ///
    /// Fails without writing anything if a record cannot be made relative to
    /// `target` or the text cannot be encoded, and with a file system error
    /// if a file or its directory cannot be written.
    pub fn write(
        &self,
        list: &PlaylistList,
        target: &Path,
        handler: &mut dyn RecoveryHandler,
        mut progress: impl FnMut(ProgressEvent),
    ) -> Result<WriteOutcome> {
        let target = path::absolute(target)?;
        let tracks = list.tracks();

        progress(ProgressEvent::BeginWriting {
            total_tracks: tracks.len(),
        });
        let Some(main) = self.render(&target, tracks, &mut progress)? else {
            return Ok(WriteOutcome::Cancelled);
        };

        let companion = if self.options.write_last100 {
            progress(ProgressEvent::WritingLast100);
            let companion_path = last100_path(&target);
            let start = tracks.len().saturating_sub(LAST100_LEN);
            match self.render(&companion_path, &tracks[start..], &mut |_| {})? {
                Some(rendered) => Some(rendered),
                None => return Ok(WriteOutcome::Cancelled),
            }
        } else {
            None
        };

        progress(ProgressEvent::ScanningEncoding);
        let needs_choice = contains_non_ascii(&main.text)
            || companion.as_ref().is_some_and(|c| contains_non_ascii(&c.text));
        let encoding = if needs_choice {
            match self.options.encoding {
                Some(preset) => preset,
                None => {
                    progress(ProgressEvent::EncodingNeeded);
                    match handler.on_encoding_needed(&write_candidates()) {
                        Some(chosen) => chosen,
                        None => {
                            info!("Writing {} aborted at encoding choice", target.display());
                            return Ok(WriteOutcome::Cancelled);
                        }
                    }
                }
            }
        } else {
            TextEncoding::utf8()
        };

        let main_bytes = encoding.encode(&main.text)?;
        let companion_bytes = companion
            .as_ref()
            .map(|c| encoding.encode(&c.text))
            .transpose()?;

        if self.is_cancelled() {
            return Ok(WriteOutcome::Cancelled);
        }

        write_file(&main.path, &main_bytes)?;
        if let (Some(companion), Some(bytes)) = (&companion, &companion_bytes) {
            write_file(&companion.path, bytes)?;
        }

        info!(
            "Wrote {} tracks to {} as {}",
            tracks.len(),
            main.path.display(),
            encoding
        );
        Ok(WriteOutcome::Written {
            path: main.path,
            last100: companion.map(|c| c.path),
            encoding,
        })
    }

    fn render(
        &self,
        target: &Path,
        tracks: &[TrackRecord],
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<Option<Rendered>> {
        let mut writer = M3uLineWriter::new(target);
        writer.write_intro();
        for (index, track) in tracks.iter().enumerate() {
            if self.is_cancelled() {
                info!("Writing {} cancelled at record {}", target.display(), index + 1);
                return Ok(None);
            }
            writer.write_track(track)?;
            progress(ProgressEvent::Line(index + 1));
        }
        debug!("Rendered {} records for {}", tracks.len(), target.display());
        Ok(Some(Rendered {
            path: target.to_path_buf(),
            text: writer.finish(),
        }))
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| FileSystemError::CreateDirFailed {
            path: parent.to_path_buf(),
            reason: e.to_string(),
        })?;
    }
    fs::write(path, bytes).map_err(|e| FileSystemError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::recovery::{MockRecoveryHandler, NonInteractive};
    use tempfile::TempDir;

    fn setup(names: &[&str]) -> (TempDir, PlaylistList) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let music = temp_dir.path().join("music");
        fs::create_dir_all(&music).expect("mkdir");
        let playlist = temp_dir.path().join("list.m3u");
        let mut list = PlaylistList::new(&playlist);
        for name in names {
            let file = music.join(name);
            fs::write(&file, b"audio").expect("write track");
            list.push(TrackRecord::from_file(&playlist, &file).expect("record"));
        }
        (temp_dir, list)
    }

    #[test]
    fn test_write_plain_ascii() {
        let (dir, mut list) = setup(&["a.mp3", "b.mp3"]);
        {
            let first = list.get_mut(0).expect("first");
            first.set_artist(Some("Artist".to_string()));
            first.set_title(Some("Title".to_string()));
            first.set_duration_secs(Some(180));
        }
        let target = dir.path().join("list.m3u");

        let mut events = Vec::new();
        let outcome = PlaylistWriter::new(WriteOptions::default())
            .write(&list, &target, &mut NonInteractive::default(), |e| events.push(e))
            .expect("write should succeed");

        assert!(matches!(outcome, WriteOutcome::Written { last100: None, .. }));
        let text = fs::read_to_string(&target).expect("read back");
        assert_eq!(
            text,
            "#EXTM3U\r\n#EXTINF:180,Artist - Title\r\nmusic/a.mp3\r\n\r\nmusic/b.mp3\r\n\r\n"
        );
        assert_eq!(events[0], ProgressEvent::BeginWriting { total_tracks: 2 });
        assert!(events.contains(&ProgressEvent::Line(2)));
    }

    #[test]
    fn test_write_elsewhere_recomputes_paths() {
        let (dir, list) = setup(&["a.mp3"]);
        let target = dir.path().join("nested").join("deeper").join("copy.m3u");

        PlaylistWriter::new(WriteOptions::default())
            .write(&list, &target, &mut NonInteractive::default(), |_| {})
            .expect("write should succeed");

        let text = fs::read_to_string(&target).expect("read back");
        assert!(text.contains("../../music/a.mp3\r\n"));
    }

    #[test]
    fn test_last100_holds_final_records() {
        let names: Vec<String> = (0..105).map(|i| format!("t{i:03}.mp3")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let (dir, list) = setup(&refs);
        let target = dir.path().join("list.m3u");

        let options = WriteOptions {
            write_last100: true,
            ..WriteOptions::default()
        };
        let outcome = PlaylistWriter::new(options)
            .write(&list, &target, &mut NonInteractive::default(), |_| {})
            .expect("write should succeed");

        let WriteOutcome::Written { last100: Some(companion), .. } = outcome else {
            panic!("expected a companion file");
        };
        assert_eq!(companion, dir.path().join("list_last100.m3u"));
        let text = fs::read_to_string(&companion).expect("read companion");
        let paths: Vec<&str> = text.lines().filter(|l| l.starts_with("music/")).collect();
        assert_eq!(paths.len(), 100);
        assert_eq!(paths[0], "music/t005.mp3");
        assert_eq!(paths[99], "music/t104.mp3");
    }

    #[test]
    fn test_non_ascii_asks_and_encodes() {
        let (dir, mut list) = setup(&["a.mp3"]);
        {
            let first = list.get_mut(0).expect("first");
            first.set_artist(Some("Motörhead".to_string()));
            first.set_title(Some("Ace".to_string()));
            first.set_duration_secs(Some(100));
        }
        let target = dir.path().join("list.m3u");

        let mut handler = MockRecoveryHandler::new();
        handler
            .expect_on_encoding_needed()
            .withf(|candidates| candidates.iter().all(TextEncoding::can_encode))
            .times(1)
            .returning(|_| TextEncoding::for_label("windows-1252").ok());

        PlaylistWriter::new(WriteOptions::default())
            .write(&list, &target, &mut handler, |_| {})
            .expect("write should succeed");

        let bytes = fs::read(&target).expect("read back");
        assert!(bytes.windows(9).any(|w| w == b"Mot\xf6rhead"));
    }

    #[test]
    fn test_encoding_refused_writes_nothing() {
        let (dir, mut list) = setup(&["ä.mp3"]);
        list.get_mut(0).expect("first").set_title(Some("x".to_string()));
        let target = dir.path().join("list.m3u");

        let outcome = PlaylistWriter::new(WriteOptions::default())
            .write(&list, &target, &mut NonInteractive::default(), |_| {})
            .expect("abort is not an error");
        assert_eq!(outcome, WriteOutcome::Cancelled);
        assert!(!target.exists());
    }

    #[test]
    fn test_unmappable_fails() {
        let (dir, list) = setup(&["日本.mp3"]);
        let target = dir.path().join("list.m3u");
        let options = WriteOptions {
            encoding: TextEncoding::for_label("windows-1252").ok(),
            ..WriteOptions::default()
        };

        let err = PlaylistWriter::new(options)
            .write(&list, &target, &mut NonInteractive::default(), |_| {})
            .expect_err("cannot encode");
        assert!(matches!(err, Error::Encoding(_)));
        assert!(!target.exists());
    }

    #[test]
    fn test_cancelled_writes_nothing() {
        let (dir, list) = setup(&["a.mp3"]);
        let target = dir.path().join("list.m3u");
        let writer = PlaylistWriter::new(WriteOptions::default());
        writer.cancel();

        let outcome = writer
            .write(&list, &target, &mut NonInteractive::default(), |_| {})
            .expect("abort is not an error");
        assert_eq!(outcome, WriteOutcome::Cancelled);
        assert!(!target.exists());
    }

    #[test]
    fn test_cancelled_mid_write_writes_nothing() {
        let (dir, list) = setup(&["a.mp3", "b.mp3", "c.mp3"]);
        let target = dir.path().join("list.m3u");
        let writer = PlaylistWriter::new(WriteOptions {
            write_last100: true,
            ..WriteOptions::default()
        });
        let token = writer.cancellation_token();

        let mut lines = Vec::new();
        let outcome = writer
            .write(&list, &target, &mut NonInteractive::default(), |event| {
                if event == ProgressEvent::Line(1) {
                    token.store(true, Ordering::SeqCst);
                }
                if let ProgressEvent::Line(n) = event {
                    lines.push(n);
                }
            })
            .expect("abort is not an error");

        assert_eq!(outcome, WriteOutcome::Cancelled);
        assert_eq!(lines, [1]);
        assert!(!target.exists());
        assert!(!dir.path().join("list_last100.m3u").exists());
    }
}
