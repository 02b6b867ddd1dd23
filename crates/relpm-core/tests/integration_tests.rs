//! Integration tests for `RelPM` core workflows.
//!
//! These tests verify end-to-end workflows including:
//! - Reading, editing and rewriting a playlist in place
//! - Moving a playlist to another directory
//! - The last-100 companion playlist
//! - Recovering tracks that moved, synchronously and through the task bridge
//!
//! All tests use temporary directories as fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use id3::{Tag, TagLike, Version};
use relpm_core::{
    // Errors
    Error,
    // Engines
    NonInteractive,
    PlaylistList,
    PlaylistReader,
    PlaylistWriter,
    ProgressEvent,
    ReadOptions,
    ReadOutcome,
    RecoveryHandler,
    Result,
    // Task bridge
    TaskEvent,
    TextEncoding,
    WriteOptions,
    WriteOutcome,
    // Paths
    Separator,
    relative_path,
    resolve_relative,
    spawn_read,
};
use tempfile::TempDir;

// =============================================================================
// Test Fixtures and Utilities
// =============================================================================

/// A music library and playlist directory inside one temporary root.
struct TestFixture {
    root: TempDir,
}

impl TestFixture {
    fn new() -> Result<Self> {
        let root = TempDir::new()
            .map_err(|e| Error::Configuration(format!("Failed to create temp dir: {e}")))?;
        fs::create_dir_all(root.path().join("music"))
            .map_err(|e| Error::Configuration(format!("Failed to create music dir: {e}")))?;
        fs::create_dir_all(root.path().join("lists"))
            .map_err(|e| Error::Configuration(format!("Failed to create lists dir: {e}")))?;
        Ok(Self { root })
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    /// Create an audio file under `music/` and return its path.
    fn track(&self, relative: &str) -> PathBuf {
        let path = self.path().join("music").join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create track dir");
        }
        fs::write(&path, b"audio").expect("write track");
        path
    }

    /// Create an MP3 file with an ID3 tag.
    fn tagged_track(&self, relative: &str, artist: &str, title: &str, duration_ms: u32) -> PathBuf {
        let path = self.track(relative);
        let mut tag = Tag::new();
        tag.set_artist(artist);
        tag.set_title(title);
        tag.set_duration(duration_ms);
        tag.write_to_path(&path, Version::Id3v23).expect("write tag");
        path
    }

    fn playlist(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join("lists").join(name);
        fs::write(&path, content).expect("write playlist");
        path
    }
}

fn read(playlist: &Path, handler: &mut dyn RecoveryHandler) -> ReadOutcome {
    PlaylistReader::new(ReadOptions::default())
        .read(playlist, handler, |_| {})
        .expect("read should succeed")
}

fn write(list: &PlaylistList, target: &Path, options: WriteOptions) -> WriteOutcome {
    PlaylistWriter::new(options)
        .write(list, target, &mut NonInteractive::default(), |_| {})
        .expect("write should succeed")
}

/// Handler that answers every missing track with the same file.
struct AlwaysReplace(PathBuf, usize);

impl RecoveryHandler for AlwaysReplace {
    fn on_encoding_needed(&mut self, _candidates: &[TextEncoding]) -> Option<TextEncoding> {
        None
    }

    fn on_track_not_found(&mut self, _path: &str) -> Option<PathBuf> {
        self.1 += 1;
        Some(self.0.clone())
    }
}

// =============================================================================
// Read / Write Workflows
// =============================================================================

#[test]
fn test_write_then_read_is_idempotent() {
    let fx = TestFixture::new().expect("fixture");
    fx.track("rock/one.mp3");
    fx.track("rock/two.mp3");
    fx.track("jazz/three.mp3");
    let playlist = fx.playlist(
        "mix.m3u",
        "#EXTM3U\n#EXTINF:180,Artist Name - Song Title\n../music/rock/one.mp3\n../music/rock/two.mp3\n#EXTINF:95,Trio - Take - Two\n../music/jazz/three.mp3\n",
    );

    let first = read(&playlist, &mut NonInteractive::default()).into_list();
    assert_eq!(first.len(), 3);

    write(&first, &playlist, WriteOptions::default());
    let second = read(&playlist, &mut NonInteractive::default()).into_list();

    assert_eq!(second.len(), first.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.relative_path(), b.relative_path());
        assert_eq!(a.metadata(), b.metadata());
    }
    assert_eq!(second.get(2).expect("third").title(), Some("Take - Two"));
}

#[test]
fn test_edit_and_save() {
    let fx = TestFixture::new().expect("fixture");
    for name in ["a.mp3", "b.mp3", "c.mp3"] {
        fx.track(name);
    }
    let new_track = fx.tagged_track("new/d.mp3", "Band", "Fresh", 61_000);
    let playlist = fx.playlist("list.m3u", "../music/a.mp3\n../music/b.mp3\n../music/c.mp3\n");

    let mut list = read(&playlist, &mut NonInteractive::default()).into_list();
    list.remove(1).expect("remove b");
    list.insert_files(0, &[&new_track], true).expect("insert d");
    list.move_items(&[2], 1).expect("move c up");
    write(&list, &playlist, WriteOptions::default());

    let text = fs::read_to_string(&playlist).expect("read back");
    assert_eq!(
        text,
        "#EXTM3U\r\n#EXTINF:61,Band - Fresh\r\n../music/new/d.mp3\r\n\r\n../music/c.mp3\r\n\r\n../music/a.mp3\r\n\r\n"
    );
}

#[test]
fn test_save_as_in_other_directory_relocates_paths() {
    let fx = TestFixture::new().expect("fixture");
    let song = fx.track("album/song.mp3");
    let playlist = fx.playlist("list.m3u", &format!("{}\n", song.display()));

    let list = read(&playlist, &mut NonInteractive::default()).into_list();
    assert_eq!(list.get(0).expect("song").relative_path(), "../music/album/song.mp3");

    let moved = fx.path().join("music").join("album").join("here.m3u");
    write(&list, &moved, WriteOptions::default());

    let text = fs::read_to_string(&moved).expect("read back");
    assert_eq!(text, "#EXTM3U\r\nsong.mp3\r\n\r\n");

    let reread = read(&moved, &mut NonInteractive::default()).into_list();
    assert_eq!(reread.get(0).expect("song").absolute_path(), list.get(0).expect("song").absolute_path());
}

#[test]
fn test_last100_companion() {
    let fx = TestFixture::new().expect("fixture");
    let mut content = String::new();
    for i in 0..150 {
        fx.track(&format!("t{i:03}.mp3"));
        content.push_str(&format!("../music/t{i:03}.mp3\n"));
    }
    let playlist = fx.playlist("big.m3u", &content);
    let list = read(&playlist, &mut NonInteractive::default()).into_list();

    let outcome = write(
        &list,
        &playlist,
        WriteOptions {
            write_last100: true,
            ..WriteOptions::default()
        },
    );
    let WriteOutcome::Written { last100: Some(companion), .. } = outcome else {
        panic!("expected last-100 file");
    };
    assert_eq!(companion.file_name().and_then(|n| n.to_str()), Some("big_last100.m3u"));

    let last = read(&companion, &mut NonInteractive::default()).into_list();
    assert_eq!(last.len(), 100);
    for (i, track) in last.iter().enumerate() {
        assert_eq!(track.relative_path(), format!("../music/t{:03}.mp3", i + 50));
    }
}

#[test]
fn test_tags_from_files_when_extinf_disabled() {
    let fx = TestFixture::new().expect("fixture");
    fx.tagged_track("tagged.mp3", "Real Artist", "Real Title", 200_999);
    let playlist = fx.playlist("list.m3u", "#EXTINF:1,Fake - Fake\n../music/tagged.mp3\n");

    let options = ReadOptions {
        parse_extinf_tags: false,
        ..ReadOptions::default()
    };
    let list = PlaylistReader::new(options)
        .read(&playlist, &mut NonInteractive::default(), |_| {})
        .expect("read should succeed")
        .into_list();

    let track = list.get(0).expect("track");
    assert_eq!(track.artist(), Some("Real Artist"));
    assert_eq!(track.title(), Some("Real Title"));
    assert_eq!(track.duration_secs(), Some(200));
}

// =============================================================================
// Recovery Workflows
// =============================================================================

#[test]
fn test_moved_album_is_recovered_line_by_line() {
    let fx = TestFixture::new().expect("fixture");
    let one = fx.track("new-home/one.mp3");
    fx.track("new-home/two.mp3");
    fx.track("stays.mp3");
    let playlist = fx.playlist(
        "list.m3u",
        "#EXTINF:10,A - One\n../old-home/one.mp3\n../music/stays.mp3\n#EXTINF:20,A - Two\n../old-home/two.mp3\n",
    );

    let mut handler = AlwaysReplace(one, 0);
    let mut lines = Vec::new();
    let list = PlaylistReader::new(ReadOptions::default())
        .read(&playlist, &mut handler, |e| {
            if let ProgressEvent::Line(n) = e {
                lines.push(n);
            }
        })
        .expect("read should succeed")
        .into_list();

    assert_eq!(handler.1, 2);
    assert_eq!(lines, [1, 2, 3, 4, 5]);
    let paths: Vec<&str> = list.iter().map(|t| t.relative_path()).collect();
    assert_eq!(paths, ["../music/new-home/one.mp3", "../music/stays.mp3", "../music/new-home/two.mp3"]);
    assert_eq!(list.get(2).expect("two").title(), Some("Two"));
}

#[tokio::test]
async fn test_task_bridge_round_trip() {
    let fx = TestFixture::new().expect("fixture");
    let found = fx.track("found/x.mp3");
    let playlist = fx.playlist("list.m3u", "../lost/x.mp3\n");

    let mut task = spawn_read(playlist.clone(), ReadOptions::default());
    let mut states = Vec::new();
    while let Some(event) = task.next_event().await {
        match event {
            TaskEvent::Progress(p) => states.push(p),
            TaskEvent::TrackNotFound { reply, .. } => {
                reply.send(Some(found.clone())).expect("reply");
            }
            TaskEvent::EncodingNeeded { reply, .. } => {
                reply.send(None).expect("reply");
            }
        }
    }
    let list = task.finish().await.expect("task should succeed").into_list();

    assert_eq!(list.len(), 1);
    assert_eq!(states.first(), Some(&ProgressEvent::Reading));
    assert!(states.contains(&ProgressEvent::TrackNotFound {
        path: "../lost/x.mp3".to_string()
    }));
}

// =============================================================================
// Path Properties
// =============================================================================

#[test]
fn test_relativize_resolve_round_trip() {
    let bases = ["/srv/music/lists", "/srv/music", "/srv", "/home/user/playlists/2024"];
    let targets = [
        "/srv/music/rock/a.mp3",
        "/srv/music/lists/b.mp3",
        "/home/user/c.mp3",
        "/d.mp3",
    ];
    for base in bases {
        for target in targets {
            let rel = relative_path(target, &format!("{base}/"), Separator::Unix).expect("relativize");
            let back = resolve_relative(base, &rel, Separator::Unix).expect("resolve");
            assert_eq!(back, target, "{target} from {base} via {rel}");
        }
    }
}
