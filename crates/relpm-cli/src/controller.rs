//! Drives background playlist tasks from the terminal.

use std::path::{Path, PathBuf};

use relpm_core::{
    PlaylistList, PlaylistTask, ProgressEvent, ReadOptions, ReadOutcome, TaskEvent, WriteOptions,
    WriteOutcome, spawn_read, spawn_write,
};
use tracing::{debug, info};

use crate::error::{CliError, CliResult};
use crate::prompt::Prompter;

/// Run `task` to completion, answering its questions with `prompter`.
pub async fn drive<T, P: Prompter>(mut task: PlaylistTask<T>, prompter: &mut P) -> CliResult<T> {
    while let Some(event) = task.next_event().await {
        match event {
            TaskEvent::Progress(progress) => report(&progress),
            TaskEvent::EncodingNeeded { candidates, reply } => {
                let answer = prompter.choose_encoding(&candidates).await;
                // A finished task no longer listens.
                let _ = reply.send(answer);
            }
            TaskEvent::TrackNotFound { path, reply } => {
                let answer = prompter.locate_track(&path).await;
                let _ = reply.send(answer);
            }
        }
    }
    Ok(task.finish().await?)
}

fn report(progress: &ProgressEvent) {
    match progress {
        ProgressEvent::Line(n) => debug!("Processed line {}", n),
        ProgressEvent::BeginParsing { total_lines } => info!("Parsing {} lines", total_lines),
        ProgressEvent::BeginWriting { total_tracks } => info!("Writing {} tracks", total_tracks),
        ProgressEvent::WritingLast100 => info!("Writing last-100 playlist"),
        other => debug!("{:?}", other),
    }
}

/// Read `playlist`, failing if the user aborts.
pub async fn read_playlist<P: Prompter>(
    playlist: &Path,
    options: ReadOptions,
    prompter: &mut P,
) -> CliResult<PlaylistList> {
    match drive(spawn_read(playlist.to_path_buf(), options), prompter).await? {
        ReadOutcome::Completed(list) => Ok(list),
        ReadOutcome::Cancelled { partial } => Err(CliError::Aborted(format!(
            "reading {} stopped after {} tracks",
            playlist.display(),
            partial.len()
        ))),
    }
}

/// Write `list` to `target`, failing if the user aborts.
///
/// Returns the written files.
pub async fn write_playlist<P: Prompter>(
    list: PlaylistList,
    target: &Path,
    options: WriteOptions,
    prompter: &mut P,
) -> CliResult<Vec<PathBuf>> {
    match drive(spawn_write(list, target.to_path_buf(), options), prompter).await? {
        WriteOutcome::Written { path, last100, encoding } => {
            info!("Saved {} as {}", path.display(), encoding);
            Ok(std::iter::once(path).chain(last100).collect())
        }
        WriteOutcome::Cancelled => Err(CliError::Aborted(format!(
            "nothing was written to {}",
            target.display()
        ))),
    }
}
