//! Running read and write sessions on a background thread.
//!
//! The engines in [`crate::reader`] and [`crate::writer`] are synchronous and
//! block while waiting for answers. Here they run on tokio's blocking pool;
//! their questions and progress reach the controller as [`TaskEvent`]s, and
//! answers travel back on a oneshot channel carried by the event. There is
//! no timeout: a suspended session waits until it is answered, the reply
//! sender is dropped, or the [`PlaylistTask`] itself is dropped.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::encoding::TextEncoding;
use crate::error::{Error, Result};
use crate::list::PlaylistList;
use crate::reader::{PlaylistReader, ReadOptions, ReadOutcome};
use crate::recovery::{ProgressEvent, RecoveryHandler};
use crate::writer::{PlaylistWriter, WriteOptions, WriteOutcome};

/// Something the controller must render or answer.
#[derive(Debug)]
pub enum TaskEvent {
    /// Progress notification.
    Progress(ProgressEvent),
    /// The session is suspended until an encoding is chosen.
    EncodingNeeded {
        /// Encodings to choose from.
        candidates: Vec<TextEncoding>,
        /// Send the choice, or `None` to abort.
        reply: oneshot::Sender<Option<TextEncoding>>,
    },
    /// The session is suspended until a missing track is located.
    TrackNotFound {
        /// The unresolved path line.
        path: String,
        /// Send a replacement file, or `None` to abort.
        reply: oneshot::Sender<Option<PathBuf>>,
    },
}

/// Recovery handler that forwards questions over a channel and blocks for
/// the answer.
struct ChannelRecovery {
    events: mpsc::UnboundedSender<TaskEvent>,
}

impl ChannelRecovery {
    fn ask<T>(&self, event: impl FnOnce(oneshot::Sender<Option<T>>) -> TaskEvent) -> Option<T> {
        let (reply, answer) = oneshot::channel();
        if self.events.send(event(reply)).is_err() {
            debug!("Controller is gone, aborting");
            return None;
        }
        answer.blocking_recv().ok().flatten()
    }
}

impl RecoveryHandler for ChannelRecovery {
    fn on_encoding_needed(&mut self, candidates: &[TextEncoding]) -> Option<TextEncoding> {
        self.ask(|reply| TaskEvent::EncodingNeeded {
            candidates: candidates.to_vec(),
            reply,
        })
    }

    fn on_track_not_found(&mut self, path: &str) -> Option<PathBuf> {
        self.ask(|reply| TaskEvent::TrackNotFound {
            path: path.to_string(),
            reply,
        })
    }
}

/// Handle to a session running in the background.
#[derive(Debug)]
pub struct PlaylistTask<T> {
    events: mpsc::UnboundedReceiver<TaskEvent>,
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<Result<T>>,
}

impl<T> PlaylistTask<T> {
    /// Next event, or `None` once the session has ended.
    pub async fn next_event(&mut self) -> Option<TaskEvent> {
        self.events.recv().await
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        info!("Cancelling playlist task");
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Get a cancellation token that can be shared across threads.
    #[must_use]
    pub fn cancellation_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Wait for the session to end and return its result.
    ///
    /// Pending events are discarded; any question still waiting is answered
    /// with an abort.
    ///
    /// # Errors
    ///
    /// Returns the session's own error, or [`Error::TaskFailed`] if the
    /// background thread panicked.
    pub async fn finish(self) -> Result<T> {
        drop(self.events);
        self.handle
            .await
            .map_err(|e| Error::TaskFailed(format!("Task join error: {e}")))?
    }
}

fn spawn<T, F>(session: F) -> PlaylistTask<T>
where
    T: Send + 'static,
    F: FnOnce(Arc<AtomicBool>, &mut ChannelRecovery, &mut dyn FnMut(ProgressEvent)) -> Result<T>
        + Send
        + 'static,
{
    let (events_tx, events) = mpsc::unbounded_channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    let token = Arc::clone(&cancelled);

    let handle = tokio::task::spawn_blocking(move || {
        let progress_tx = events_tx.clone();
        let mut progress = move |event: ProgressEvent| {
            // The controller may stop listening for progress.
            let _ = progress_tx.send(TaskEvent::Progress(event));
        };
        let mut recovery = ChannelRecovery { events: events_tx };
        session(token, &mut recovery, &mut progress)
    });

    PlaylistTask {
        events,
        cancelled,
        handle,
    }
}

/// Read `playlist` in the background.
#[must_use]
pub fn spawn_read(playlist: PathBuf, options: ReadOptions) -> PlaylistTask<ReadOutcome> {
    info!("Starting background read of {}", playlist.display());
    spawn(move |token, recovery, progress| {
        PlaylistReader::with_cancellation(options, token).read(&playlist, recovery, progress)
    })
}

/// Write `list` to `target` in the background.
#[must_use]
pub fn spawn_write(list: PlaylistList, target: PathBuf, options: WriteOptions) -> PlaylistTask<WriteOutcome> {
    info!("Starting background write of {}", target.display());
    spawn(move |token, recovery, progress| {
        PlaylistWriter::with_cancellation(options, token).write(&list, &target, recovery, progress)
    })
}
