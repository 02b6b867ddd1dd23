//! Ordered playlist contents.
//!
//! [`PlaylistList`] owns the track records of one playlist in play order.
//! All index based edits keep the relative order of untouched records.
//! The list is not synchronized; a controller must make sure only one task
//! edits it at a time.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PlaylistError, Result};
use crate::track::TrackRecord;

/// The records of a playlist plus the playlist file they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistList {
    playlist: PathBuf,
    tracks: Vec<TrackRecord>,
}

impl PlaylistList {
    /// Create an empty list for `playlist`.
    pub fn new(playlist: impl Into<PathBuf>) -> Self {
        Self {
            playlist: playlist.into(),
            tracks: Vec::new(),
        }
    }

    /// Create a list from already resolved records.
    pub fn with_tracks(playlist: impl Into<PathBuf>, tracks: Vec<TrackRecord>) -> Self {
        Self {
            playlist: playlist.into(),
            tracks,
        }
    }

    /// The playlist file this list belongs to.
    #[must_use]
    pub fn playlist(&self) -> &Path {
        &self.playlist
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the list has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Record at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TrackRecord> {
        self.tracks.get(index)
    }

    /// Mutable record at `index`, for metadata edits.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut TrackRecord> {
        self.tracks.get_mut(index)
    }

    /// Iterate records in play order.
    pub fn iter(&self) -> std::slice::Iter<'_, TrackRecord> {
        self.tracks.iter()
    }

    /// All records as a slice.
    #[must_use]
    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    /// Consume the list, returning its records.
    #[must_use]
    pub fn into_tracks(self) -> Vec<TrackRecord> {
        self.tracks
    }

    /// Index of the first record equal to `record`.
    #[must_use]
    pub fn index_of(&self, record: &TrackRecord) -> Option<usize> {
        self.tracks.iter().position(|t| t == record)
    }

    /// Append a record.
    pub fn push(&mut self, record: TrackRecord) {
        self.tracks.push(record);
    }

    /// Remove and return the record at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaylistError::IndexOutOfRange`] for an invalid index.
    pub fn remove(&mut self, index: usize) -> Result<TrackRecord> {
        self.check_index(index)?;
        Ok(self.tracks.remove(index))
    }

    /// Insert a batch so that its first record lands at `index`, the rest
    /// follow in order and everything from `index` onwards shifts right.
    ///
    /// `index == len()` appends.
    ///
    /// # Errors
    ///
    /// Returns [`PlaylistError::IndexOutOfRange`] if `index > len()`.
    pub fn insert_at(&mut self, index: usize, batch: Vec<TrackRecord>) -> Result<()> {
        if index > self.tracks.len() {
            return Err(self.out_of_range(index));
        }
        self.tracks.splice(index..index, batch);
        Ok(())
    }

    /// Remove several records, returned in ascending index order.
    ///
    /// Duplicate indices are ignored. Nothing is removed if any index is
    /// invalid.
    ///
    /// # Errors
    ///
    /// Returns [`PlaylistError::IndexOutOfRange`] for the first invalid index.
    pub fn remove_many(&mut self, indices: &[usize]) -> Result<Vec<TrackRecord>> {
        let sorted = self.sorted_indices(indices)?;
        let mut removed: Vec<TrackRecord> = sorted
            .iter()
            .rev()
            .map(|&index| self.tracks.remove(index))
            .collect();
        removed.reverse();
        debug!("Removed {} tracks", removed.len());
        Ok(removed)
    }

    /// Move the records at `indices` as one block to `drop_index`.
    ///
    /// `drop_index` is a position in the list before the move. The block
    /// keeps its relative order and ends up before the first unselected
    /// record at or after `drop_index`, or at the end. Returns the new index
    /// of the first moved record.
    ///
    /// # Errors
    ///
    /// Returns [`PlaylistError::IndexOutOfRange`] if an index or
    /// `drop_index > len()` is invalid.
    pub fn move_items(&mut self, indices: &[usize], drop_index: usize) -> Result<usize> {
        if drop_index > self.tracks.len() {
            return Err(self.out_of_range(drop_index));
        }
        let selected_before = self
            .sorted_indices(indices)?
            .iter()
            .filter(|&&i| i < drop_index)
            .count();

        let moved = self.remove_many(indices)?;
        let target = drop_index - selected_before;
        self.insert_at(target, moved)?;
        Ok(target)
    }

    /// Build records for user-chosen files and insert them at `index`.
    ///
    /// With `read_tags` set, each file's own audio tags fill in the
    /// metadata. Nothing is inserted if any file fails to resolve.
    ///
    /// # Errors
    ///
    /// Returns a track or path error for the first file that cannot be
    /// resolved against this list's playlist, or
    /// [`PlaylistError::IndexOutOfRange`] if `index > len()`.
    pub fn insert_files<P: AsRef<Path>>(&mut self, index: usize, files: &[P], read_tags: bool) -> Result<()> {
        if index > self.tracks.len() {
            return Err(self.out_of_range(index));
        }
        let batch = files
            .iter()
            .map(|file| {
                let mut record = TrackRecord::from_file(&self.playlist, file.as_ref())?;
                if read_tags {
                    record.read_tags_from_file();
                }
                Ok(record)
            })
            .collect::<Result<Vec<_>>>()?;

        info!("Inserting {} files at index {}", batch.len(), index);
        self.insert_at(index, batch)
    }

    fn sorted_indices(&self, indices: &[usize]) -> Result<Vec<usize>> {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        if let Some(&bad) = sorted.iter().find(|&&i| i >= self.tracks.len()) {
            return Err(self.out_of_range(bad));
        }
        Ok(sorted)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.tracks.len() {
            Ok(())
        } else {
            Err(self.out_of_range(index))
        }
    }

    fn out_of_range(&self, index: usize) -> crate::error::Error {
        PlaylistError::IndexOutOfRange {
            index,
            len: self.tracks.len(),
        }
        .into()
    }
}

impl<'a> IntoIterator for &'a PlaylistList {
    type Item = &'a TrackRecord;
    type IntoIter = std::slice::Iter<'a, TrackRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}
