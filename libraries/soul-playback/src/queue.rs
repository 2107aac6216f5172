//! Ordered play queue
//!
//! Duplicates are allowed. Lookups by id resolve to the first match, removal
//! by id removes every match.
//!
//! While shuffled the queue keeps a snapshot of the order it had before the
//! shuffle. Additions and removals are mirrored into the snapshot, so turning
//! shuffle off restores the pre-shuffle order with those edits applied.

use crate::shuffle::{shuffle_pinned, shuffle_random};
use crate::types::{LoopMode, OrderMode};
use soul_core::{Result, SoulError, Track};

#[derive(Debug, Clone, Default)]
pub struct QueueManager {
    /// Live order
    tracks: Vec<Track>,

    /// Order before shuffle (for restoring)
    original: Option<Vec<Track>>,
}

impl QueueManager {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue
    ///
    /// `Shuffle` leaves the queue shuffled with the input order as snapshot.
    ///
    /// # Errors
    /// `InvalidInput` for an empty track list
    pub fn set_queue(&mut self, tracks: Vec<Track>, mode: OrderMode) -> Result<()> {
        if tracks.is_empty() {
            return Err(SoulError::invalid_input("queue must contain at least one track"));
        }

        match mode {
            OrderMode::Default => {
                self.tracks = tracks;
                self.original = None;
            }
            OrderMode::Reverse => {
                self.tracks = tracks.into_iter().rev().collect();
                self.original = None;
            }
            OrderMode::Shuffle => {
                let mut shuffled = tracks.clone();
                shuffle_random(&mut shuffled);
                self.tracks = shuffled;
                self.original = Some(tracks);
            }
        }

        Ok(())
    }

    /// Append tracks; the caller's cursor is unaffected
    pub fn add_to_queue(&mut self, tracks: Vec<Track>) {
        if let Some(original) = self.original.as_mut() {
            original.extend(tracks.iter().cloned());
        }
        self.tracks.extend(tracks);
    }

    /// Remove every entry with `id`
    ///
    /// Returns true when something was removed
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        let before = self.tracks.len();
        self.tracks.retain(|t| t.id != id);
        if let Some(original) = self.original.as_mut() {
            original.retain(|t| t.id != id);
        }
        self.tracks.len() != before
    }

    /// Number of entries with `id` before `index`
    pub fn count_before(&self, id: &str, index: usize) -> usize {
        self.tracks
            .iter()
            .take(index)
            .filter(|t| t.id == id)
            .count()
    }

    /// Move the entry at `from` to `to`
    ///
    /// Out of range indices leave the queue untouched and return false
    pub fn move_track(&mut self, from: usize, to: usize) -> bool {
        let len = self.tracks.len();
        if from >= len || to >= len {
            return false;
        }
        if from != to {
            let track = self.tracks.remove(from);
            self.tracks.insert(to, track);
        }
        true
    }

    /// Shuffle the live order
    ///
    /// When `pinned_id` resolves, that entry stays in its current slot.
    pub fn shuffle(&mut self, pinned_id: Option<&str>) {
        let pinned = pinned_id.and_then(|id| self.position_of(id));
        shuffle_pinned(&mut self.tracks, pinned);
    }

    /// Snapshot the current order and shuffle
    ///
    /// Returns false if already shuffled
    pub fn enable_shuffle(&mut self, pinned_id: Option<&str>) -> bool {
        if self.original.is_some() {
            return false;
        }
        self.original = Some(self.tracks.clone());
        self.shuffle(pinned_id);
        true
    }

    /// Restore the pre-shuffle order
    ///
    /// Returns false if not shuffled
    pub fn disable_shuffle(&mut self) -> bool {
        match self.original.take() {
            Some(original) => {
                self.tracks = original;
                true
            }
            None => false,
        }
    }

    pub fn is_shuffled(&self) -> bool {
        self.original.is_some()
    }

    /// Index to play after `current`
    ///
    /// `None` means the queue is exhausted (loop `Off` at the end, or empty).
    pub fn next_index(&self, current: usize, loop_mode: LoopMode) -> Option<usize> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }

        match loop_mode {
            LoopMode::Single => Some(current.min(len - 1)),
            LoopMode::Queue => Some((current + 1) % len),
            LoopMode::Off => {
                let next = current + 1;
                (next < len).then_some(next)
            }
        }
    }

    /// Index to play before `current`, `None` at the start
    pub fn previous_index(&self, current: usize) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        current.checked_sub(1).map(|i| i.min(self.tracks.len() - 1))
    }

    /// Index of the first entry with `id`
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Drop every entry and the shuffle snapshot
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.original = None;
    }
}
