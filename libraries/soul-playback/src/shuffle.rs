//! Shuffle algorithms for queue randomization
//!
//! Fisher-Yates over the whole queue, optionally keeping one entry pinned to
//! the slot it occupied before the shuffle.

use rand::seq::SliceRandom;
use rand::thread_rng;
use soul_core::Track;

/// Pure random shuffle using Fisher-Yates algorithm
///
/// Each track has equal probability of appearing at any position.
pub fn shuffle_random(tracks: &mut [Track]) {
    let mut rng = thread_rng();
    tracks.shuffle(&mut rng);
}

/// Shuffle, then swap the entry that was at `pinned` back into that slot
///
/// Indices out of range behave like an unpinned shuffle.
pub fn shuffle_pinned(tracks: &mut [Track], pinned: Option<usize>) {
    let mut order: Vec<usize> = (0..tracks.len()).collect();
    order.shuffle(&mut thread_rng());

    if let Some(pinned) = pinned.filter(|&i| i < tracks.len()) {
        if let Some(landed) = order.iter().position(|&i| i == pinned) {
            order.swap(landed, pinned);
        }
    }

    let original = tracks.to_vec();
    for (slot, from) in tracks.iter_mut().zip(order) {
        slot.clone_from(&original[from]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn create_test_tracks(count: usize) -> Vec<Track> {
        (0..count)
            .map(|i| Track::new(format!("{}", i), format!("Track {}", i)))
            .collect()
    }

    fn ids(tracks: &[Track]) -> Vec<String> {
        tracks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_random_shuffle_changes_order() {
        let original = create_test_tracks(50);
        let mut shuffled = original.clone();
        shuffle_random(&mut shuffled);

        // Very unlikely to match
        assert_ne!(ids(&original), ids(&shuffled));
    }

    #[test]
    fn test_shuffle_preserves_all_tracks() {
        let original = create_test_tracks(20);
        let mut shuffled = original.clone();
        shuffle_pinned(&mut shuffled, None);

        let before: HashSet<_> = ids(&original).into_iter().collect();
        let after: HashSet<_> = ids(&shuffled).into_iter().collect();
        assert_eq!(before, after);
        assert_eq!(shuffled.len(), 20);
    }

    #[test]
    fn test_pinned_entry_keeps_its_slot() {
        for _ in 0..50 {
            let mut tracks = create_test_tracks(10);
            shuffle_pinned(&mut tracks, Some(4));
            assert_eq!(tracks[4].id, "4");
        }
    }

    #[test]
    fn test_out_of_range_pin_is_ignored() {
        let mut tracks = create_test_tracks(5);
        shuffle_pinned(&mut tracks, Some(99));
        assert_eq!(tracks.len(), 5);
    }

    #[test]
    fn test_empty_and_single() {
        let mut empty: Vec<Track> = Vec::new();
        shuffle_pinned(&mut empty, Some(0));
        assert!(empty.is_empty());

        let mut single = create_test_tracks(1);
        shuffle_pinned(&mut single, Some(0));
        assert_eq!(single[0].id, "0");
    }
}
