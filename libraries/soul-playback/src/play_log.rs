//! Listening-time tracking
//!
//! Positions come from the sink. A segment opens when playback starts and
//! closes on pause, stop, track change or end; only forward progress within a
//! segment counts, so seeking backwards never inflates the total.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Accumulated listening for one track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayLogEntry {
    pub track_id: String,

    /// Number of loads that reached playback
    pub plays: u32,

    /// Total time listened
    pub listened: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    /// Position (seconds) where the segment started
    start: f64,
    /// Last position seen inside the segment
    last: f64,
}

/// Per-track listening log
#[derive(Debug, Clone, Default)]
pub struct PlayLog {
    entries: HashMap<String, PlayLogEntry>,

    /// Track ids in first-played order
    order: Vec<String>,

    current: Option<String>,
    counted: bool,
    segment: Option<Segment>,
}

impl PlayLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new track was loaded; closes any open segment of the previous one
    pub fn track_loaded(&mut self, track_id: &str) {
        self.close_segment(None);
        self.current = Some(track_id.to_string());
        self.counted = false;
    }

    /// Playback started at `position` seconds
    pub fn playing(&mut self, position: f64) {
        let Some(id) = self.current.clone() else {
            return;
        };
        if !self.counted {
            self.entry(&id).plays += 1;
            self.counted = true;
        }
        if self.segment.is_none() {
            let position = position.max(0.0);
            self.segment = Some(Segment {
                start: position,
                last: position,
            });
        }
    }

    /// Position report while playing
    ///
    /// A jump backwards closes the segment at the last position and starts a
    /// new one from `position`.
    pub fn progress(&mut self, position: f64) {
        let Some(segment) = self.segment else {
            return;
        };

        if position >= segment.last {
            self.segment = Some(Segment {
                last: position,
                ..segment
            });
        } else {
            self.close_segment(None);
            let position = position.max(0.0);
            self.segment = Some(Segment {
                start: position,
                last: position,
            });
        }
    }

    /// Seek from `from` to `to`; the skipped span is not counted
    pub fn seeked(&mut self, from: f64, to: f64) {
        if self.segment.is_some() {
            self.close_segment(Some(from));
            let to = to.max(0.0);
            self.segment = Some(Segment { start: to, last: to });
        }
    }

    /// Playback paused, stopped or ended at `position` seconds
    pub fn stopped(&mut self, position: f64) {
        self.close_segment(Some(position));
    }

    fn close_segment(&mut self, position: Option<f64>) {
        let Some(segment) = self.segment.take() else {
            return;
        };
        let Some(id) = self.current.clone() else {
            return;
        };

        let end = position
            .filter(|p| *p >= segment.last)
            .unwrap_or(segment.last);
        let listened = (end - segment.start).max(0.0);
        if listened.is_finite() {
            self.entry(&id).listened += Duration::from_secs_f64(listened);
        }
    }

    fn entry(&mut self, id: &str) -> &mut PlayLogEntry {
        if !self.entries.contains_key(id) {
            self.order.push(id.to_string());
        }
        self.entries
            .entry(id.to_string())
            .or_insert_with(|| PlayLogEntry {
                track_id: id.to_string(),
                plays: 0,
                listened: Duration::ZERO,
            })
    }

    pub fn get(&self, track_id: &str) -> Option<&PlayLogEntry> {
        self.entries.get(track_id)
    }

    /// All entries in first-played order
    pub fn entries(&self) -> Vec<PlayLogEntry> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).cloned())
            .collect()
    }

    pub fn total_listened(&self) -> Duration {
        self.entries.values().map(|e| e.listened).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_listening_time() {
        let mut log = PlayLog::new();
        log.track_loaded("a");
        log.playing(0.0);
        log.progress(5.0);
        log.stopped(10.0);

        let entry = log.get("a").unwrap();
        assert_eq!(entry.plays, 1);
        assert_eq!(entry.listened, Duration::from_secs(10));

        // Resume after pause counts as the same play
        log.playing(10.0);
        log.stopped(12.5);
        let entry = log.get("a").unwrap();
        assert_eq!(entry.plays, 1);
        assert_eq!(entry.listened, Duration::from_millis(12500));
    }

    #[test]
    fn test_track_change_closes_segment() {
        let mut log = PlayLog::new();
        log.track_loaded("a");
        log.playing(0.0);
        log.progress(3.0);

        log.track_loaded("b");
        log.playing(0.0);
        log.stopped(2.0);

        assert_eq!(log.get("a").unwrap().listened, Duration::from_secs(3));
        assert_eq!(log.get("b").unwrap().listened, Duration::from_secs(2));
        assert_eq!(log.total_listened(), Duration::from_secs(5));

        let order: Vec<_> = log.entries().into_iter().map(|e| e.track_id).collect();
        assert_eq!(order, ["a", "b"]);
    }

    #[test]
    fn test_backwards_seek_does_not_inflate() {
        let mut log = PlayLog::new();
        log.track_loaded("a");
        log.playing(0.0);
        log.progress(20.0);
        log.progress(5.0);
        log.progress(8.0);
        log.stopped(8.0);

        assert_eq!(log.get("a").unwrap().listened, Duration::from_secs(23));
    }

    #[test]
    fn test_forward_seek_skips_span() {
        let mut log = PlayLog::new();
        log.track_loaded("a");
        log.playing(0.0);
        log.progress(4.0);
        log.seeked(4.0, 60.0);
        log.progress(61.0);
        log.stopped(62.0);

        assert_eq!(log.get("a").unwrap().listened, Duration::from_secs(6));

        // Not playing: nothing opens
        log.seeked(62.0, 10.0);
        log.progress(30.0);
        assert_eq!(log.get("a").unwrap().listened, Duration::from_secs(6));
    }

    #[test]
    fn test_reload_counts_new_play() {
        let mut log = PlayLog::new();
        log.track_loaded("a");
        log.playing(0.0);
        log.stopped(1.0);
        log.track_loaded("a");
        log.playing(0.0);

        assert_eq!(log.get("a").unwrap().plays, 2);
    }

    #[test]
    fn test_nothing_logged_without_track() {
        let mut log = PlayLog::new();
        log.playing(0.0);
        log.stopped(4.0);
        assert!(log.entries().is_empty());
    }
}
