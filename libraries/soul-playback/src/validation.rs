//! Precondition checks for the public control surface
//!
//! Each check returns the normalized value on success so callers never
//! re-derive it.

use soul_core::{Result, SoulError, Track};

/// Highest playback rate accepted
pub const MAX_PLAYBACK_RATE: f64 = 16.0;

/// Volume in [0, 100], rounded to the nearest step
pub fn volume(volume: f64) -> Result<u8> {
    if !volume.is_finite() || !(0.0..=100.0).contains(&volume) {
        return Err(SoulError::invalid_input(format!(
            "volume must be between 0 and 100, got {}",
            volume
        )));
    }
    Ok(volume.round() as u8)
}

/// Playback rate in (0, 16]
pub fn playback_rate(rate: f64) -> Result<f64> {
    if !rate.is_finite() || rate <= 0.0 || rate > MAX_PLAYBACK_RATE {
        return Err(SoulError::invalid_input(format!(
            "playback rate must be in (0, {}], got {}",
            MAX_PLAYBACK_RATE, rate
        )));
    }
    Ok(rate)
}

/// Absolute seek position, non-negative seconds
pub fn seek_time(seconds: f64) -> Result<f64> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(SoulError::invalid_input(format!(
            "seek time must be a non-negative number of seconds, got {}",
            seconds
        )));
    }
    Ok(seconds)
}

/// Relative seek offset
pub fn seek_offset(seconds: f64) -> Result<f64> {
    if !seconds.is_finite() {
        return Err(SoulError::invalid_input("seek offset must be finite"));
    }
    Ok(seconds)
}

pub fn track(track: &Track) -> Result<()> {
    if track.id.trim().is_empty() {
        return Err(SoulError::invalid_input("track id must not be empty"));
    }
    Ok(())
}

/// Non-empty list of valid tracks
pub fn tracks(tracks: &[Track]) -> Result<()> {
    if tracks.is_empty() {
        return Err(SoulError::invalid_input("track list must not be empty"));
    }
    tracks.iter().try_for_each(track)
}

pub fn queue_index(index: usize, len: usize) -> Result<usize> {
    if index >= len {
        return Err(SoulError::invalid_input(format!(
            "queue index {} out of range (queue has {} tracks)",
            index, len
        )));
    }
    Ok(index)
}

/// Resolved media locator
pub fn source(uri: &str) -> Result<&str> {
    if uri.trim().is_empty() {
        return Err(SoulError::invalid_input("media source must not be empty"));
    }
    Ok(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_rounds_and_rejects() {
        assert_eq!(volume(0.0).unwrap(), 0);
        assert_eq!(volume(42.5).unwrap(), 43);
        assert_eq!(volume(100.0).unwrap(), 100);

        assert!(volume(-0.1).is_err());
        assert!(volume(100.01).is_err());
        assert!(volume(f64::NAN).is_err());
    }

    #[test]
    fn test_playback_rate_bounds() {
        assert_eq!(playback_rate(1.5).unwrap(), 1.5);
        assert_eq!(playback_rate(16.0).unwrap(), 16.0);
        assert!(playback_rate(0.0).is_err());
        assert!(playback_rate(-1.0).is_err());
        assert!(playback_rate(16.5).is_err());
        assert!(playback_rate(f64::INFINITY).is_err());
    }

    #[test]
    fn test_seek_checks() {
        assert_eq!(seek_time(0.0).unwrap(), 0.0);
        assert!(seek_time(-3.0).is_err());
        assert!(seek_time(f64::NAN).is_err());
        assert_eq!(seek_offset(-10.0).unwrap(), -10.0);
        assert!(seek_offset(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_track_checks() {
        assert!(track(&Track::new("a", "A")).is_ok());
        assert!(track(&Track::new("  ", "Blank")).is_err());
        assert!(tracks(&[]).is_err());
        assert!(tracks(&[Track::new("a", "A"), Track::new("", "B")]).is_err());
    }

    #[test]
    fn test_queue_index() {
        assert_eq!(queue_index(2, 3).unwrap(), 2);
        assert!(queue_index(3, 3).is_err());
        assert!(queue_index(0, 0).is_err());
    }
}
