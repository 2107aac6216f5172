//! Sink events
//!
//! Translates media sink events into player state patches. Side effects
//! (readiness waiters, auto-advance, play log) live in the controller.

use soul_core::{PlaybackStatus, PlayerStatePatch, SinkEvent, SinkListener};
use std::sync::Arc;
use tracing::debug;

/// State patch published for a sink event, if any
pub fn patch_for(event: &SinkEvent) -> Option<PlayerStatePatch> {
    let patch = match event {
        SinkEvent::Waiting => PlayerStatePatch::status(PlaybackStatus::Buffering),
        SinkEvent::CanPlay | SinkEvent::CanPlayThrough => {
            PlayerStatePatch::status(PlaybackStatus::Ready)
        }
        SinkEvent::Playing => PlayerStatePatch::status(PlaybackStatus::Playing),
        SinkEvent::Pause => PlayerStatePatch::status(PlaybackStatus::Paused),
        SinkEvent::Stalled => PlayerStatePatch::status(PlaybackStatus::Stalled),
        SinkEvent::Ended => PlayerStatePatch::status(PlaybackStatus::Ended),
        SinkEvent::DurationChange(duration) => PlayerStatePatch {
            playback_state: Some(PlaybackStatus::DurationChanged),
            duration: Some(duration.is_finite().then_some(*duration)),
            ..PlayerStatePatch::default()
        },
        SinkEvent::TimeUpdate(position) => PlayerStatePatch::default().with_progress(*position),
        SinkEvent::Progress(buffered) => PlayerStatePatch {
            buffered_duration: Some(*buffered),
            ..PlayerStatePatch::default()
        },
        SinkEvent::Error(message) => {
            PlayerStatePatch::status(PlaybackStatus::Error).with_error(Some(message.clone()))
        }
        SinkEvent::LoadStart | SinkEvent::VolumeChange | SinkEvent::RateChange => return None,
    };
    Some(patch)
}

/// Baseline diagnostics: log every sink event
pub fn diagnostics_listener() -> SinkListener {
    Arc::new(|event: &SinkEvent| debug!(?event, "sink event"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (SinkEvent::Waiting, PlaybackStatus::Buffering),
            (SinkEvent::CanPlay, PlaybackStatus::Ready),
            (SinkEvent::CanPlayThrough, PlaybackStatus::Ready),
            (SinkEvent::Playing, PlaybackStatus::Playing),
            (SinkEvent::Pause, PlaybackStatus::Paused),
            (SinkEvent::Stalled, PlaybackStatus::Stalled),
            (SinkEvent::Ended, PlaybackStatus::Ended),
        ];

        for (event, status) in cases {
            let patch = patch_for(&event).unwrap();
            assert_eq!(patch.playback_state, Some(status), "{:?}", event);
        }
    }

    #[test]
    fn test_value_events() {
        let patch = patch_for(&SinkEvent::TimeUpdate(12.5)).unwrap();
        assert_eq!(patch.progress, Some(12.5));
        assert_eq!(patch.playback_state, None);

        let patch = patch_for(&SinkEvent::Progress(30.0)).unwrap();
        assert_eq!(patch.buffered_duration, Some(30.0));

        let patch = patch_for(&SinkEvent::DurationChange(215.0)).unwrap();
        assert_eq!(patch.playback_state, Some(PlaybackStatus::DurationChanged));
        assert_eq!(patch.duration, Some(Some(215.0)));

        // Live streams report an infinite duration
        let patch = patch_for(&SinkEvent::DurationChange(f64::INFINITY)).unwrap();
        assert_eq!(patch.duration, Some(None));
    }

    #[test]
    fn test_error_carries_message() {
        let patch = patch_for(&SinkEvent::Error("MEDIA_ERR_DECODE".into())).unwrap();
        assert_eq!(patch.playback_state, Some(PlaybackStatus::Error));
        assert_eq!(patch.error, Some(Some("MEDIA_ERR_DECODE".to_string())));
    }

    #[test]
    fn test_ignored_events() {
        assert!(patch_for(&SinkEvent::LoadStart).is_none());
        assert!(patch_for(&SinkEvent::VolumeChange).is_none());
        assert!(patch_for(&SinkEvent::RateChange).is_none());
    }
}
