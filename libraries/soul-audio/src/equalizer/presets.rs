//! Named equalizer presets
//!
//! Each preset is a gain vector (dB) for the ten bands in
//! [`BAND_FREQUENCIES`](super::BAND_FREQUENCIES) order.

use super::BAND_COUNT;

pub const FLAT: &str = "FLAT";

static PRESETS: &[(&str, [f32; BAND_COUNT])] = &[
    (FLAT, [0.0; BAND_COUNT]),
    ("ROCK", [4.0, 3.0, 1.0, 0.0, -1.0, 0.0, 1.0, 3.0, 4.0, 4.0]),
    ("POP", [-1.0, 0.0, 2.0, 3.0, 4.0, 3.0, 2.0, 0.0, -1.0, -1.0]),
    ("JAZZ", [3.0, 2.0, 1.0, 2.0, -1.0, -1.0, 0.0, 1.0, 2.0, 3.0]),
    ("CLASSICAL", [4.0, 3.0, 2.0, 1.0, -1.0, -1.0, 0.0, 2.0, 3.0, 4.0]),
    ("ELECTRONIC", [5.0, 4.0, 2.0, 0.0, 1.0, 2.0, 1.0, 3.0, 4.0, 4.0]),
    ("HIPHOP", [6.0, 5.0, 3.0, 1.0, -1.0, -1.0, 1.0, 0.0, 2.0, 3.0]),
    ("VOCAL", [-2.0, -1.0, 0.0, 2.0, 4.0, 4.0, 2.0, 0.0, -1.0, -2.0]),
    ("BASS_BOOST", [6.0, 5.0, 4.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
    ("TREBLE_BOOST", [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 4.0, 5.0, 6.0]),
    ("ACOUSTIC", [2.0, 1.0, 0.0, 1.0, 2.0, 2.0, 1.0, 2.0, 2.0, 1.0]),
    ("V_SHAPE", [5.0, 4.0, 2.0, -1.0, -2.0, -2.0, -1.0, 2.0, 4.0, 5.0]),
];

/// Preset names in table order
pub fn names() -> Vec<&'static str> {
    PRESETS.iter().map(|(name, _)| *name).collect()
}

/// Look up a preset, ignoring case
///
/// Returns the canonical name with the gains.
pub fn lookup(name: &str) -> Option<(&'static str, [f32; BAND_COUNT])> {
    PRESETS
        .iter()
        .find(|(preset, _)| preset.eq_ignore_ascii_case(name.trim()))
        .map(|(preset, gains)| (*preset, *gains))
}
