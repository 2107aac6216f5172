//! Dynamic Range Compressor
//!
//! Reduces the dynamic range of audio by attenuating signals above a threshold.
//! Parameters follow the host dynamics-compressor conventions: times in
//! seconds, knee and threshold in dB, no makeup gain.

/// Compressor settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    /// Threshold in dB (-100 to 0)
    pub threshold_db: f32,

    /// Knee width in dB (0 to 40, 0 = hard knee)
    pub knee_db: f32,

    /// Ratio (1.0 to 20.0)
    pub ratio: f32,

    /// Attack time in seconds (0 to 1)
    pub attack: f32,

    /// Release time in seconds (0 to 1)
    pub release: f32,
}

impl CompressorSettings {
    /// Create default compressor settings
    /// - Threshold: -24 dB
    /// - Knee: 30 dB
    /// - Ratio: 12:1
    /// - Attack: 3 ms
    /// - Release: 250 ms
    pub fn new() -> Self {
        Self {
            threshold_db: -24.0,
            knee_db: 30.0,
            ratio: 12.0,
            attack: 0.003,
            release: 0.25,
        }
    }

    /// Clamp settings to the ranges accepted by the host graph
    pub fn validate(&mut self) {
        self.threshold_db = self.threshold_db.clamp(-100.0, 0.0);
        self.knee_db = self.knee_db.clamp(0.0, 40.0);
        self.ratio = self.ratio.clamp(1.0, 20.0);
        self.attack = self.attack.clamp(0.0, 1.0);
        self.release = self.release.clamp(0.0, 1.0);
    }

    #[must_use]
    pub fn validated(mut self) -> Self {
        self.validate();
        self
    }
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Noise floor used by the peak detector
const NOISE_FLOOR_DB: f32 = -120.0;

/// Peak detector hold time in seconds
const PEAK_RELEASE_SECS: f32 = 0.05;

/// Two-stage compressor
///
/// 1. Peak level detection with instant attack and slow release (peak hold)
/// 2. Gain smoothing with the configured attack/release
pub(crate) struct Compressor {
    settings: CompressorSettings,

    // Peak level detector (in dB)
    peak_level_db: f32,

    // Smoothed gain reduction in dB
    gain_reduction_db: f32,

    peak_release_coeff: f32,
    gr_attack_coeff: f32,
    gr_release_coeff: f32,

    sample_rate: u32,
    needs_update: bool,
}

impl Compressor {
    pub(crate) fn new() -> Self {
        Self {
            settings: CompressorSettings::new(),
            peak_level_db: NOISE_FLOOR_DB,
            gain_reduction_db: 0.0,
            peak_release_coeff: 0.0,
            gr_attack_coeff: 0.0,
            gr_release_coeff: 0.0,
            sample_rate: 44100,
            needs_update: true,
        }
    }

    /// Apply settings; coefficients are refreshed lazily
    pub(crate) fn configure(&mut self, settings: CompressorSettings, sample_rate: u32) {
        let settings = settings.validated();
        if settings != self.settings || sample_rate != self.sample_rate {
            self.settings = settings;
            self.sample_rate = sample_rate;
            self.needs_update = true;
        }
    }

    /// Current gain reduction in dB (0 or negative)
    pub(crate) fn reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    fn update_coefficients(&mut self) {
        if !self.needs_update {
            return;
        }

        let sr = self.sample_rate as f32;

        self.peak_release_coeff = (-1.0 / (PEAK_RELEASE_SECS * sr)).exp();

        // coeff = exp(-1 / (time * sample_rate)); a zero time means instant
        let coeff = |seconds: f32| {
            let samples = seconds * sr;
            if samples < 1.0 {
                0.0
            } else {
                (-1.0 / samples).exp()
            }
        };
        self.gr_attack_coeff = coeff(self.settings.attack);
        self.gr_release_coeff = coeff(self.settings.release);

        self.needs_update = false;
    }

    /// Static curve: output level for an input level (dB)
    #[inline]
    fn compute_output_level(&self, input_db: f32) -> f32 {
        let threshold = self.settings.threshold_db;
        let ratio = self.settings.ratio;
        let knee = self.settings.knee_db;

        if knee <= 0.0 {
            if input_db <= threshold {
                input_db
            } else {
                threshold + (input_db - threshold) / ratio
            }
        } else {
            let half_knee = knee / 2.0;
            let knee_start = threshold - half_knee;
            let knee_end = threshold + half_knee;

            if input_db <= knee_start {
                input_db
            } else if input_db >= knee_end {
                threshold + (input_db - threshold) / ratio
            } else {
                // Quadratic transition through the knee
                let x = input_db - knee_start;
                let slope_change = (1.0 - 1.0 / ratio) / (2.0 * knee);
                input_db - slope_change * x * x
            }
        }
    }

    #[inline]
    fn update_peak_level(&mut self, input_db: f32) {
        if input_db > self.peak_level_db {
            self.peak_level_db = input_db;
        } else {
            self.peak_level_db =
                self.peak_release_coeff * (self.peak_level_db - NOISE_FLOOR_DB) + NOISE_FLOOR_DB;
        }
    }

    #[inline]
    fn smooth_gain_reduction(&mut self, target_gr_db: f32) {
        let coeff = if target_gr_db < self.gain_reduction_db {
            self.gr_attack_coeff
        } else {
            self.gr_release_coeff
        };

        self.gain_reduction_db = coeff * self.gain_reduction_db + (1.0 - coeff) * target_gr_db;
    }

    /// Process interleaved stereo samples in place (linked stereo detection)
    pub(crate) fn process(&mut self, buffer: &mut [f32]) {
        self.update_coefficients();

        for chunk in buffer.chunks_exact_mut(2) {
            let max_sample = chunk[0].abs().max(chunk[1].abs());
            let input_db = if max_sample > 1e-10 {
                20.0 * max_sample.log10()
            } else {
                -200.0
            };

            self.update_peak_level(input_db);
            let target_gr_db = self.compute_output_level(self.peak_level_db) - self.peak_level_db;
            self.smooth_gain_reduction(target_gr_db);

            let gain = 10.0_f32.powf(self.gain_reduction_db / 20.0);
            chunk[0] *= gain;
            chunk[1] *= gain;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.peak_level_db = NOISE_FLOOR_DB;
        self.gain_reduction_db = 0.0;
    }
}
