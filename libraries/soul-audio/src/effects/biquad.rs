//! Stereo biquad filter (RBJ cookbook)
//!
//! Coefficients are recomputed from the current parameter values once per
//! processing block. Parameter smoothing happens upstream through the graph's
//! automation, so the filter itself switches coefficients directly.
use std::f32::consts::PI;

/// Shelf slope used for the low shelf (S = 1, steepest without overshoot)
const SHELF_SLOPE: f32 = 1.0;

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Response {
    Peaking { frequency: f32, q: f32, gain_db: f32 },
    LowShelf { frequency: f32, gain_db: f32 },
}

#[derive(Debug, Clone)]
pub(crate) struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    // State variables (per channel)
    x1_l: f32,
    x2_l: f32,
    y1_l: f32,
    y2_l: f32,

    x1_r: f32,
    x2_r: f32,
    y1_r: f32,
    y2_r: f32,

    configured: Option<(Response, u32)>,
}

impl Biquad {
    /// Create a new biquad filter with neutral coefficients
    pub(crate) fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1_l: 0.0,
            x2_l: 0.0,
            y1_l: 0.0,
            y2_l: 0.0,
            x1_r: 0.0,
            x2_r: 0.0,
            y1_r: 0.0,
            y2_r: 0.0,
            configured: None,
        }
    }

    /// Configure the filter; a no-op when nothing changed
    pub(crate) fn configure(&mut self, response: Response, sample_rate: u32) {
        if self.configured == Some((response, sample_rate)) {
            return;
        }
        self.configured = Some((response, sample_rate));

        let sr = sample_rate as f32;
        if sr < 1.0 {
            return;
        }

        match response {
            Response::Peaking {
                frequency,
                q,
                gain_db,
            } => self.set_peaking(sr, frequency, q, gain_db),
            Response::LowShelf { frequency, gain_db } => self.set_low_shelf(sr, frequency, gain_db),
        }
    }

    fn set_coefficients(&mut self, b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) {
        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    fn set_neutral(&mut self) {
        self.set_coefficients(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    }

    fn set_peaking(&mut self, sample_rate: f32, frequency: f32, q: f32, gain_db: f32) {
        if gain_db.abs() < 0.01 {
            self.set_neutral();
            return;
        }

        let a = 10.0_f32.powf(gain_db / 40.0);
        // Clamp to 45% of the sample rate to stay away from Nyquist instability
        let omega = 2.0 * PI * frequency.min(sample_rate * 0.45) / sample_rate;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * q.max(1e-4));

        self.set_coefficients(
            1.0 + alpha * a,
            -2.0 * cos_omega,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_omega,
            1.0 - alpha / a,
        );
    }

    fn set_low_shelf(&mut self, sample_rate: f32, frequency: f32, gain_db: f32) {
        if gain_db.abs() < 0.01 {
            self.set_neutral();
            return;
        }

        let a = 10.0_f32.powf(gain_db / 40.0);
        let omega = 2.0 * PI * frequency.min(sample_rate * 0.45) / sample_rate;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / 2.0 * ((a + 1.0 / a) * (1.0 / SHELF_SLOPE - 1.0) + 2.0).sqrt();
        let beta = 2.0 * a.sqrt() * alpha;

        self.set_coefficients(
            a * ((a + 1.0) - (a - 1.0) * cos_omega + beta),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
            a * ((a + 1.0) - (a - 1.0) * cos_omega - beta),
            (a + 1.0) + (a - 1.0) * cos_omega + beta,
            -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
            (a + 1.0) + (a - 1.0) * cos_omega - beta,
        );
    }

    /// Process interleaved stereo samples in place
    pub(crate) fn process(&mut self, buffer: &mut [f32]) {
        for frame in buffer.chunks_exact_mut(2) {
            let (l, r) = self.process_sample(frame[0], frame[1]);
            frame[0] = l;
            frame[1] = r;
        }
    }

    #[inline]
    fn process_sample(&mut self, left: f32, right: f32) -> (f32, f32) {
        let mut out_l = self.b0 * left + self.b1 * self.x1_l + self.b2 * self.x2_l
            - self.a1 * self.y1_l
            - self.a2 * self.y2_l;

        // Flush denormals
        if out_l.abs() < 1e-15 {
            out_l = 0.0;
        }

        self.x2_l = self.x1_l;
        self.x1_l = left;
        self.y2_l = self.y1_l;
        self.y1_l = out_l;

        let mut out_r = self.b0 * right + self.b1 * self.x1_r + self.b2 * self.x2_r
            - self.a1 * self.y1_r
            - self.a2 * self.y2_r;

        if out_r.abs() < 1e-15 {
            out_r = 0.0;
        }

        self.x2_r = self.x1_r;
        self.x1_r = right;
        self.y2_r = self.y1_r;
        self.y1_r = out_r;

        (out_l, out_r)
    }

    /// Clear filter state, keeping coefficients
    pub(crate) fn reset(&mut self) {
        self.x1_l = 0.0;
        self.x2_l = 0.0;
        self.y1_l = 0.0;
        self.y2_l = 0.0;
        self.x1_r = 0.0;
        self.x2_r = 0.0;
        self.y1_r = 0.0;
        self.y2_r = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::tests::{generate_sine, rms};

    #[test]
    fn flat_peaking_is_transparent() {
        let mut filter = Biquad::new();
        filter.configure(
            Response::Peaking {
                frequency: 1000.0,
                q: 1.0,
                gain_db: 0.0,
            },
            44100,
        );

        let input = generate_sine(1000.0, 44100, 0.1);
        let mut output = input.clone();
        filter.process(&mut output);

        assert_eq!(input, output);
    }

    #[test]
    fn peaking_boost_raises_center_frequency() {
        let mut filter = Biquad::new();
        filter.configure(
            Response::Peaking {
                frequency: 1000.0,
                q: 1.0,
                gain_db: 12.0,
            },
            44100,
        );

        let input = generate_sine(1000.0, 44100, 0.5);
        let mut output = input.clone();
        filter.process(&mut output);

        // Skip the transient, then expect roughly +12 dB (x3.98)
        let ratio = rms(&output[8820..]) / rms(&input[8820..]);
        assert!((ratio - 3.98).abs() < 0.3, "gain ratio was {}", ratio);
    }

    #[test]
    fn low_shelf_leaves_treble_alone() {
        let mut filter = Biquad::new();
        filter.configure(
            Response::LowShelf {
                frequency: 100.0,
                gain_db: 12.0,
            },
            44100,
        );

        let input = generate_sine(8000.0, 44100, 0.5);
        let mut output = input.clone();
        filter.process(&mut output);

        let ratio = rms(&output[8820..]) / rms(&input[8820..]);
        assert!((ratio - 1.0).abs() < 0.05, "treble ratio was {}", ratio);
    }

    #[test]
    fn low_shelf_boosts_bass() {
        let mut filter = Biquad::new();
        filter.configure(
            Response::LowShelf {
                frequency: 100.0,
                gain_db: 12.0,
            },
            44100,
        );

        let input = generate_sine(30.0, 44100, 1.0);
        let mut output = input.clone();
        filter.process(&mut output);

        let ratio = rms(&output[22050..]) / rms(&input[22050..]);
        assert!(ratio > 2.5, "bass ratio was {}", ratio);
    }
}
