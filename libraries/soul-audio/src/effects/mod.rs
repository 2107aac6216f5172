//! DSP building blocks used by the software graph
//!
//! All processors operate on interleaved stereo f32 samples in place.

mod biquad;
mod compressor;

pub(crate) use biquad::{Biquad, Response};
pub(crate) use compressor::Compressor;
pub use compressor::CompressorSettings;

#[cfg(test)]
pub(crate) mod tests {
    /// Generate a stereo sine wave for testing
    pub(crate) fn generate_sine(freq: f32, sample_rate: u32, duration_secs: f32) -> Vec<f32> {
        let num_samples = (sample_rate as f32 * duration_secs) as usize;
        let mut samples = Vec::with_capacity(num_samples * 2);

        for i in 0..num_samples {
            let t = i as f32 / sample_rate as f32;
            let sample = (2.0 * std::f32::consts::PI * freq * t).sin();
            samples.push(sample); // Left
            samples.push(sample); // Right
        }

        samples
    }

    pub(crate) fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum: f32 = samples.iter().map(|s| s * s).sum();
        (sum / samples.len() as f32).sqrt()
    }
}
