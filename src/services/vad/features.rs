//! Frame-level features for speech/noise discrimination.
//!
//! Each 50 ms frame yields RMS energy (scaled to the int16 range),
//! zero-crossing rate, and three spectral shape features computed from the
//! FFT magnitude spectrum: centroid, bandwidth, and the 85 %-energy
//! roll-off frequency.

use rustfft::{FftPlanner, num_complex::Complex};

/// Fraction of spectral energy below the roll-off frequency.
const ROLLOFF_ENERGY_FRACTION: f32 = 0.85;

/// Spectral shape of one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectralFeatures {
    /// Energy-weighted mean frequency in Hz.
    pub centroid: f32,
    /// Energy-weighted frequency spread around the centroid in Hz.
    pub bandwidth: f32,
    /// Frequency below which 85 % of spectral energy lies, in Hz.
    pub rolloff: f32,
}

/// RMS energy of a normalized frame, scaled back to the int16 range so
/// thresholds stay comparable with raw-sample configurations.
pub fn rms_energy(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let mean_sq = frame.iter().map(|&s| s * s).sum::<f32>() / frame.len() as f32;
    mean_sq.sqrt() * 32767.0
}

/// Zero-crossing rate: fraction of adjacent sample pairs with a sign change.
pub fn zero_crossing_rate(frame: &[f32]) -> f32 {
    if frame.len() < 2 {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / frame.len() as f32
}

/// Compute spectral centroid, bandwidth and roll-off for one frame.
///
/// A frame with no spectral energy yields all-zero features, which fails
/// every spectral check downstream.
pub fn spectral_features(frame: &[f32], sample_rate: u32) -> SpectralFeatures {
    if frame.is_empty() {
        return SpectralFeatures::default();
    }

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(frame.len());
    let mut buffer: Vec<Complex<f32>> =
        frame.iter().map(|&s| Complex::new(s, 0.0)).collect();
    fft.process(&mut buffer);

    // Real input: only the first half of the spectrum is informative
    let bins = frame.len() / 2 + 1;
    let magnitudes: Vec<f32> = buffer[..bins].iter().map(|c| c.norm()).collect();
    let freq_step = sample_rate as f32 / frame.len() as f32;

    let total: f32 = magnitudes.iter().sum();
    if total <= f32::EPSILON {
        return SpectralFeatures::default();
    }

    let centroid = magnitudes
        .iter()
        .enumerate()
        .map(|(k, &m)| k as f32 * freq_step * m)
        .sum::<f32>()
        / total;

    let bandwidth = (magnitudes
        .iter()
        .enumerate()
        .map(|(k, &m)| {
            let d = k as f32 * freq_step - centroid;
            d * d * m
        })
        .sum::<f32>()
        / total)
        .sqrt();

    let target = ROLLOFF_ENERGY_FRACTION * total;
    let mut cumulative = 0.0f32;
    let mut rolloff = 0.0f32;
    for (k, &m) in magnitudes.iter().enumerate() {
        cumulative += m;
        if cumulative >= target {
            rolloff = k as f32 * freq_step;
            break;
        }
    }

    SpectralFeatures {
        centroid,
        bandwidth,
        rolloff,
    }
}
