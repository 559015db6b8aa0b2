//! Transcription-oriented normalization chain for the agent channel.
//!
//! Telephone recordings arrive with wildly different gain staging; the
//! chain applied here brings them to a level profile the transcriber and
//! the VAD engine both behave well on:
//!
//! 1. peak normalization to full scale
//! 2. dynamic-range compression (threshold −25 dB, ratio 3:1, attack 5 ms,
//!    release 50 ms)
//! 3. one-pole high-pass at 80 Hz for phone-line hiss

use crate::services::audio::AudioClip;

/// Compressor threshold relative to full scale, in dB.
const COMPRESSOR_THRESHOLD_DB: f32 = -25.0;
/// Compression ratio above the threshold.
const COMPRESSOR_RATIO: f32 = 3.0;
/// Envelope attack time in milliseconds.
const COMPRESSOR_ATTACK_MS: f32 = 5.0;
/// Envelope release time in milliseconds.
const COMPRESSOR_RELEASE_MS: f32 = 50.0;
/// High-pass cutoff frequency in Hz.
const HIGH_PASS_CUTOFF_HZ: f32 = 80.0;

/// Apply the full normalization chain to a mono clip.
pub fn normalize_for_transcription(clip: &AudioClip) -> AudioClip {
    let mut samples: Vec<f32> = clip.samples.iter().map(|&s| s as f32 / 32768.0).collect();
    peak_normalize(&mut samples);
    compress_dynamic_range(&mut samples, clip.sample_rate);
    high_pass(&mut samples, clip.sample_rate);
    let samples_i16 = samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect();
    AudioClip::new(samples_i16, clip.sample_rate, clip.channel_count)
}

/// Scale the signal so the peak reaches full scale.
///
/// Silent input is returned untouched; there is nothing to normalize and
/// amplifying the noise floor would only confuse the VAD.
pub fn peak_normalize(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    if peak <= f32::EPSILON {
        return;
    }
    let gain = 1.0 / peak;
    for s in samples.iter_mut() {
        *s *= gain;
    }
}

/// Feed-forward compressor with an attack/release envelope follower.
pub fn compress_dynamic_range(samples: &mut [f32], sample_rate: u32) {
    let threshold = 10f32.powf(COMPRESSOR_THRESHOLD_DB / 20.0);
    let attack_coeff =
        (-1.0 / (COMPRESSOR_ATTACK_MS / 1000.0 * sample_rate as f32)).exp();
    let release_coeff =
        (-1.0 / (COMPRESSOR_RELEASE_MS / 1000.0 * sample_rate as f32)).exp();

    let mut envelope = 0.0f32;
    for s in samples.iter_mut() {
        let level = s.abs();
        // Envelope follows the rectified signal with asymmetric smoothing
        let coeff = if level > envelope {
            attack_coeff
        } else {
            release_coeff
        };
        envelope = coeff * envelope + (1.0 - coeff) * level;

        if envelope > threshold {
            let over_db = 20.0 * (envelope / threshold).log10();
            let reduced_db = over_db / COMPRESSOR_RATIO;
            let gain_db = reduced_db - over_db;
            let gain = 10f32.powf(gain_db / 20.0);
            *s *= gain;
        }
    }
}

/// One-pole high-pass filter.
pub fn high_pass(samples: &mut [f32], sample_rate: u32) {
    let rc = 1.0 / (2.0 * std::f32::consts::PI * HIGH_PASS_CUTOFF_HZ);
    let dt = 1.0 / sample_rate as f32;
    let alpha = rc / (rc + dt);

    let mut prev_input = 0.0f32;
    let mut prev_output = 0.0f32;
    for s in samples.iter_mut() {
        let input = *s;
        let output = alpha * (prev_output + input - prev_input);
        prev_input = input;
        prev_output = output;
        *s = output;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_normalize_reaches_full_scale() {
        let mut samples = vec![0.0, 0.25, -0.5, 0.1];
        peak_normalize(&mut samples);
        let peak = samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
        assert!((peak - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_peak_normalize_silent_unchanged() {
        let mut samples = vec![0.0; 64];
        peak_normalize(&mut samples);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_compressor_reduces_loud_sustained_signal() {
        let sample_rate = 16_000;
        // 0.9 amplitude square-ish signal, well above the -25 dB threshold
        let mut samples = vec![0.9f32; sample_rate as usize];
        compress_dynamic_range(&mut samples, sample_rate);
        // After the attack settles the tail must be attenuated
        let tail = samples[samples.len() - 100..].iter().sum::<f32>() / 100.0;
        assert!(tail < 0.9, "expected compression, tail avg {}", tail);
    }

    #[test]
    fn test_compressor_leaves_quiet_signal_alone() {
        let sample_rate = 16_000;
        let mut samples = vec![0.01f32; 1000];
        let original = samples.clone();
        compress_dynamic_range(&mut samples, sample_rate);
        assert_eq!(samples, original);
    }

    #[test]
    fn test_high_pass_removes_dc() {
        let sample_rate = 16_000;
        let mut samples = vec![0.5f32; sample_rate as usize];
        high_pass(&mut samples, sample_rate);
        // DC settles toward zero after the filter's time constant
        let tail = samples[samples.len() - 100..]
            .iter()
            .map(|s| s.abs())
            .sum::<f32>()
            / 100.0;
        assert!(tail < 0.01, "DC should decay, tail avg {}", tail);
    }

    #[test]
    fn test_full_chain_preserves_shape() {
        let samples: Vec<i16> = (0..16_000)
            .map(|i| ((i as f32 * 0.2).sin() * 8000.0) as i16)
            .collect();
        let clip = AudioClip::new(samples, 16_000, 1);
        let normalized = normalize_for_transcription(&clip);
        assert_eq!(normalized.samples.len(), clip.samples.len());
        assert_eq!(normalized.sample_rate, 16_000);
        assert!(normalized.peak() > 0);
    }
}
