//! Audio ingestion for call recordings.
//!
//! Decodes telephone recordings with Symphonia, resamples everything to the
//! 16 kHz mono working rate with rubato, splits stereo recordings into
//! agent/owner channels, and applies the transcription-oriented
//! normalization chain (peak normalize, dynamic-range compression, 80 Hz
//! high-pass).
//!
//! The entry point is [`AudioPipeline::load_call`], which turns a file path
//! into a validated [`CallAudio`] or one of the audio quality errors
//! (`AudioTooShort`, `AudioTooQuiet`, `AudioUniform`).

pub mod decoder;
pub mod normalize;
pub mod resample;
pub mod splitter;

pub use decoder::AudioDecoder;
pub use splitter::{AudioPipeline, CallAudio};

use crate::{Result, error::AuditError};
use std::path::Path;

/// Working sample rate for the whole pipeline (Hz).
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Minimum clip duration to attempt any detection (milliseconds).
pub const MIN_DURATION_MS: u64 = 3_000;

/// Maximum clip duration accepted (milliseconds).
pub const MAX_DURATION_MS: u64 = 300_000;

/// Minimum input file size in bytes; smaller files are almost always
/// truncated uploads.
pub const MIN_FILE_SIZE_BYTES: u64 = 1024;

/// Supported input container extensions (lowercase).
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["mp3", "wav", "m4a", "mp4", "flac"];

/// Immutable decoded audio, always 16-bit PCM.
///
/// Invariant: `samples.len() == duration_ms * sample_rate * channels / 1000`
/// (up to rounding of the final frame).
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Sample rate in Hz; 16000 after normalization.
    pub sample_rate: u32,
    /// Channel count (1 or 2); samples are interleaved when stereo.
    pub channel_count: u16,
    /// Signed 16-bit PCM samples.
    pub samples: Vec<i16>,
}

impl AudioClip {
    /// Build a clip from raw interleaved samples.
    pub fn new(samples: Vec<i16>, sample_rate: u32, channel_count: u16) -> Self {
        Self {
            sample_rate,
            channel_count,
            samples,
        }
    }

    /// Clip duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channel_count == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / (self.sample_rate as u64 * self.channel_count as u64)
    }

    /// Clip duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms() as f64 / 1000.0
    }

    /// Extract one channel from interleaved samples as a mono clip.
    pub fn extract_channel(&self, channel: usize) -> AudioClip {
        if self.channel_count <= 1 {
            return self.clone();
        }
        let step = self.channel_count as usize;
        let samples = self.samples[channel..].iter().step_by(step).copied().collect();
        AudioClip::new(samples, self.sample_rate, 1)
    }

    /// Maximum absolute sample value.
    pub fn peak(&self) -> i16 {
        self.samples
            .iter()
            .map(|s| (*s as i32).abs())
            .max()
            .unwrap_or(0)
            .min(i16::MAX as i32) as i16
    }

    /// Sample standard deviation.
    pub fn stdev(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mean =
            self.samples.iter().map(|&s| s as f64).sum::<f64>() / self.samples.len() as f64;
        let variance = self
            .samples
            .iter()
            .map(|&s| {
                let d = s as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / self.samples.len() as f64;
        variance.sqrt()
    }

    /// RMS level relative to full scale, in dBFS.
    pub fn dbfs(&self) -> f64 {
        if self.samples.is_empty() {
            return f64::NEG_INFINITY;
        }
        let rms = (self
            .samples
            .iter()
            .map(|&s| {
                let v = s as f64;
                v * v
            })
            .sum::<f64>()
            / self.samples.len() as f64)
            .sqrt();
        if rms <= 0.0 {
            return f64::NEG_INFINITY;
        }
        20.0 * (rms / i16::MAX as f64).log10()
    }
}

/// Validate that a path looks like a processable call recording.
///
/// Checks existence, minimum size and extension; content-level checks
/// happen after decode.
///
/// # Errors
///
/// Returns `InputValidation` or `UnsupportedFileType` on rejection.
pub fn validate_input_file(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|_| {
        AuditError::input_validation(format!("File not accessible: {}", path.display()))
    })?;
    if !metadata.is_file() {
        return Err(AuditError::input_validation(format!(
            "Not a regular file: {}",
            path.display()
        )));
    }
    if metadata.len() < MIN_FILE_SIZE_BYTES {
        return Err(AuditError::input_validation(format!(
            "File too small ({} bytes): {}",
            metadata.len(),
            path.display()
        )));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AuditError::UnsupportedFileType(ext));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_invariant_mono() {
        let clip = AudioClip::new(vec![0; 16_000], 16_000, 1);
        assert_eq!(clip.duration_ms(), 1000);
    }

    #[test]
    fn test_duration_invariant_stereo() {
        let clip = AudioClip::new(vec![0; 32_000], 16_000, 2);
        assert_eq!(clip.duration_ms(), 1000);
    }

    #[test]
    fn test_extract_channel_deinterleaves() {
        // L R L R pattern
        let clip = AudioClip::new(vec![1, -1, 2, -2, 3, -3], 16_000, 2);
        let left = clip.extract_channel(0);
        let right = clip.extract_channel(1);
        assert_eq!(left.samples, vec![1, 2, 3]);
        assert_eq!(right.samples, vec![-1, -2, -3]);
        assert_eq!(left.channel_count, 1);
    }

    #[test]
    fn test_extract_channel_mono_passthrough() {
        let clip = AudioClip::new(vec![5, 6, 7], 16_000, 1);
        let agent = clip.extract_channel(0);
        assert_eq!(agent.samples, clip.samples);
    }

    #[test]
    fn test_peak_and_stdev() {
        let clip = AudioClip::new(vec![100, -400, 250, 0], 16_000, 1);
        assert_eq!(clip.peak(), 400);
        assert!(clip.stdev() > 0.0);

        let silent = AudioClip::new(vec![0; 100], 16_000, 1);
        assert_eq!(silent.peak(), 0);
        assert_eq!(silent.stdev(), 0.0);
    }

    #[test]
    fn test_dbfs_silent_is_negative_infinity() {
        let silent = AudioClip::new(vec![0; 100], 16_000, 1);
        assert_eq!(silent.dbfs(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_validate_rejects_missing_file() {
        let result = validate_input_file(Path::new("/nonexistent/call.mp3"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_small_and_unsupported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let small = tmp.path().join("tiny.mp3");
        std::fs::write(&small, b"abc").unwrap();
        assert!(validate_input_file(&small).is_err());

        let wrong_ext = tmp.path().join("call.ogg");
        std::fs::write(&wrong_ext, vec![0u8; 2048]).unwrap();
        assert!(matches!(
            validate_input_file(&wrong_ext),
            Err(AuditError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_validate_accepts_supported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let ok = tmp.path().join("call.wav");
        std::fs::write(&ok, vec![0u8; 2048]).unwrap();
        assert!(validate_input_file(&ok).is_ok());
    }
}
