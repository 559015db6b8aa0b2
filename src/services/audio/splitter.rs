//! Channel splitting and the end-to-end audio ingestion pipeline.
//!
//! Telephone recordings are stereo with the agent on the left channel and
//! the property owner on the right; mono recordings carry only the agent.

use crate::services::audio::{
    AudioClip, AudioDecoder, MAX_DURATION_MS, MIN_DURATION_MS, TARGET_SAMPLE_RATE,
    normalize::normalize_for_transcription, resample::resample_to_rate, validate_input_file,
};
use crate::{Result, error::AuditError};
use log::{debug, warn};
use std::path::Path;

/// Minimum peak amplitude for a clip to count as audible.
const MIN_PEAK_AMPLITUDE: i16 = 500;
/// Minimum sample standard deviation; anything lower is a stuck signal.
const MIN_SAMPLE_STDEV: f64 = 100.0;

/// A decoded, validated call ready for detection.
#[derive(Debug, Clone)]
pub struct CallAudio {
    /// Agent channel, 16 kHz mono, normalized for transcription.
    pub agent: AudioClip,
    /// Owner channel when the recording was stereo; 16 kHz mono, raw gain.
    pub owner: Option<AudioClip>,
    /// Duration of the original recording in milliseconds.
    pub duration_ms: u64,
}

/// End-to-end audio ingestion: decode, validate, resample, split, normalize.
pub struct AudioPipeline {
    decoder: AudioDecoder,
}

impl AudioPipeline {
    /// Create a new ingestion pipeline.
    pub fn new() -> Result<Self> {
        Ok(Self {
            decoder: AudioDecoder::new()?,
        })
    }

    /// Load a call recording into agent/owner channels.
    ///
    /// Steps: file validation, decode, duration gates, per-channel
    /// resampling to 16 kHz, stereo split (left = agent), quality gates on
    /// the agent channel, transcription normalization.
    ///
    /// # Errors
    ///
    /// - `InputValidation` / `UnsupportedFileType` before decode
    /// - `AudioLoad` when decoding fails
    /// - `AudioTooShort` below 3 s, `InputValidation` above 300 s
    /// - `AudioTooQuiet` / `AudioUniform` on the quality gates
    pub fn load_call(&self, path: &Path) -> Result<CallAudio> {
        validate_input_file(path)?;

        let decoded = self.decoder.decode(path)?;
        let duration_ms = decoded.duration_ms();
        if duration_ms < MIN_DURATION_MS {
            warn!(
                "[AudioPipeline] {:?} too short: {}ms",
                path, duration_ms
            );
            return Err(AuditError::AudioTooShort { duration_ms });
        }
        if duration_ms > MAX_DURATION_MS {
            return Err(AuditError::input_validation(format!(
                "Audio too long ({}ms, maximum {}ms): {}",
                duration_ms,
                MAX_DURATION_MS,
                path.display()
            )));
        }

        // Quality gates run on the decoded signal before any gain changes.
        let peak = decoded.peak();
        if peak < MIN_PEAK_AMPLITUDE {
            return Err(AuditError::AudioTooQuiet { peak });
        }
        let stdev = decoded.stdev();
        if stdev < MIN_SAMPLE_STDEV {
            return Err(AuditError::AudioUniform { stdev });
        }

        let (agent_raw, owner_raw) = split_channels(&decoded);

        let agent_resampled = AudioClip::new(
            resample_to_rate(&agent_raw.samples, agent_raw.sample_rate, TARGET_SAMPLE_RATE)?,
            TARGET_SAMPLE_RATE,
            1,
        );
        let owner = match owner_raw {
            Some(owner_clip) => Some(AudioClip::new(
                resample_to_rate(
                    &owner_clip.samples,
                    owner_clip.sample_rate,
                    TARGET_SAMPLE_RATE,
                )?,
                TARGET_SAMPLE_RATE,
                1,
            )),
            None => None,
        };

        let agent = normalize_for_transcription(&agent_resampled);
        debug!(
            "[AudioPipeline] loaded {:?}: {}ms, stereo={}, agent samples={}",
            path,
            duration_ms,
            owner.is_some(),
            agent.samples.len()
        );

        Ok(CallAudio {
            agent,
            owner,
            duration_ms,
        })
    }
}

/// Split a clip into (agent, owner) channels.
///
/// Stereo: channel 0 (left) is the agent, channel 1 the owner. Mono: the
/// whole clip is the agent and there is no owner channel.
pub fn split_channels(clip: &AudioClip) -> (AudioClip, Option<AudioClip>) {
    if clip.channel_count == 2 {
        (clip.extract_channel(0), Some(clip.extract_channel(1)))
    } else {
        (clip.clone(), None)
    }
}
