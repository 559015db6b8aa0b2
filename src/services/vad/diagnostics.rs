//! Per-file audio diagnostics for verbose audit output.

use crate::config::{LateHelloConfig, VadConfig};
use crate::core::report::Detection;
use crate::services::audio::AudioClip;
use crate::services::vad::detectors::{detect_late_hello, detect_releasing};
use crate::services::vad::engine::{VadEngine, VadOptions};
use crate::services::vad::SpeechSegment;

/// Diagnostic summary of one agent channel.
#[derive(Debug, Clone)]
pub struct AudioDiagnostics {
    /// File name the diagnostics were computed for.
    pub file_name: String,
    /// Clip duration in seconds.
    pub duration_seconds: f64,
    /// RMS level in dBFS, `None` when the channel is digital silence.
    pub dbfs: Option<f64>,
    /// Peak absolute sample value.
    pub peak: i16,
    /// Number of detected speech segments.
    pub segment_count: usize,
    /// Total speech duration in milliseconds.
    pub total_speech_ms: u64,
    /// Fraction of the clip classified as speech, in percent.
    pub speech_percentage: f64,
    /// First speech onset in milliseconds, when any speech exists.
    pub first_onset_ms: Option<u64>,
    /// Releasing verdict.
    pub releasing: Detection,
    /// Late-hello verdict.
    pub late_hello: Detection,
    /// Up to the first five segments for inspection.
    pub leading_segments: Vec<SpeechSegment>,
}

/// Analyze an agent channel and produce a diagnostic summary.
pub fn analyze_audio(
    agent: &AudioClip,
    file_name: &str,
    vad_config: &VadConfig,
    late_hello_config: &LateHelloConfig,
) -> AudioDiagnostics {
    let engine = VadEngine::new(vad_config.clone());
    let segments = engine.detect(agent, &VadOptions::from_config(vad_config));

    let duration_ms = agent.duration_ms();
    let total_speech_ms: u64 = segments.iter().map(|s| s.duration_ms()).sum();
    let speech_percentage = if duration_ms > 0 {
        total_speech_ms as f64 / duration_ms as f64 * 100.0
    } else {
        0.0
    };

    let dbfs_value = agent.dbfs();
    AudioDiagnostics {
        file_name: file_name.to_string(),
        duration_seconds: agent.duration_secs(),
        dbfs: if dbfs_value.is_finite() {
            Some(dbfs_value)
        } else {
            None
        },
        peak: agent.peak(),
        segment_count: segments.len(),
        total_speech_ms,
        speech_percentage,
        first_onset_ms: segments.first().map(|s| s.start_ms),
        releasing: detect_releasing(agent, &engine, vad_config, late_hello_config),
        late_hello: detect_late_hello(agent, &engine, late_hello_config),
        leading_segments: segments.into_iter().take(5).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_on_silent_clip() {
        let agent = AudioClip::new(vec![0i16; 16_000 * 8], 16_000, 1);
        let diag = analyze_audio(
            &agent,
            "silent.wav",
            &VadConfig::default(),
            &LateHelloConfig::default(),
        );
        assert_eq!(diag.segment_count, 0);
        assert_eq!(diag.dbfs, None);
        assert_eq!(diag.releasing, Detection::Yes);
        assert_eq!(diag.late_hello, Detection::No);
        assert_eq!(diag.first_onset_ms, None);
    }

    #[test]
    fn test_diagnostics_on_speech_clip() {
        let agent = crate::services::vad::engine::tests::clip_with_speech(
            10_000,
            &[(1_000, 4_000)],
        );
        let diag = analyze_audio(
            &agent,
            "call.wav",
            &VadConfig::default(),
            &LateHelloConfig::default(),
        );
        assert!(diag.segment_count >= 1);
        assert!(diag.speech_percentage > 10.0);
        assert!(diag.dbfs.is_some());
        assert_eq!(diag.releasing, Detection::No);
    }
}
