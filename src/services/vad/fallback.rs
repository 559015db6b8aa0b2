//! Fallback VAD using simple dBFS thresholding.
//!
//! Runs when the spectral path fails. Marks 10 ms windows below −40 dBFS
//! as silent, treats silent runs of at least 200 ms as gaps, and keeps the
//! non-silent stretches between them when they last at least 100 ms.

use crate::services::audio::AudioClip;
use crate::services::vad::SpeechSegment;
use log::debug;

/// Silence threshold in dBFS.
const SILENCE_THRESHOLD_DBFS: f64 = -40.0;
/// Minimum silent run to split segments (milliseconds).
const MIN_SILENCE_MS: u64 = 200;
/// Minimum non-silent segment kept (milliseconds).
const MIN_SEGMENT_MS: u64 = 100;
/// Analysis window (milliseconds).
const WINDOW_MS: u64 = 10;

/// Detect non-silent segments by energy alone.
pub fn simple_energy_vad(clip: &AudioClip) -> Vec<SpeechSegment> {
    if clip.samples.is_empty() || clip.sample_rate == 0 {
        return Vec::new();
    }

    let window_len = (WINDOW_MS * clip.sample_rate as u64 / 1000) as usize;
    if window_len == 0 {
        return Vec::new();
    }

    // Per-window silence flags
    let mut silent_windows = Vec::new();
    for window in clip.samples.chunks(window_len) {
        silent_windows.push(window_dbfs(window) < SILENCE_THRESHOLD_DBFS);
    }

    let min_silence_windows = (MIN_SILENCE_MS / WINDOW_MS) as usize;
    let total_ms = clip.duration_ms();

    // Walk the flags, splitting on silent runs long enough to count as gaps
    let mut segments = Vec::new();
    let mut segment_start: Option<u64> = None;
    let mut silence_run = 0usize;

    for (i, &silent) in silent_windows.iter().enumerate() {
        let time_ms = i as u64 * WINDOW_MS;
        if silent {
            silence_run += 1;
            if silence_run == min_silence_windows {
                // Gap confirmed; close any open segment at the gap start
                if let Some(start) = segment_start.take() {
                    let end = time_ms + WINDOW_MS - MIN_SILENCE_MS;
                    if end > start && end - start >= MIN_SEGMENT_MS {
                        segments.push(SpeechSegment {
                            start_ms: start,
                            end_ms: end,
                        });
                    }
                }
            }
        } else {
            if segment_start.is_none() {
                segment_start = Some(time_ms);
            }
            silence_run = 0;
        }
    }

    if let Some(start) = segment_start {
        let end = total_ms;
        if end > start && end - start >= MIN_SEGMENT_MS {
            segments.push(SpeechSegment {
                start_ms: start,
                end_ms: end,
            });
        }
    }

    debug!("[fallback VAD] {} segments", segments.len());
    segments
}

fn window_dbfs(window: &[i16]) -> f64 {
    if window.is_empty() {
        return f64::NEG_INFINITY;
    }
    let rms = (window
        .iter()
        .map(|&s| {
            let v = s as f64;
            v * v
        })
        .sum::<f64>()
        / window.len() as f64)
        .sqrt();
    if rms <= 0.0 {
        return f64::NEG_INFINITY;
    }
    20.0 * (rms / i16::MAX as f64).log10()
}
