//! Releasing and late-hello detectors over VAD segments.

use crate::config::{LateHelloConfig, VadConfig};
use crate::core::report::Detection;
use crate::services::audio::AudioClip;
use crate::services::vad::engine::{VadEngine, VadOptions};
use log::debug;

/// Releasing: the agent channel contains no speech for the whole call.
///
/// Calls shorter than the late-hello threshold return `No`; there is not
/// enough runway to claim the agent released the call.
pub fn detect_releasing(
    agent: &AudioClip,
    engine: &VadEngine,
    vad_config: &VadConfig,
    late_hello_config: &LateHelloConfig,
) -> Detection {
    let call_duration_s = agent.duration_secs();
    if call_duration_s < late_hello_config.threshold_sec as f64 {
        debug!(
            "[releasing] call too short to judge ({:.1}s < {:.1}s)",
            call_duration_s, late_hello_config.threshold_sec
        );
        return Detection::No;
    }

    let segments = engine.detect(agent, &VadOptions::from_config(vad_config));
    if segments.is_empty() {
        Detection::Yes
    } else {
        Detection::No
    }
}

/// Late hello: the first agent speech begins strictly after the threshold.
///
/// Uses the non-adaptive onset-timing VAD profile (fixed threshold, 50 ms
/// minimum duration) so a clipped greeting still counts as an onset. A
/// fully silent channel returns `No`; that case belongs to Releasing.
pub fn detect_late_hello(
    agent: &AudioClip,
    engine: &VadEngine,
    late_hello_config: &LateHelloConfig,
) -> Detection {
    let segments = engine.detect(agent, &VadOptions::for_onset_timing());
    if segments.is_empty() {
        debug!("[late hello] no speech at all, owned by releasing");
        return Detection::No;
    }

    let first_speech_start_ms = segments[0].start_ms;
    let threshold_ms = (late_hello_config.threshold_sec as f64 * 1000.0) as u64;
    debug!(
        "[late hello] first onset {}ms, threshold {}ms",
        first_speech_start_ms, threshold_ms
    );
    if first_speech_start_ms > threshold_ms {
        Detection::Yes
    } else {
        Detection::No
    }
}
