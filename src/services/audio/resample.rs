//! Audio resampling utilities using the rubato crate.
//!
//! Converts i16 mono channels to the 16 kHz working rate through an FFT
//! resampler; i16 <-> f32 conversion happens at the boundary.

use crate::{Result, error::AuditError};
use log::{debug, trace};
use rubato::{FftFixedIn, Resampler};

const CHUNK_SIZE: usize = 8192;

/// Resample i16 mono audio to the target sample rate.
///
/// Returns the input untouched when the rates already match. Output length
/// is trimmed to `input_len * ratio` so a padded final chunk does not leak
/// trailing silence into duration math.
///
/// # Errors
///
/// Returns `AudioProcessing` when the resampler cannot be constructed or a
/// chunk fails to process.
pub fn resample_to_rate(
    input_samples: &[i16],
    input_sample_rate: u32,
    output_sample_rate: u32,
) -> Result<Vec<i16>> {
    if input_sample_rate == output_sample_rate {
        trace!("[resample] sample rate unchanged, fast path");
        return Ok(input_samples.to_vec());
    }
    debug!(
        "[resample] {} samples, {}Hz -> {}Hz",
        input_samples.len(),
        input_sample_rate,
        output_sample_rate
    );

    let input: Vec<f32> = input_samples.iter().map(|&s| s as f32 / 32768.0).collect();
    let resample_ratio = output_sample_rate as f64 / input_sample_rate as f64;

    let mut resampler = FftFixedIn::<f32>::new(
        input_sample_rate as usize,
        output_sample_rate as usize,
        CHUNK_SIZE,
        1, // sub_chunks
        1, // channels
    )
    .map_err(|e| AuditError::audio_processing(format!("Failed to create resampler: {}", e)))?;

    let mut output: Vec<f32> =
        Vec::with_capacity((input.len() as f64 * resample_ratio) as usize + 128);
    let mut pos = 0;
    while pos < input.len() {
        let frames_needed = resampler.input_frames_next();
        let end = (pos + frames_needed).min(input.len());
        let mut chunk: Vec<f32> = Vec::with_capacity(frames_needed);
        chunk.extend_from_slice(&input[pos..end]);
        if end - pos < frames_needed {
            chunk.resize(frames_needed, 0.0);
        }
        let chunk_ref = [&chunk[..]];
        let out_chunk = resampler
            .process(&chunk_ref, None)
            .map_err(|e| AuditError::audio_processing(format!("Resample failed: {}", e)))?;
        output.extend_from_slice(&out_chunk[0]);
        pos += frames_needed;
    }

    let expected_len = ((input_samples.len() as f64) * resample_ratio).round() as usize;
    let mut output_i16: Vec<i16> = output
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect();
    if output_i16.len() > expected_len {
        output_i16.truncate(expected_len);
    }
    debug!(
        "[resample] done: {} -> {} samples",
        input_samples.len(),
        output_i16.len()
    );
    Ok(output_i16)
}
