//! Symphonia-based audio decoder: decodes call recordings in any supported
//! container to interleaved i16 samples.

use crate::services::audio::AudioClip;
use crate::{Result, error::AuditError};
use log::{debug, trace, warn};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::CodecRegistry;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::probe::Hint;
use symphonia::core::probe::Probe;
use symphonia::default::{get_codecs, get_probe};

/// Audio decoder wrapping the Symphonia probe and codec registries.
pub struct AudioDecoder {
    probe: &'static Probe,
    codecs: &'static CodecRegistry,
}

impl AudioDecoder {
    /// Create a new decoder instance.
    pub fn new() -> Result<Self> {
        Ok(Self {
            probe: get_probe(),
            codecs: get_codecs(),
        })
    }

    /// Decode a recording into an [`AudioClip`] at its native sample rate.
    ///
    /// Selects the first audio track, decodes every packet and collects
    /// interleaved i16 samples. Resampling and channel handling happen
    /// downstream.
    ///
    /// # Errors
    ///
    /// Returns `AudioLoad` when the container cannot be probed or decoded.
    pub fn decode<P: AsRef<Path>>(&self, path: P) -> Result<AudioClip> {
        let path_ref = path.as_ref();
        debug!("[AudioDecoder] decoding {:?}", path_ref);

        let file = File::open(path_ref).map_err(|e| {
            warn!("[AudioDecoder] failed to open {:?}: {}", path_ref, e);
            AuditError::audio_load(format!("Failed to open audio file: {}", e))
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path_ref.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = self
            .probe
            .format(&hint, mss, &FormatOptions::default(), &Default::default())
            .map_err(|e| {
                warn!("[AudioDecoder] format probing failed: {}", e);
                AuditError::audio_load(format!("Failed to probe format: {}", e))
            })?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.sample_rate.is_some())
            .ok_or_else(|| {
                warn!("[AudioDecoder] no audio track with sample_rate found");
                AuditError::audio_load("No audio track found".to_string())
            })?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| AuditError::audio_load("Sample rate unknown".to_string()))?;
        let channels = track.codec_params.channels.map(|c| c.count() as u16);
        debug!(
            "[AudioDecoder] selected track id={}, sample_rate={}, channels={:?}",
            track_id, sample_rate, channels
        );

        let dec_opts = DecoderOptions::default();
        let mut decoder = self
            .codecs
            .make(&track.codec_params, &dec_opts)
            .map_err(|e| {
                warn!("[AudioDecoder] failed to create decoder: {}", e);
                AuditError::audio_load(format!("Failed to create decoder: {}", e))
            })?;

        let mut samples: Vec<i16> = Vec::new();
        let mut packet_count = 0u64;
        while let Ok(packet) = format.next_packet() {
            if packet.track_id() != track_id {
                continue;
            }
            packet_count += 1;
            let decoded = decoder.decode(&packet).map_err(|e| {
                warn!("[AudioDecoder] failed to decode packet: {}", e);
                AuditError::audio_load(format!("Decode error: {}", e))
            })?;
            let spec = *decoded.spec();
            let mut sample_buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            trace!(
                "[AudioDecoder] packet {} yielded {} samples",
                packet_count,
                sample_buf.samples().len()
            );
            samples.extend_from_slice(sample_buf.samples());
        }

        if samples.is_empty() {
            return Err(AuditError::audio_load(format!(
                "No decodable audio in {}",
                path_ref.display()
            )));
        }

        // Infer channel count when the codec parameters omit it.
        let channel_count = channels.unwrap_or(1).max(1);
        let clip = AudioClip::new(samples, sample_rate, channel_count);
        debug!(
            "[AudioDecoder] decoded {} packets, {} samples, {}ms",
            packet_count,
            clip.samples.len(),
            clip.duration_ms()
        );
        Ok(clip)
    }
}
