//! Service integrations for the CallAudit pipeline.
//!
//! Local services (audio decoding, voice-activity detection) run in-process;
//! remote services (transcription, sentence embedding, the optional LLM
//! classifier) are HTTP adapters behind async traits so that the detection
//! core never depends on a concrete vendor.

pub mod audio;
pub mod classifier;
pub mod embedding;
pub mod learning;
pub mod rebuttal;
pub mod retry;
pub mod transcriber;
pub mod vad;
