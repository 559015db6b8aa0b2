//! Self-learning phrase pipeline.
//!
//! Semantic matches observed in production flow into a pending queue,
//! get deduplicated and quality-scored, and graduate to the approved
//! repository either automatically (high confidence or high quality) or
//! through manual review. Rejections land on a blacklist that
//! short-circuits future observations.
//!
//! All writes are best-effort from the detection path's point of view: a
//! store failure is logged and never fails a file.

pub mod store;

pub use store::PhraseLearningStore;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::BTreeSet;

/// Maximum words kept for a pending phrase.
pub const MAX_PHRASE_WORDS: usize = 20;
/// Maximum characters kept for a pending phrase.
pub const MAX_PHRASE_CHARS: usize = 200;
/// Maximum characters of merged sample context.
pub const MAX_CONTEXT_CHARS: usize = 500;
/// Confidence that auto-approves immediately, no frequency requirement.
pub const HIGH_PRIORITY_CONFIDENCE: f32 = 0.90;
/// Quality score that auto-approves immediately.
pub const HIGH_PRIORITY_QUALITY: f64 = 0.90;

/// Standalone filler words removed for the canonical form.
static FILLER_WORDS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    BTreeSet::from([
        "okay", "ok", "well", "so", "um", "uh", "like", "actually", "basically", "literally",
        "really", "very", "just",
    ])
});

/// Multi-word filler phrases removed before single-word fillers.
const FILLER_PHRASES: [&str; 2] = ["you know", "i mean"];

/// Lifecycle state of a pending phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStatus {
    /// Awaiting review.
    Pending,
    /// Manually approved.
    Approved,
    /// Rejected and blacklisted.
    Rejected,
    /// Approved by the automatic triggers.
    AutoApproved,
}

impl PendingStatus {
    /// Database string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingStatus::Pending => "pending",
            PendingStatus::Approved => "approved",
            PendingStatus::Rejected => "rejected",
            PendingStatus::AutoApproved => "auto_approved",
        }
    }

    /// Parse the database string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PendingStatus::Pending),
            "approved" => Some(PendingStatus::Approved),
            "rejected" => Some(PendingStatus::Rejected),
            "auto_approved" => Some(PendingStatus::AutoApproved),
            _ => None,
        }
    }
}

/// A row of the pending queue.
#[derive(Debug, Clone)]
pub struct PendingPhrase {
    /// Row id.
    pub id: i64,
    /// The candidate phrase, lowercased.
    pub phrase: String,
    /// Category of the repository phrase it matched.
    pub category: String,
    /// Best confidence observed so far.
    pub confidence: f32,
    /// Number of observations merged into this row.
    pub detection_count: u32,
    /// First observation time.
    pub first_detected: DateTime<Utc>,
    /// Most recent observation time.
    pub last_detected: DateTime<Utc>,
    /// Merged sample contexts, `" | "` joined, capped at 500 chars.
    pub sample_contexts: String,
    /// The repository phrase the candidate matched against.
    pub similar_to: String,
    /// Cached quality score.
    pub quality_score: f64,
    /// Canonical (filler-stripped) form.
    pub canonical_form: String,
    /// Lifecycle state.
    pub status: PendingStatus,
}

/// Quality tier labels for the review UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    /// Score at least 0.90.
    AutoApprove,
    /// Score at least 0.80.
    HighValue,
    /// Score at least 0.65.
    MediumValue,
    /// Everything below.
    LowValue,
}

impl QualityTier {
    /// Tier for a quality score.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.90 {
            QualityTier::AutoApprove
        } else if score >= 0.80 {
            QualityTier::HighValue
        } else if score >= 0.65 {
            QualityTier::MediumValue
        } else {
            QualityTier::LowValue
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::AutoApprove => "auto_approve",
            QualityTier::HighValue => "high_value",
            QualityTier::MediumValue => "medium_value",
            QualityTier::LowValue => "low_value",
        }
    }
}

/// Aggregate repository statistics for the phrases CLI.
#[derive(Debug, Clone, Default)]
pub struct RepositoryStats {
    /// Approved learned phrases per category.
    pub approved_by_category: Vec<(String, u32)>,
    /// Pending rows by status string.
    pub pending_by_status: Vec<(String, u32)>,
    /// Blacklisted phrase count.
    pub blacklisted: u32,
    /// Overall approval rate over settled rows, when any exist.
    pub approval_rate: Option<f64>,
}

/// Inputs to the quality score formula.
#[derive(Debug, Clone)]
pub struct QualityInputs {
    /// Best observed confidence.
    pub confidence: f32,
    /// Merged detection count.
    pub detection_count: u32,
    /// Most recent observation time.
    pub last_detected: DateTime<Utc>,
    /// Length of the merged sample contexts.
    pub context_chars: usize,
}

/// Weighted quality score in `[0, 1]`.
///
/// 50 % confidence, 25 % frequency (saturating at 10 detections), 15 %
/// recency (linear decay over 30 days), 10 % context richness (saturating
/// at 500 chars).
pub fn quality_score(inputs: &QualityInputs, now: DateTime<Utc>) -> f64 {
    let confidence = inputs.confidence.clamp(0.0, 1.0) as f64;
    let frequency = (inputs.detection_count as f64 / 10.0).min(1.0);
    let days_since = (now - inputs.last_detected).num_seconds() as f64 / 86_400.0;
    let recency = (1.0 - days_since / 30.0).clamp(0.0, 1.0);
    let context = (inputs.context_chars as f64 / MAX_CONTEXT_CHARS as f64).min(1.0);

    (confidence * 0.50 + frequency * 0.25 + recency * 0.15 + context * 0.10).min(1.0)
}

/// Canonical form: lowercase, filler phrases and standalone filler words
/// removed, whitespace collapsed.
pub fn canonical_form(phrase: &str) -> String {
    let mut text = phrase.to_lowercase().trim().to_string();
    for filler in FILLER_PHRASES {
        text = text.replace(filler, " ");
    }

    text.split_whitespace()
        .filter(|word| {
            let clean = word.trim_matches(|c: char| ".,!?;:".contains(c));
            !FILLER_WORDS.contains(clean)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate a phrase to the pending-queue limits (20 words, 200 chars).
pub fn truncate_phrase(phrase: &str) -> String {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let mut result = if words.len() > MAX_PHRASE_WORDS {
        words[..MAX_PHRASE_WORDS].join(" ")
    } else {
        phrase.trim().to_string()
    };
    if result.len() > MAX_PHRASE_CHARS {
        result.truncate(MAX_PHRASE_CHARS);
        result = result.trim_end().to_string();
    }
    result
}
