//! Rebuttal detection subsystem.
//!
//! Three tiers evaluated in order over the agent-only transcript:
//! exact substring matching against the phrase repository, semantic cosine
//! similarity against precomputed phrase embeddings, and an optional LLM
//! fallback for complex cases. All tiers contribute candidates; the
//! highest-confidence candidate decides the verdict.

pub mod chunker;
pub mod intro;
pub mod matcher;
pub mod repository;

pub use intro::IntroScorer;
pub use matcher::{MatchObserver, RebuttalMatcher, SemanticObservation};
pub use repository::{LearnedPhraseSource, PhraseIndex, PhraseRepository};

use serde::{Deserialize, Serialize};

/// Category assigned to candidates produced by the LLM fallback tier.
pub const LLM_CATEGORY: &str = "LLAMA_COMPLEX_CASE";

/// Which tier produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTier {
    /// Exact substring containment.
    Exact,
    /// Embedding cosine similarity.
    Semantic,
    /// LLM inference.
    LlmInference,
}

/// One rebuttal candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuttalCandidate {
    /// Matched repository phrase (or LLM reasoning for the fallback tier).
    pub phrase: String,
    /// Phrase category.
    pub category: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Producing tier.
    pub tier: MatchTier,
    /// The transcript chunk that matched, for semantic candidates.
    pub matched_sentence: Option<String>,
}
