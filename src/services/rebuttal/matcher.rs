//! Three-tier rebuttal matcher: exact, semantic, LLM fallback.

use crate::services::classifier::Classifier;
use crate::services::embedding::{Embedder, cosine_similarity};
use crate::services::rebuttal::chunker::{
    MAX_CANDIDATE_CHARS, MAX_CANDIDATE_WORDS, extract_candidate_phrase, matchable_chunks,
};
use crate::services::rebuttal::repository::PhraseRepository;
use crate::services::rebuttal::{LLM_CATEGORY, MatchTier, RebuttalCandidate};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Best-confidence floor below which the LLM tier is consulted.
const LLM_CONFIDENCE_FLOOR: f32 = 0.70;
/// Minimum words for a transcript to be worth an LLM call.
const MIN_QUALITY_WORDS: usize = 5;

/// Observation handed to the learning store for every semantic match.
#[derive(Debug, Clone)]
pub struct SemanticObservation {
    /// Candidate phrase extracted from the matched chunk.
    pub phrase: String,
    /// Category of the repository phrase that matched.
    pub category: String,
    /// Cosine similarity of the match.
    pub confidence: f32,
    /// Matched chunk, truncated to 500 chars by the store.
    pub context: String,
    /// The repository phrase the chunk matched against.
    pub similar_to: String,
}

/// Result of recording an observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObserveOutcome {
    /// Whether the observation survived the store's pre-filters.
    pub recorded: bool,
    /// Whether the phrase was auto-approved into the repository.
    pub auto_approved: bool,
}

/// Learning write-path invoked by the semantic tier.
///
/// Implementations must be best-effort: failures are swallowed internally
/// and never surface into detection.
pub trait MatchObserver: Send + Sync {
    /// Record one semantic match.
    fn observe(&self, observation: SemanticObservation) -> ObserveOutcome;
}

/// Three-tier rebuttal matcher.
pub struct RebuttalMatcher {
    repository: Arc<PhraseRepository>,
    embedder: Arc<dyn Embedder>,
    classifier: Option<Arc<dyn Classifier>>,
    observer: Option<Arc<dyn MatchObserver>>,
    semantic_threshold: f32,
}

impl RebuttalMatcher {
    /// Build a matcher. The semantic threshold is clamped to `[0.5, 0.9]`.
    pub fn new(
        repository: Arc<PhraseRepository>,
        embedder: Arc<dyn Embedder>,
        classifier: Option<Arc<dyn Classifier>>,
        observer: Option<Arc<dyn MatchObserver>>,
        semantic_threshold: f32,
    ) -> Self {
        Self {
            repository,
            embedder,
            classifier,
            observer,
            semantic_threshold: semantic_threshold.clamp(0.5, 0.9),
        }
    }

    /// The clamped semantic threshold in effect.
    pub fn semantic_threshold(&self) -> f32 {
        self.semantic_threshold
    }

    /// Detect rebuttal candidates in an agent transcript.
    ///
    /// Returns candidates sorted by confidence descending; the top one
    /// determines the verdict. Tier failures degrade rather than error:
    /// a dead embedder leaves exact matches, a dead classifier skips the
    /// fallback.
    pub async fn detect(&self, transcript: &str) -> Vec<RebuttalCandidate> {
        let transcript_lower = transcript.to_lowercase();
        let mut candidates = self.detect_exact(&transcript_lower);
        debug!("[RebuttalMatcher] exact tier: {} candidates", candidates.len());

        let semantic = self.detect_semantic(&transcript_lower).await;
        let filtered = filter_duplicate_matches(&candidates, semantic);
        debug!(
            "[RebuttalMatcher] semantic tier: {} candidates after dedup",
            filtered.len()
        );
        self.track_for_learning(&filtered);
        candidates.extend(filtered);

        let best_confidence = candidates
            .iter()
            .map(|c| c.confidence)
            .fold(0.0f32, f32::max);
        let should_use_llm = self.classifier.is_some()
            && (candidates.is_empty() || best_confidence < LLM_CONFIDENCE_FLOOR)
            && transcript_quality_ok(&transcript_lower);

        if should_use_llm {
            if let Some(classifier) = &self.classifier {
                match classifier.classify_rebuttal(&transcript_lower).await {
                    Ok(verdict) if verdict.is_positive() => {
                        info!(
                            "[RebuttalMatcher] LLM tier positive (confidence {:.2})",
                            verdict.confidence
                        );
                        candidates.push(RebuttalCandidate {
                            phrase: verdict.reasoning,
                            category: LLM_CATEGORY.to_string(),
                            confidence: verdict.confidence,
                            tier: MatchTier::LlmInference,
                            matched_sentence: None,
                        });
                    }
                    Ok(verdict) => {
                        debug!(
                            "[RebuttalMatcher] LLM tier negative (confidence {:.2})",
                            verdict.confidence
                        );
                    }
                    Err(e) => {
                        debug!("[RebuttalMatcher] LLM tier skipped: {}", e);
                    }
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        if let Some(best) = candidates.first() {
            info!(
                "[RebuttalMatcher] best: '{}' ({:?}, confidence {:.3})",
                best.phrase, best.tier, best.confidence
            );
        }
        candidates
    }

    /// Tier 1: punctuation-insensitive substring matching.
    fn detect_exact(&self, transcript_lower: &str) -> Vec<RebuttalCandidate> {
        let normalized_transcript = normalize_for_matching(transcript_lower);
        let mut matches = Vec::new();

        for (category, phrases) in self.repository.all() {
            for phrase in phrases {
                let normalized_phrase = normalize_for_matching(&phrase);
                if !normalized_phrase.is_empty()
                    && normalized_transcript.contains(&normalized_phrase)
                {
                    let confidence = exact_confidence(&phrase, transcript_lower);
                    matches.push(RebuttalCandidate {
                        phrase,
                        category: category.clone(),
                        confidence,
                        tier: MatchTier::Exact,
                        matched_sentence: None,
                    });
                }
            }
        }
        matches
    }

    /// Tier 2: cosine similarity of transcript chunks against the phrase
    /// embedding index.
    async fn detect_semantic(&self, transcript: &str) -> Vec<RebuttalCandidate> {
        let snapshot = self.repository.snapshot();
        if !snapshot.has_embeddings() {
            warn!("[RebuttalMatcher] no phrase embeddings, exact matching only");
            return Vec::new();
        }

        let chunks = matchable_chunks(transcript);
        if chunks.is_empty() {
            return Vec::new();
        }

        let chunk_embeddings = match self.embedder.encode(&chunks).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                warn!("[RebuttalMatcher] chunk encoding failed: {}", e);
                return Vec::new();
            }
        };

        let mut matches = Vec::new();
        for (chunk, chunk_embedding) in chunks.iter().zip(chunk_embeddings.iter()) {
            for (row, phrase_embedding) in
                snapshot.metadata.iter().zip(snapshot.embeddings.iter())
            {
                let similarity = cosine_similarity(chunk_embedding, phrase_embedding);
                if similarity >= self.semantic_threshold {
                    matches.push(RebuttalCandidate {
                        phrase: row.phrase.clone(),
                        category: row.category.clone(),
                        confidence: similarity,
                        tier: MatchTier::Semantic,
                        matched_sentence: Some(chunk.trim().to_string()),
                    });
                }
            }
        }
        matches
    }

    /// Hand semantic matches to the learning store; trigger a repository
    /// refresh when one earns auto-approval.
    fn track_for_learning(&self, semantic_matches: &[RebuttalCandidate]) {
        let Some(observer) = &self.observer else {
            return;
        };

        let mut any_approved = false;
        for m in semantic_matches {
            if m.tier != MatchTier::Semantic {
                continue;
            }
            let matched_sentence = m.matched_sentence.clone().unwrap_or_default();
            let candidate = extract_candidate_phrase(&m.phrase, &matched_sentence);
            if candidate.is_empty()
                || candidate.split_whitespace().count() > MAX_CANDIDATE_WORDS
                || candidate.len() > MAX_CANDIDATE_CHARS
            {
                continue;
            }
            let context = if matched_sentence.is_empty() {
                candidate.clone()
            } else {
                matched_sentence.clone()
            };
            let outcome = observer.observe(SemanticObservation {
                phrase: candidate,
                category: m.category.clone(),
                confidence: m.confidence,
                context,
                similar_to: m.phrase.clone(),
            });
            any_approved |= outcome.auto_approved;
        }

        if any_approved {
            let repository = self.repository.clone();
            tokio::spawn(async move {
                if let Err(e) = repository.refresh().await {
                    warn!("[RebuttalMatcher] post-approval refresh failed: {}", e);
                }
            });
        }
    }
}

/// Normalize text for robust exact matching: lowercase, strip common
/// punctuation, collapse whitespace.
pub fn normalize_for_matching(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .map(|c| if ".,!?;:-".contains(c) { ' ' } else { c })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Confidence of an exact match: word overlap over phrase word count.
fn exact_confidence(phrase: &str, transcript: &str) -> f32 {
    let phrase_words: BTreeSet<&str> = phrase.split_whitespace().collect();
    let transcript_words: BTreeSet<&str> = transcript.split_whitespace().collect();
    if phrase_words.is_empty() {
        return 0.0;
    }
    let overlap = phrase_words.intersection(&transcript_words).count();
    (overlap as f32 / phrase_words.len() as f32).min(1.0)
}

/// Drop semantic candidates whose phrase an exact candidate already found.
fn filter_duplicate_matches(
    exact: &[RebuttalCandidate],
    semantic: Vec<RebuttalCandidate>,
) -> Vec<RebuttalCandidate> {
    if exact.is_empty() {
        return semantic;
    }
    let exact_phrases: BTreeSet<String> =
        exact.iter().map(|m| m.phrase.to_lowercase()).collect();
    semantic
        .into_iter()
        .filter(|m| !exact_phrases.contains(&m.phrase.to_lowercase()))
        .collect()
}

/// Whether a transcript is clean enough to justify an LLM call.
///
/// Very short transcripts and ones dominated by a repeating phrase (a
/// hallucination signature of degraded audio) are not.
fn transcript_quality_ok(transcript: &str) -> bool {
    let words: Vec<&str> = transcript.split_whitespace().collect();
    if words.len() < MIN_QUALITY_WORDS {
        return false;
    }
    // A 10-word window repeating three or more times marks a loop
    if words.len() >= 30 {
        let mut window_counts: std::collections::BTreeMap<String, usize> =
            std::collections::BTreeMap::new();
        for window in words.windows(10) {
            let key = window.join(" ");
            let count = window_counts.entry(key).or_insert(0);
            *count += 1;
            if *count >= 3 {
                return false;
            }
        }
    }
    true
}
