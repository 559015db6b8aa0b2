//! Phrase repository: seed catalogue plus learned phrases, with an
//! atomically swapped embedding index.
//!
//! Readers take an [`Arc`] snapshot of the `(phrases, embeddings, metadata)`
//! triple and never observe a torn state; `refresh` builds a new index off
//! to the side and swaps it in under a short write lock.

use crate::services::embedding::Embedder;
use crate::{Result, error::AuditError};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Seed rebuttal phrases grouped by category.
///
/// Curated from production transcripts; learned phrases extend these at
/// runtime. All entries are lowercase canonical forms.
static SEED_PHRASES: Lazy<BTreeMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    BTreeMap::from([
        (
            "OTHER_PROPERTY_FAMILY",
            vec![
                "do you have any other property",
                "do you have another property",
                "any other property",
                "any other properties",
                "any other properties you might consider",
                "any other property you might consider",
                "any other property you want to sell",
                "any other property you might want to sell",
                "any other property that you might want to sell",
                "do you have any other houses",
                "do you have any other houses you want to sell",
                "do you have another house",
                "any other houses to sell",
                "any other houses you might consider selling",
                "any property you might be interested in selling",
                "any property you might be interested in selling soon",
                "do you happen to have any property that you might be interested in selling soon",
                "do you have any other property you might be interested in selling",
                "you don't have any other property to sell",
                "you don't own any other property",
                "do you own any other property you'd like to sell",
                "do you happen to have any other property",
                "any other properties besides this one",
                "any other properties aside from this one",
                "got any other property",
                "any other properties available",
                "are there any other homes you own",
                "do you own multiple properties",
                "any additional properties",
                "other real estate you might have",
                "any other real estate assets",
                "other investment properties",
                "other residential properties",
                "additional homes or apartments",
                "any other land or property",
                "other properties in your portfolio",
                "any other holdings",
                "additional real estate",
                "any other assets you want to sell",
                "other homes you might want to liquidate",
                "any other real estate you might sell",
                "additional properties you might consider",
                "other houses you might want to sell",
                "any additional homes you have",
                "do you own any other real estate",
                "do you have any rental property",
                "any other property you inherited",
                "do you own any other homes",
                "do you have property in other areas",
                "do you own any properties that you might consider selling",
                "any properties you might consider selling",
            ],
        ),
        (
            "NOT_EVEN_FUTURE_FAMILY",
            vec![
                "would you be open to selling in the future",
                "would you be open to sell in the future",
                "would you be open to sell maybe next year",
                "would you be open to selling maybe next year",
                "would you be interested in selling in the future",
                "would you be interested in selling maybe next year",
                "would you be interested in selling later",
                "any chance you might sell in the future",
                "any chance you might sell later",
                "any chance you might sell next year",
                "what about in the future",
                "even in the near future",
                "now or even in the near future",
                "even in the future",
                "maybe down the road",
                "not even possible in the future",
                "you think you could possibly sell the next year or so",
                "think you could possibly sell in the next year",
                "could we come to an agreement next year",
                "think we could come to an agreement in the future",
                "you think you could sell maybe next year",
                "could you possibly consider selling next year",
            ],
        ),
        (
            "CALLBACK_SCHEDULE_FAMILY",
            vec![
                "when is the best time to call you back",
                "what's a good time to reach you",
                "can i call you back later",
                "let me take down your details",
                "when would be a good time to call back",
                "what time works best for you",
                "when should i follow up with you",
                "what's the best time to reach you",
                "when can i call you again",
                "what time is convenient for you",
                "when would you prefer i call",
                "what's a good callback time",
                "when is it okay to call back",
                "when can we talk again",
                "when should i check back with you",
            ],
        ),
        (
            "WOULD_CONSIDER_FAMILY",
            vec![
                "would you consider selling",
                "would you be interested in an offer",
                "could we make you an offer",
                "would you consider an offer",
                "would you be interested in selling",
                "would you think about an offer",
                "would you entertain an offer",
                "would you be open to an offer",
                "would you consider a cash offer",
                "would you be willing to sell",
                "would you be interested in a deal",
                "would you consider our offer",
                "would you be open to selling",
            ],
        ),
        (
            "WE_BUY_OFFER_FAMILY",
            vec![
                "we buy houses all cash",
                "no commission, no fees",
                "we pay all closing costs",
                "as-is, no repairs",
                "buying properties all over the state",
                "we buy houses for cash",
                "we purchase properties quickly",
                "we buy in any condition",
                "we close fast with cash",
                "we buy houses as-is",
                "we purchase homes directly",
                "we close in days not months",
                "would that be negotiable",
                "is that price negotiable",
                "would you consider a lower offer",
                "how did you come up with this number",
                "how did you arrive at that price",
                "what's your best price",
                "would you take less",
                "is there room for negotiation",
                "can we work on the price",
                "what would you accept",
                "is that your final price",
            ],
        ),
        (
            "FLEXIBLE_CONVENIENT_FAMILY",
            vec![
                "we're very flexible with timing",
                "very simple process",
                "fast closing, your convenience",
                "we have flexible closing time to six months",
                "flexible closing time to six months",
                "we have flexible closing time",
                "flexible closing time",
            ],
        ),
        (
            "DISCOVERED_FROM_TRAINING_FAMILY",
            vec!["any other property you have"],
        ),
        (
            "MIXED_FUTURE_OTHER_FAMILY",
            vec![
                "not even in the near future but do you have any other property",
                "not even in the future but do you have any other property",
                "no plans to sell but do you have any other property",
                "not interested in selling but do you have any other property",
                "not now maybe later do you have any other property",
                "not now maybe next year do you have any other property",
                "not selling now but do you have any other property",
                "not ready to sell this one but do you have any other property",
                "not selling this one but maybe another property",
                "not this property but maybe another one",
                "not this one but another one",
                "not this house but maybe another one",
                "do you have any other properties besides this",
                "do you have something else you might sell",
                "do you have another property instead",
                "do you happen to own another property",
                "do you have another property that you're considering selling",
                "do you have other properties that might be available",
                "do you have any additional properties",
                "do you have other homes or properties",
                "do you have another piece of property",
                "do you have another one",
                "do you have other real estate holdings",
                "do you have other investment properties",
                "do you have any other property",
                "do you have any other properties",
                "do you have any other home",
                "do you have any other homes",
                "do you have any other house",
                "do you have any other houses",
                "do you have any other real estate",
                "do you have any other asset",
                "do you have any other assets",
                "do you have a property that you might be interested in selling",
                "do you have any property that you might be interested in selling",
                "did you happen to have any other",
                "do you happen to have any other",
                "do you have any other for sale",
                "do you have any other properties for sale",
                "do you have anything else for sale",
                "do you happen to own any other",
                "not selling this but do you have any other property",
                "not this one but any other property you own",
                "not this house but other houses you have",
                "not selling here but elsewhere maybe",
                "not this home but other homes you have",
                "not selling now but other property later",
                "not this property but different property maybe",
            ],
        ),
    ])
});

/// Read access to approved learned phrases, implemented by the learning
/// store. Keeping this a narrow trait avoids a direct module cycle between
/// the repository and the store.
pub trait LearnedPhraseSource: Send + Sync {
    /// Approved phrases grouped by category.
    fn approved_phrases(&self) -> Result<BTreeMap<String, Vec<String>>>;
}

/// Phrase metadata parallel to the embedding rows.
#[derive(Debug, Clone)]
pub struct PhraseRef {
    /// The phrase text.
    pub phrase: String,
    /// Its category.
    pub category: String,
}

/// Immutable snapshot of phrases and their embeddings.
#[derive(Debug, Default)]
pub struct PhraseIndex {
    /// Phrases grouped by category, case-insensitively deduplicated.
    pub phrases: BTreeMap<String, Vec<String>>,
    /// One embedding per metadata row; empty until the first refresh.
    pub embeddings: Vec<Vec<f32>>,
    /// Row metadata parallel to `embeddings`.
    pub metadata: Vec<PhraseRef>,
}

impl PhraseIndex {
    /// Total phrase count across categories.
    pub fn phrase_count(&self) -> usize {
        self.phrases.values().map(|v| v.len()).sum()
    }

    /// Whether semantic matching is possible with this snapshot.
    pub fn has_embeddings(&self) -> bool {
        !self.embeddings.is_empty()
    }
}

/// Shared phrase repository with snapshot semantics.
pub struct PhraseRepository {
    embedder: Arc<dyn Embedder>,
    learned: Option<Arc<dyn LearnedPhraseSource>>,
    index: RwLock<Arc<PhraseIndex>>,
}

impl PhraseRepository {
    /// Build a repository over the seed catalogue; embeddings stay empty
    /// until [`PhraseRepository::refresh`] runs.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        learned: Option<Arc<dyn LearnedPhraseSource>>,
    ) -> Self {
        let phrases = merge_phrases(
            &seed_phrases_owned(),
            learned
                .as_ref()
                .and_then(|source| source.approved_phrases().ok())
                .unwrap_or_default(),
        );
        let index = PhraseIndex {
            phrases,
            embeddings: Vec::new(),
            metadata: Vec::new(),
        };
        Self {
            embedder,
            learned,
            index: RwLock::new(Arc::new(index)),
        }
    }

    /// Current snapshot; cheap Arc clone.
    pub fn snapshot(&self) -> Arc<PhraseIndex> {
        self.index.read().unwrap().clone()
    }

    /// All phrases grouped by category.
    pub fn all(&self) -> BTreeMap<String, Vec<String>> {
        self.snapshot().phrases.clone()
    }

    /// Phrases of one category, empty when the category is unknown.
    pub fn by_category(&self, category: &str) -> Vec<String> {
        self.snapshot()
            .phrases
            .get(category)
            .cloned()
            .unwrap_or_default()
    }

    /// Reload learned phrases, re-encode the full phrase list, and swap in
    /// a new snapshot.
    ///
    /// # Errors
    ///
    /// Fails when the embedder rejects the encode; the previous snapshot
    /// stays in place in that case.
    pub async fn refresh(&self) -> Result<()> {
        let learned_phrases = match &self.learned {
            Some(source) => match source.approved_phrases() {
                Ok(phrases) => phrases,
                Err(e) => {
                    warn!("[PhraseRepository] learned phrase load failed: {}", e);
                    BTreeMap::new()
                }
            },
            None => BTreeMap::new(),
        };

        let phrases = merge_phrases(&seed_phrases_owned(), learned_phrases);

        let mut metadata = Vec::new();
        let mut texts = Vec::new();
        for (category, category_phrases) in &phrases {
            for phrase in category_phrases {
                metadata.push(PhraseRef {
                    phrase: phrase.clone(),
                    category: category.clone(),
                });
                texts.push(phrase.clone());
            }
        }

        let embeddings = self.embedder.encode(&texts).await?;
        if embeddings.len() != metadata.len() {
            return Err(AuditError::embedder_api(format!(
                "Embedding count mismatch: {} phrases, {} vectors",
                metadata.len(),
                embeddings.len()
            )));
        }

        let new_index = Arc::new(PhraseIndex {
            phrases,
            embeddings,
            metadata,
        });
        {
            let mut guard = self.index.write().unwrap();
            *guard = new_index;
        }
        let snapshot = self.snapshot();
        info!(
            "[PhraseRepository] refreshed: {} phrases in {} categories",
            snapshot.phrase_count(),
            snapshot.phrases.len()
        );
        Ok(())
    }
}

fn seed_phrases_owned() -> BTreeMap<String, Vec<String>> {
    SEED_PHRASES
        .iter()
        .map(|(category, phrases)| {
            (
                category.to_string(),
                phrases.iter().map(|p| p.to_string()).collect(),
            )
        })
        .collect()
}

/// Merge learned phrases into the seed catalogue with case-insensitive
/// deduplication. Seed entries always survive; learned duplicates of a
/// seed phrase (in any category) are dropped.
fn merge_phrases(
    seed: &BTreeMap<String, Vec<String>>,
    learned: BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, Vec<String>> {
    let mut merged = seed.clone();
    let mut seen: std::collections::BTreeSet<String> = seed
        .values()
        .flatten()
        .map(|p| p.trim().to_lowercase())
        .collect();

    for (category, phrases) in learned {
        let bucket = merged.entry(category).or_default();
        for phrase in phrases {
            let key = phrase.trim().to_lowercase();
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.insert(key.clone());
            bucket.push(key);
        }
    }
    debug!(
        "[PhraseRepository] merged catalogue: {} categories",
        merged.len()
    );
    merged
}
