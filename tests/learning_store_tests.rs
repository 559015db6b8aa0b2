//! Learning store integration tests: dedup keys, approval triggers,
//! blacklist, and quality scoring invariants.

use callaudit::config::LearningConfig;
use callaudit::services::learning::{
    PendingStatus, PhraseLearningStore, QualityInputs, QualityTier, quality_score,
};
use callaudit::services::rebuttal::{LearnedPhraseSource, MatchObserver, SemanticObservation};
use chrono::{Duration, Utc};

fn store() -> PhraseLearningStore {
    PhraseLearningStore::open_in_memory(LearningConfig::default()).unwrap()
}

fn observation(phrase: &str, category: &str, confidence: f32) -> SemanticObservation {
    SemanticObservation {
        phrase: phrase.to_string(),
        category: category.to_string(),
        confidence,
        context: format!("heard as part of: {}", phrase),
        similar_to: "any other property".to_string(),
    }
}

#[test]
fn test_pending_dedup_is_by_phrase_alone() {
    let s = store();
    s.observe(observation("any vacant lots you own", "OTHER_PROPERTY_FAMILY", 0.86));
    s.observe(observation("any vacant lots you own", "MIXED_FUTURE_OTHER_FAMILY", 0.87));

    let pending = s.pending_phrases(PendingStatus::Pending).unwrap();
    assert_eq!(pending.len(), 1, "dedup key must ignore category");
    assert_eq!(pending[0].detection_count, 2);
}

#[test]
fn test_approved_uniqueness_is_category_and_phrase() {
    let s = store();
    s.add_phrase_manually("A", "duplicate check phrase").unwrap();
    // Same phrase in a different category is a separate approved entry
    s.add_phrase_manually("B", "duplicate check phrase").unwrap();
    // Same (category, phrase) is rejected
    assert!(s.add_phrase_manually("A", "duplicate check phrase").is_err());

    let approved = s.approved_phrases().unwrap();
    assert!(approved["A"].contains(&"duplicate check phrase".to_string()));
    assert!(approved["B"].contains(&"duplicate check phrase".to_string()));
}

#[test]
fn test_word_count_boundary_twenty_vs_twenty_one() {
    let s = store();
    let twenty: String = (0..20).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
    let twenty_one: String = (0..21).map(|i| format!("v{}", i)).collect::<Vec<_>>().join(" ");

    s.observe(observation(&twenty, "A", 0.86));
    s.observe(observation(&twenty_one, "A", 0.86));

    let pending = s.pending_phrases(PendingStatus::Pending).unwrap();
    assert_eq!(pending.len(), 2);
    for row in &pending {
        assert!(row.phrase.split_whitespace().count() <= 20);
    }
    // The 21-word phrase was truncated, not dropped
    assert!(pending.iter().any(|r| r.phrase.starts_with("v0 ")));
}

#[test]
fn test_high_priority_approval_has_no_frequency_requirement() {
    let s = store();
    let outcome = s
        .track_semantic_match(&observation("any unused acreage for sale", "A", 0.91))
        .unwrap();
    assert!(outcome.auto_approved);
}

#[test]
fn test_standard_approval_requires_frequency() {
    let config = LearningConfig {
        confidence_threshold: 0.85,
        frequency_threshold: 5,
        auto_approve_threshold: 0.88,
    };
    let s = PhraseLearningStore::open_in_memory(config).unwrap();
    let o = observation("any disused structures to sell", "A", 0.89);

    for _ in 0..4 {
        assert!(!s.track_semantic_match(&o).unwrap().auto_approved);
    }
    assert!(s.track_semantic_match(&o).unwrap().auto_approved);
}

#[test]
fn test_rejection_short_circuits_future_observations() {
    let s = store();
    s.observe(observation("any vacant lots you own", "A", 0.86));
    let id = s.pending_phrases(PendingStatus::Pending).unwrap()[0].id;
    s.reject_phrase(id, "owner language, not agent").unwrap();

    let outcome = s
        .track_semantic_match(&observation("any vacant lots you own", "A", 0.89))
        .unwrap();
    assert!(!outcome.recorded);
}

#[test]
fn test_store_failure_is_best_effort() {
    // Observe never panics or propagates even for garbage input
    let s = store();
    let outcome = s.observe(observation("", "A", 0.99));
    assert!(!outcome.recorded);
}

#[test]
fn test_quality_score_range_and_monotonicity() {
    let now = Utc::now();
    let base = QualityInputs {
        confidence: 0.85,
        detection_count: 2,
        last_detected: now - Duration::days(3),
        context_chars: 120,
    };
    let base_score = quality_score(&base, now);
    assert!((0.0..=1.0).contains(&base_score));

    let better = QualityInputs {
        confidence: 0.95,
        detection_count: 8,
        last_detected: now,
        context_chars: 480,
    };
    assert!(quality_score(&better, now) > base_score);

    let stale = QualityInputs {
        last_detected: now - Duration::days(45),
        ..base.clone()
    };
    assert!(quality_score(&stale, now) < base_score);
}

#[test]
fn test_quality_tier_boundaries() {
    assert_eq!(QualityTier::from_score(0.90), QualityTier::AutoApprove);
    assert_eq!(QualityTier::from_score(0.899), QualityTier::HighValue);
    assert_eq!(QualityTier::from_score(0.80), QualityTier::HighValue);
    assert_eq!(QualityTier::from_score(0.799), QualityTier::MediumValue);
    assert_eq!(QualityTier::from_score(0.65), QualityTier::MediumValue);
    assert_eq!(QualityTier::from_score(0.649), QualityTier::LowValue);
}

#[test]
fn test_adaptive_thresholds() {
    let s = store();
    assert!((s.adaptive_threshold("OTHER_PROPERTY_FAMILY") - 0.88).abs() < 1e-9);
    assert!((s.adaptive_threshold("MIXED_FUTURE_OTHER_FAMILY") - 0.85).abs() < 1e-9);
    assert!((s.adaptive_threshold("SOMETHING_NEW") - 0.80).abs() < 1e-9);
}

#[test]
fn test_stats_reflect_activity() {
    let s = store();
    s.observe(observation("any vacant lots you own", "A", 0.86));
    s.observe(observation("any unused acreage for sale", "A", 0.92)); // auto-approves
    let pending_id = s.pending_phrases(PendingStatus::Pending).unwrap()[0].id;
    s.reject_phrase(pending_id, "noise").unwrap();

    let stats = s.stats().unwrap();
    assert_eq!(stats.blacklisted, 1);
    assert!(!stats.approved_by_category.is_empty());
    // One auto-approved, one rejected: 50% approval rate
    assert!((stats.approval_rate.unwrap() - 0.5).abs() < 1e-9);
}
