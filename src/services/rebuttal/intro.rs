//! Intro scorer: six boolean checks over the agent transcript.
//!
//! The first three checks read the transcript itself (agent introduction,
//! owner name, property reference); the other three fold in the detector
//! verdicts. Each check scores 0 or 100 and the intro score is their mean.

use crate::core::report::{CheckScore, Detection, IntroScores, RebuttalVerdict};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Only the call opening matters for the intro-specific checks.
const INTRO_SECTION_CHARS: usize = 450;
/// Fuzzy name-match acceptance threshold (normalized Levenshtein * 100).
const NAME_SIMILARITY_THRESHOLD: f64 = 75.0;

static INTRO_NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bthis\s+is\s+(\w+(?:\s+\w+)?)",
        r"\bmy\s+name\s+is\s+(\w+(?:\s+\w+)?)",
        r"\bi'?m\s+(\w+(?:\s+\w+)?)",
        r"\bit'?s\s+(\w+(?:\s+\w+)?)",
        r"\byeah\s+this\s+(\w+(?:\s+\w+)?)",
        r"\bhello\s+this\s+(\w+(?:\s+\w+)?)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static GENERIC_INTRO_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bthis\s+is\s+(\w{2,})",
        r"\bmy\s+name\s+is\s+(\w{2,})",
        r"\bi'?m\s+(\w{2,})\b",
        r"\bit'?s\s+(\w{2,})\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Words that follow an intro verb but are never a name.
static NON_INTRO_WORDS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    BTreeSet::from([
        "calling",
        "reaching",
        "contacting",
        "trying",
        "looking",
        "speaking",
        "talking",
        "here",
        "there",
        "just",
        "now",
        "sorry",
        "hello",
        "good",
        "morning",
        "afternoon",
        "evening",
    ])
});

static GREETING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bhello\s*[,.]?\s+(\w+)(?:\s+(\w+))?",
        r"\bhi\s*[,.]?\s+(\w+)(?:\s+(\w+))?",
        r"\bhey\s*[,.]?\s+(\w+)(?:\s+(\w+))?",
        r"\bgood\s+(?:morning|afternoon|evening)\s*[,.]?\s+(\w+)",
        r"\bms\.?\s+(\w+)",
        r"\bmr\.?\s+(\w+)",
        r"\bmrs\.?\s+(\w+)",
        r"\bmiss\s+(\w+)",
        r"\btrying\s+to\s+reach\s+(?:the\s+)?(\w+(?:\s+\w+)?)",
        r"\blooking\s+for\s+(?:the\s+)?(\w+(?:\s+\w+)?)",
        r"\bspeaking\s+with\s+(\w+(?:\s+\w+)?)",
        r"\bspeaking\s+to\s+(\w+(?:\s+\w+)?)",
        r"\bcan\s+i\s+speak\s+(?:to|with)\s+(\w+(?:\s+\w+)?)",
        r"\bmay\s+i\s+speak\s+(?:to|with)\s+(\w+(?:\s+\w+)?)",
        r"\bam\s+i\s+speaking\s+(?:to|with)\s+(\w+(?:\s+\w+)?)",
        r"\bis\s+(\w+(?:\s+\w+)?)\s+(?:there|available)",
        r"\bthank\s+you\s*[,.]?\s+(\w+)",
        r"\bconfirming\s+(?:this\s+is\s+)?(\w+\s+\w+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Stop-list of tokens a greeting capture must not treat as a name.
static NON_NAME_WORDS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    BTreeSet::from([
        "there", "sir", "maam", "miss", "mrs", "mr", "ms", "hello", "hi", "hey", "the", "and",
        "but", "for", "are", "you", "this", "that", "with", "from", "have", "had", "has", "was",
        "were", "will", "can", "could", "would", "should", "what", "when", "where", "how", "why",
        "who", "which", "whose", "yes", "no", "not", "now", "here", "then", "than", "ma", "am",
        "pm", "th", "nd", "rd", "st", "ing", "ed", "er", "ly", "tion", "i", "a", "an", "as", "at",
        "by", "do", "go", "if", "in", "is", "it", "me", "my", "of", "on", "or", "so", "to", "up",
        "us", "we", "out", "about", "over", "under", "again", "further", "once", "both", "each",
        "few", "more", "most", "other", "some", "such", "only", "own", "same", "too", "very",
        "dont", "don", "property", "house", "home", "address", "street", "avenue", "road",
        "place", "calling", "speaking", "today", "anyone", "somebody", "someone",
    ])
});

/// Words vetoing the token after a bare hello/hi/hey capture.
static GREETING_FOLLOWER_VETO: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    BTreeSet::from(["this", "there", "how", "what", "when", "where", "why"])
});

static RESPECTFUL_ADDRESSES: [&str; 5] = ["ma'am", "sir", "madam", "miss", "mister"];

static PROPERTY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bproperty\b",
        r"\bhouse\b",
        r"\bhome\b",
        r"\bapartment\b",
        r"\bcondo\b",
        r"\bland\b",
        r"\baddress\b",
        r"\bstreet\b",
        r"\bavenue\b",
        r"\broad\b",
        r"\bdrive\b",
        r"\blane\b",
        r"\bway\b",
        r"\bplace\b",
        r"\bcourt\b",
        r"\bcircle\b",
        r"\bboulevard\b",
        r"\bparkway\b",
        r"\bhighway\b",
        r"\broute\b",
        r"\d+\s+(?:street|avenue|road|drive|lane|way|place|court|circle|boulevard|parkway)",
        r"\d+(?:st|nd|rd|th)\s+(?:street|avenue|road|drive|lane|way|place|court|circle|boulevard|parkway)",
        r"\b(?:street|avenue|road|drive|lane|way|place|court|circle|boulevard|parkway)\s+\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Intro quality scorer for one call.
pub struct IntroScorer {
    agent_name: String,
}

impl IntroScorer {
    /// Create a scorer for the given agent display name.
    pub fn new(agent_name: &str) -> Self {
        Self {
            agent_name: agent_name.to_lowercase(),
        }
    }

    /// Score a transcript together with the detector verdicts.
    pub fn score(
        &self,
        transcript: &str,
        rebuttal: RebuttalVerdict,
        late_hello: Detection,
        releasing: Detection,
    ) -> IntroScores {
        let transcript_lower = transcript.to_lowercase();
        IntroScores {
            agent_intro: self.check_agent_intro(&transcript_lower),
            owner_name: self.check_owner_name(&transcript_lower),
            property_ref: self.check_property_ref(&transcript_lower),
            rebuttal: rebuttal_score(rebuttal),
            late_hello: inverted_score(late_hello),
            releasing: inverted_score(releasing),
        }
    }

    /// Check 1: the agent introduced themselves.
    ///
    /// Exact name patterns first, then fuzzy name similarity on intro-verb
    /// captures, then a generic plausible-name fallback.
    fn check_agent_intro(&self, transcript: &str) -> CheckScore {
        if self.agent_name.is_empty() {
            return CheckScore::not_applicable();
        }
        let intro_section = intro_section(transcript);

        let exact_patterns = [
            format!("this is {}", self.agent_name),
            format!("my name is {}", self.agent_name),
            format!("i'm {}", self.agent_name),
            format!("i am {}", self.agent_name),
            format!("it's {}", self.agent_name),
            format!("it is {}", self.agent_name),
        ];
        if exact_patterns.iter().any(|p| intro_section.contains(p)) {
            return CheckScore::yes();
        }

        for pattern in INTRO_NAME_PATTERNS.iter() {
            for captures in pattern.captures_iter(intro_section) {
                if let Some(candidate) = captures.get(1) {
                    let similarity =
                        strsim::normalized_levenshtein(candidate.as_str(), &self.agent_name)
                            * 100.0;
                    if similarity >= NAME_SIMILARITY_THRESHOLD {
                        return CheckScore::yes();
                    }
                }
            }
        }

        // Fallback: any plausible non-filler noun after an intro verb
        for pattern in GENERIC_INTRO_PATTERNS.iter() {
            if let Some(captures) = pattern.captures(intro_section) {
                if let Some(candidate) = captures.get(1) {
                    let name = candidate.as_str();
                    if !NON_INTRO_WORDS.contains(name) && name.len() >= 3 {
                        return CheckScore::yes();
                    }
                }
            }
        }

        CheckScore::no()
    }

    /// Check 2: respectful address or greeting followed by a plausible name.
    fn check_owner_name(&self, transcript: &str) -> CheckScore {
        let intro_section = intro_section(transcript);

        for address in RESPECTFUL_ADDRESSES {
            if intro_section.contains(address) {
                return CheckScore::yes();
            }
        }

        for (idx, pattern) in GREETING_PATTERNS.iter().enumerate() {
            for captures in pattern.captures_iter(intro_section) {
                let Some(name_match) = captures.get(1) else {
                    continue;
                };
                // The bare hello/hi/hey patterns veto on the word after the
                // captured name ("hello how are you")
                if idx < 3 {
                    if let Some(follower) = captures.get(2) {
                        if GREETING_FOLLOWER_VETO.contains(follower.as_str()) {
                            continue;
                        }
                    }
                }
                if is_plausible_name(name_match.as_str()) {
                    return CheckScore::yes();
                }
            }
        }

        CheckScore::no()
    }

    /// Check 3: any property or street reference in the whole transcript.
    fn check_property_ref(&self, transcript: &str) -> CheckScore {
        for pattern in PROPERTY_PATTERNS.iter() {
            if pattern.is_match(transcript) {
                return CheckScore::yes();
            }
        }
        CheckScore::no()
    }
}

fn intro_section(transcript: &str) -> &str {
    let mut end = transcript.len().min(INTRO_SECTION_CHARS);
    // Keep the slice on a char boundary
    while end > 0 && !transcript.is_char_boundary(end) {
        end -= 1;
    }
    &transcript[..end]
}

fn is_plausible_name(candidate: &str) -> bool {
    // Multi-word captures validate on their first token
    let first = candidate.split_whitespace().next().unwrap_or("");
    let clean = first.trim().to_lowercase();
    clean.len() >= 3
        && !NON_NAME_WORDS.contains(clean.as_str())
        && !clean.chars().any(|c| c.is_ascii_digit())
        && clean.chars().any(|c| "aeiou".contains(c))
}

fn rebuttal_score(verdict: RebuttalVerdict) -> CheckScore {
    match verdict {
        RebuttalVerdict::Yes => CheckScore::yes(),
        RebuttalVerdict::No => CheckScore::no(),
        RebuttalVerdict::Error | RebuttalVerdict::NotApplicable => CheckScore::not_applicable(),
    }
}

fn inverted_score(detection: Detection) -> CheckScore {
    match detection {
        Detection::No => CheckScore::inverted_pass(),
        Detection::Yes => CheckScore::inverted_fail(),
        Detection::Error => CheckScore::not_applicable(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::{CallStatus, CheckDisplay};

    fn scorer() -> IntroScorer {
        IntroScorer::new("John Smith")
    }

    #[test]
    fn test_exact_agent_intro() {
        let scores = scorer().score(
            "hello this is john smith calling",
            RebuttalVerdict::No,
            Detection::No,
            Detection::No,
        );
        assert_eq!(scores.agent_intro.display, CheckDisplay::Yes);
    }

    #[test]
    fn test_fuzzy_agent_intro() {
        // "jon smith" is within Levenshtein ratio 75 of "john smith"
        let scorer = IntroScorer::new("john smith");
        let scores = scorer.score(
            "hi my name is jon smith with acme",
            RebuttalVerdict::No,
            Detection::No,
            Detection::No,
        );
        assert_eq!(scores.agent_intro.display, CheckDisplay::Yes);
    }

    #[test]
    fn test_generic_intro_fallback() {
        // Wrong name entirely, but a plausible intro still counts
        let scores = scorer().score(
            "hey it's marcus calling from acme realty",
            RebuttalVerdict::No,
            Detection::No,
            Detection::No,
        );
        assert_eq!(scores.agent_intro.display, CheckDisplay::Yes);
    }

    #[test]
    fn test_intro_verb_followed_by_filler_fails() {
        let scores = scorer().score(
            "hi i'm calling to see if the owner is around",
            RebuttalVerdict::No,
            Detection::No,
            Detection::No,
        );
        assert_eq!(scores.agent_intro.display, CheckDisplay::No);
    }

    #[test]
    fn test_empty_agent_name_is_not_applicable() {
        let scorer = IntroScorer::new("");
        let scores = scorer.score(
            "this is john",
            RebuttalVerdict::No,
            Detection::No,
            Detection::No,
        );
        assert_eq!(scores.agent_intro.display, CheckDisplay::NotApplicable);
        assert_eq!(scores.agent_intro.score, 0);
    }

    #[test]
    fn test_respectful_address_scores_owner_name() {
        let scores = scorer().score(
            "good morning ma'am how are you today",
            RebuttalVerdict::No,
            Detection::No,
            Detection::No,
        );
        assert_eq!(scores.owner_name.display, CheckDisplay::Yes);
    }

    #[test]
    fn test_greeting_with_name_scores_owner_name() {
        let scores = scorer().score(
            "hello patricia am i catching you at a bad time",
            RebuttalVerdict::No,
            Detection::No,
            Detection::No,
        );
        assert_eq!(scores.owner_name.display, CheckDisplay::Yes);
    }

    #[test]
    fn test_greeting_with_question_word_fails_owner_name() {
        let scores = scorer().score(
            "hello how are you doing today",
            RebuttalVerdict::No,
            Detection::No,
            Detection::No,
        );
        assert_eq!(scores.owner_name.display, CheckDisplay::No);
    }

    #[test]
    fn test_property_reference() {
        let scores = scorer().score(
            "i'm calling about the house on 42 maple street",
            RebuttalVerdict::No,
            Detection::No,
            Detection::No,
        );
        assert_eq!(scores.property_ref.display, CheckDisplay::Yes);

        let scores = scorer().score(
            "just wanted to catch up with you",
            RebuttalVerdict::No,
            Detection::No,
            Detection::No,
        );
        assert_eq!(scores.property_ref.display, CheckDisplay::No);
    }

    #[test]
    fn test_detector_inversions() {
        let scores = scorer().score(
            "",
            RebuttalVerdict::Yes,
            Detection::Yes,
            Detection::No,
        );
        assert_eq!(scores.rebuttal.display, CheckDisplay::Yes);
        assert_eq!(scores.rebuttal.score, 100);
        // Late hello present: displays Yes, scores 0
        assert_eq!(scores.late_hello.display, CheckDisplay::Yes);
        assert_eq!(scores.late_hello.score, 0);
        // Releasing absent: displays No, scores 100
        assert_eq!(scores.releasing.display, CheckDisplay::No);
        assert_eq!(scores.releasing.score, 100);
    }

    #[test]
    fn test_on_time_hello_no_rebuttal_scenario() {
        // Agent speaks on time with a clean intro and nothing else
        let scores = scorer().score(
            "hi this is john from acme how are you doing today",
            RebuttalVerdict::No,
            Detection::No,
            Detection::No,
        );
        assert_eq!(scores.agent_intro.display, CheckDisplay::Yes);
        assert_eq!(scores.owner_name.display, CheckDisplay::No);
        assert_eq!(scores.property_ref.display, CheckDisplay::No);
        // agent_intro + late_hello + releasing pass: 50%
        assert!((scores.percentage() - 50.0).abs() < 0.1);
        assert_eq!(scores.status(), CallStatus::Good);
    }

    #[test]
    fn test_silent_agent_scenario_is_critical() {
        let scores = scorer().score(
            "",
            RebuttalVerdict::No,
            Detection::No,
            Detection::Yes,
        );
        // Only late-hello-absent passes: 16.7% -> Critical
        assert!((scores.percentage() - 16.666).abs() < 0.1);
        assert_eq!(scores.status(), CallStatus::Critical);
    }

    #[test]
    fn test_intro_section_only_covers_opening() {
        let padding = "filler words about nothing in particular ".repeat(12);
        let transcript = format!("{} this is john smith", padding);
        assert!(padding.len() > INTRO_SECTION_CHARS);
        let scores = scorer().score(
            &transcript,
            RebuttalVerdict::No,
            Detection::No,
            Detection::No,
        );
        // The intro lands beyond the 450-char window
        assert_eq!(scores.agent_intro.display, CheckDisplay::No);
    }
}
