//! Transcript chunking for the semantic tier.
//!
//! Splits a transcript on sentence punctuation, re-grouping greedily so
//! question chunks keep their preceding context and no chunk exceeds 50
//! words. Polite closings with no sales content are dropped entirely; they
//! are the classic source of false semantic matches.

/// Maximum words per chunk.
const MAX_CHUNK_WORDS: usize = 50;
/// Minimum chunk length in characters.
const MIN_CHUNK_CHARS: usize = 3;
/// Maximum words for a learned candidate phrase.
pub const MAX_CANDIDATE_WORDS: usize = 15;
/// Maximum characters for a learned candidate phrase.
pub const MAX_CANDIDATE_CHARS: usize = 160;

/// Polite-closing markers.
const CLOSING_KEYWORDS: [&str; 10] = [
    "thank you",
    "thanks for your time",
    "have a good one",
    "have a great day",
    "have a nice day",
    "enjoy your day",
    "bye",
    "goodbye",
    "talk to you later",
    "take care",
];

/// Sales-content markers that rescue a chunk from the closing filter.
const CONTENT_KEYWORDS: [&str; 10] = [
    "sell", "selling", "buyer", "buying", "offer", "price", "property", "house", "home", "future",
];

/// Split a transcript into semantic chunks.
pub fn split_into_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for (sentence, is_question) in split_sentences(text) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        if is_question {
            // Questions flush with their preceding context attached
            if !current.is_empty() {
                current.push(' ');
                current.push_str(sentence);
            } else {
                current = sentence.to_string();
            }
            chunks.push(std::mem::take(&mut current));
        } else {
            let combined_words = current.split_whitespace().count()
                + sentence.split_whitespace().count();
            if !current.is_empty() && combined_words > MAX_CHUNK_WORDS {
                chunks.push(std::mem::take(&mut current));
                current = sentence.to_string();
            } else if !current.is_empty() {
                current.push(' ');
                current.push_str(sentence);
            } else {
                current = sentence.to_string();
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| c.len() >= MIN_CHUNK_CHARS)
        .collect()
}

/// Chunks eligible for semantic matching: long enough and not a polite
/// closing.
pub fn matchable_chunks(text: &str) -> Vec<String> {
    split_into_chunks(text)
        .into_iter()
        .filter(|c| !is_polite_closing(c))
        .collect()
}

/// Split on `.!?` runs, tagging each sentence with whether its terminator
/// included a question mark.
fn split_sentences(text: &str) -> Vec<(String, bool)> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let mut is_question = c == '?';
            while let Some(&next) = chars.peek() {
                if matches!(next, '.' | '!' | '?') {
                    is_question |= next == '?';
                    chars.next();
                } else {
                    break;
                }
            }
            if !current.trim().is_empty() {
                sentences.push((std::mem::take(&mut current), is_question));
            } else {
                current.clear();
            }
        } else {
            current.push(c);
        }
    }
    if !current.trim().is_empty() {
        sentences.push((current, false));
    }
    sentences
}

/// Whether a chunk is a polite closing with no sales content.
pub fn is_polite_closing(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    if CONTENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return false;
    }
    CLOSING_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Trim a trailing polite closing off a candidate phrase.
pub fn strip_polite_closing_suffix(text: &str) -> String {
    if text.is_empty() {
        return text.to_string();
    }
    let lower = text.to_lowercase();
    let mut cut_index = text.len();
    for keyword in CLOSING_KEYWORDS {
        if let Some(idx) = lower.find(keyword) {
            cut_index = cut_index.min(idx);
        }
    }
    text[..cut_index].trim().to_string()
}

/// Extract a learnable candidate phrase from a matched sentence.
///
/// Short sentences become the candidate directly. Longer ones are reduced
/// to the window with the best token overlap against the base repository
/// phrase; a weak overlap falls back to the base phrase itself. Candidates
/// are capped at 15 words / 160 characters with closings stripped.
pub fn extract_candidate_phrase(base_phrase: &str, matched_sentence: &str) -> String {
    let sentence = matched_sentence.trim();
    let base = base_phrase.trim();
    if sentence.is_empty() {
        return base.to_string();
    }

    let sentence_tokens: Vec<&str> = sentence.split_whitespace().collect();
    if sentence_tokens.len() <= 10 {
        return strip_polite_closing_suffix(&sentence.to_lowercase());
    }

    let base_tokens: Vec<String> = base
        .to_lowercase()
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| ".,!?;:".contains(c)).to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let base_token_set: std::collections::BTreeSet<&str> =
        base_tokens.iter().map(|s| s.as_str()).collect();

    if base_token_set.is_empty() {
        return truncate_candidate(&sentence.to_lowercase());
    }

    let max_window = sentence_tokens
        .len()
        .min((base_tokens.len() + 3).max(12));
    let mut best_start = 0;
    let mut best_end = sentence_tokens.len().min(base_tokens.len());
    let mut best_score = 0.0f32;

    for start in 0..sentence_tokens.len() {
        let end_cap = (start + max_window).min(sentence_tokens.len());
        for end in (start + 1)..=end_cap {
            let window_set: std::collections::BTreeSet<String> = sentence_tokens[start..end]
                .iter()
                .map(|t| {
                    t.to_lowercase()
                        .trim_matches(|c: char| ".,!?;:".contains(c))
                        .to_string()
                })
                .filter(|t| !t.is_empty())
                .collect();
            if window_set.is_empty() {
                continue;
            }
            let overlap = window_set
                .iter()
                .filter(|t| base_token_set.contains(t.as_str()))
                .count();
            let score = overlap as f32 / base_token_set.len() as f32;
            let is_better = score > best_score
                || (score == best_score && (end - start) < (best_end - best_start));
            if is_better {
                best_score = score;
                best_start = start;
                best_end = end;
            }
        }
    }

    let candidate = if best_score >= 0.5 {
        sentence_tokens[best_start..best_end].join(" ")
    } else {
        base.to_string()
    };
    let candidate = truncate_candidate(&candidate.to_lowercase());
    strip_polite_closing_suffix(&candidate)
}

fn truncate_candidate(candidate: &str) -> String {
    let mut result = candidate.trim().to_string();
    let words: Vec<&str> = result.split_whitespace().collect();
    if words.len() > MAX_CANDIDATE_WORDS {
        result = words[..MAX_CANDIDATE_WORDS].join(" ");
    }
    if result.len() > MAX_CANDIDATE_CHARS {
        result.truncate(MAX_CANDIDATE_CHARS);
        result = result.trim_end().to_string();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_keeps_preceding_context() {
        let chunks = split_into_chunks(
            "i understand you are not interested. but do you have any other property?",
        );
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("not interested"));
        assert!(chunks[0].contains("any other property"));
    }

    #[test]
    fn test_statements_group_up_to_word_limit() {
        // 20 sentences of 4 words each: groups of at most 50 words
        let text = (0..20)
            .map(|i| format!("this is sentence {}.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = split_into_chunks(&text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.split_whitespace().count() <= MAX_CHUNK_WORDS);
        }
    }

    #[test]
    fn test_tiny_chunks_dropped() {
        let chunks = split_into_chunks("ok. do you have any other property to sell?");
        // "ok" merges into the question chunk as context, nothing under 3
        // chars survives on its own
        for chunk in &chunks {
            assert!(chunk.len() >= MIN_CHUNK_CHARS);
        }
    }

    #[test]
    fn test_polite_closing_detection() {
        assert!(is_polite_closing("thank you have a great day"));
        assert!(is_polite_closing("alright bye"));
        // Content keyword rescues the chunk
        assert!(!is_polite_closing("thank you but would you consider selling"));
        assert!(!is_polite_closing("do you have any other property"));
    }

    #[test]
    fn test_matchable_chunks_filters_closings() {
        let chunks = matchable_chunks(
            "do you have any other property you want to sell? okay thank you have a great day.",
        );
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("any other property"));
    }

    #[test]
    fn test_strip_closing_suffix() {
        assert_eq!(
            strip_polite_closing_suffix("any other property to sell thank you bye"),
            "any other property to sell"
        );
        assert_eq!(strip_polite_closing_suffix("no closings here"), "no closings here");
    }

    #[test]
    fn test_short_sentence_becomes_candidate() {
        let candidate =
            extract_candidate_phrase("any other property", "any additional homes you own?");
        assert_eq!(candidate, "any additional homes you own?");
    }

    #[test]
    fn test_long_sentence_reduced_to_overlap_window() {
        let base = "do you have any other property you might want to sell";
        let sentence = "well like i was saying before we talked about the weather \
                        do you have any other property you might want to sell around here";
        let candidate = extract_candidate_phrase(base, sentence);
        assert!(candidate.split_whitespace().count() <= MAX_CANDIDATE_WORDS);
        assert!(candidate.contains("any other property"));
    }

    #[test]
    fn test_candidate_caps() {
        let base = "unrelated base phrase entirely";
        let long_sentence = "word ".repeat(60);
        let candidate = extract_candidate_phrase(base, &long_sentence);
        assert!(candidate.split_whitespace().count() <= MAX_CANDIDATE_WORDS);
        assert!(candidate.len() <= MAX_CANDIDATE_CHARS);
    }
}
