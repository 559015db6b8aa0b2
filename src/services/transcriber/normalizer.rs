//! Phonetic normalizer: static accent-correction dictionary.
//!
//! Cloud transcription of non-native English produces systematic phonetic
//! mis-transcriptions ("proberty", "haf any uzzer"). The normalizer applies
//! a static lowercase dictionary of substring substitutions, in sorted key
//! order so outputs are reproducible run to run.
//!
//! Substring replacement is deliberately blunt, so a safety gate guards
//! against corrupting a clean transcript: when the corrected word count
//! drifts more than ±20 % from the original, or more than 10 distinct
//! corrections fire, the original transcript is returned unchanged.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Maximum distinct corrections before the transcript counts as corrupted.
const MAX_CORRECTIONS: usize = 10;
/// Maximum relative word-count drift after correction.
const MAX_WORD_COUNT_DRIFT: f64 = 0.20;

/// Accent correction dictionary, lowercase to lowercase.
///
/// BTreeMap iteration is the deterministic application order. Ordering is
/// load-bearing for at least one pair: "srough" must apply before "sru"
/// would otherwise split it ("sru" -> "through" inside "srough" yields
/// "throughugh"); lexicographic order happens to apply "srough" first.
static PHONETIC_CORRECTIONS: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        // Property & real estate
        ("proberty", "property"),
        ("broberty", "property"),
        ("probirty", "property"),
        ("brobirty", "property"),
        ("propirty", "property"),
        ("broperty", "property"),
        ("bropertiz", "properties"),
        ("istate", "estate"),
        ("esteyt", "estate"),
        ("isteit", "estate"),
        ("seling", "selling"),
        ("sellink", "selling"),
        ("sillink", "selling"),
        ("sellling", "selling"),
        ("baying", "buying"),
        ("bayink", "buying"),
        ("byink", "buying"),
        ("hawse", "house"),
        ("howse", "house"),
        ("howsiz", "houses"),
        ("adress", "address"),
        ("adres", "address"),
        ("addriss", "address"),
        // Common verbs
        ("rimember", "remember"),
        ("remimber", "remember"),
        ("rememper", "remember"),
        ("rimemper", "remember"),
        ("bilive", "believe"),
        ("beleef", "believe"),
        ("bileef", "believe"),
        ("anderstand", "understand"),
        ("ondirstand", "understand"),
        ("andarstand", "understand"),
        ("understend", "understand"),
        ("rebresent", "represent"),
        ("reprezent", "represent"),
        ("ripresent", "represent"),
        ("rebrizent", "represent"),
        ("tink", "think"),
        ("teenk", "think"),
        ("srough", "through"),
        ("sru", "through"),
        ("taik", "take"),
        ("teyk", "take"),
        ("tayk", "take"),
        ("geev", "give"),
        ("geif", "give"),
        ("haf", "have"),
        ("heff", "have"),
        // Offers and money
        ("ofir", "offer"),
        ("offar", "offer"),
        ("kash", "cash"),
        ("kesh", "cash"),
        ("brice", "price"),
        ("pryce", "price"),
        ("prise", "price"),
        ("negoshiate", "negotiate"),
        ("negosheble", "negotiable"),
        ("negoshable", "negotiable"),
        ("komission", "commission"),
        ("comition", "commission"),
        ("clozing", "closing"),
        ("klosing", "closing"),
        ("klozing", "closing"),
        // Pronouns and articles
        ("thiss", "this"),
        ("ziss", "this"),
        ("diss", "this"),
        ("deez", "these"),
        ("zeez", "these"),
        ("doze", "those"),
        ("zoze", "those"),
        ("zeir", "their"),
        ("zair", "their"),
        ("dair", "their"),
        ("dere", "there"),
        ("zere", "there"),
        ("uzzer", "other"),
        ("uzer", "other"),
        ("odder", "other"),
        ("othir", "other"),
        ("azzer", "other"),
        ("ozer", "other"),
        ("anuzzer", "another"),
        ("anuther", "another"),
        ("anudder", "another"),
        ("anozzer", "another"),
        ("anadder", "another"),
        // Function words
        ("weeth", "with"),
        ("wizin", "within"),
        ("widin", "within"),
        ("witheen", "within"),
        ("withen", "within"),
        ("yoor", "your"),
        ("nawt", "not"),
        ("naat", "not"),
        ("nott", "not"),
        // Qualities
        ("berfect", "perfect"),
        ("pirfect", "perfect"),
        ("parfect", "perfect"),
        ("berfict", "perfect"),
        ("perfict", "perfect"),
        ("broblem", "problem"),
        ("probelem", "problem"),
        ("brobelem", "problem"),
        ("problim", "problem"),
        ("fuchure", "future"),
        ("fyucher", "future"),
        ("fucher", "future"),
        ("fewcher", "future"),
        ("fyutcher", "future"),
        ("abowt", "about"),
        ("abaut", "about"),
        ("imbertan", "important"),
        ("imbortan", "important"),
        ("embortant", "important"),
        ("importent", "important"),
        ("intrist", "interest"),
        ("enterest", "interest"),
        ("interist", "interest"),
        ("becuz", "because"),
        ("bicuz", "because"),
        ("becoz", "because"),
        ("bikuz", "because"),
        ("wuld", "would"),
        ("woud", "would"),
        ("shuld", "should"),
        ("shoud", "should"),
        ("meybi", "maybe"),
        ("maybi", "maybe"),
        ("meyby", "maybe"),
        ("somting", "something"),
        ("sumting", "something"),
        ("somtink", "something"),
        ("samthing", "something"),
        ("everyting", "everything"),
        ("evryting", "everything"),
        ("evrything", "everything"),
        ("ivriting", "everything"),
        ("anyting", "anything"),
        ("enyting", "anything"),
        ("anytink", "anything"),
        ("inithing", "anything"),
        // Question words
        ("whin", "when"),
        ("wair", "where"),
        ("waat", "what"),
        ("mouch", "much"),
        ("mutch", "much"),
        ("sutch", "such"),
        ("taim", "time"),
        ("tyme", "time"),
        ("teim", "time"),
        ("minit", "minute"),
        ("minut", "minute"),
        ("minet", "minute"),
        // Calls and contact
        ("reech", "reach"),
        ("ritch", "reach"),
        ("riach", "reach"),
        ("kolbak", "callback"),
        ("callbak", "callback"),
        ("kolback", "callback"),
        ("kalbek", "callback"),
        ("foun", "phone"),
        ("fone", "phone"),
        ("nomber", "number"),
        ("namber", "number"),
        ("nember", "number"),
        ("numbir", "number"),
        // Authority and paperwork
        ("osorized", "authorized"),
        ("athorized", "authorized"),
        ("osoreyzed", "authorized"),
        ("autherized", "authorized"),
        ("sained", "signed"),
        ("syned", "signed"),
        ("seined", "signed"),
        ("signet", "signed"),
        ("kontract", "contract"),
        ("contrak", "contract"),
        ("kentract", "contract"),
        ("contrect", "contract"),
        ("riltor", "realtor"),
        ("reeltor", "realtor"),
        ("rialtor", "realtor"),
        ("realter", "realtor"),
        ("eksbert", "expert"),
        ("exbert", "expert"),
        ("exburt", "expert"),
        ("ekspurt", "expert"),
        // Places and zoning
        ("erya", "area"),
        ("areya", "area"),
        ("bisnes", "business"),
        ("bizness", "business"),
        ("besnes", "business"),
        ("besniss", "business"),
        ("restorant", "restaurant"),
        ("resturant", "restaurant"),
        ("ristorant", "restaurant"),
        ("restrant", "restaurant"),
        ("multibel", "multiple"),
        ("maltibel", "multiple"),
        ("multibul", "multiple"),
        ("multipel", "multiple"),
        ("lokal", "local"),
        ("lokul", "local"),
        ("locul", "local"),
        ("yutilities", "utilities"),
        ("utilitees", "utilities"),
        ("yutiliteez", "utilities"),
        ("uteleties", "utilities"),
        ("watar", "water"),
        ("wadir", "water"),
        ("elektrisity", "electricity"),
        ("electrisity", "electricity"),
        ("ilektrisity", "electricity"),
        ("elektricity", "electricity"),
        ("zouned", "zoned"),
        ("zonet", "zoned"),
        ("agrikulcher", "agriculture"),
        ("agreekulture", "agriculture"),
        ("agrikulchur", "agriculture"),
        ("agreculture", "agriculture"),
        ("indastrial", "industrial"),
        ("endestrial", "industrial"),
        ("industriyal", "industrial"),
        ("rezidential", "residential"),
        ("residenshal", "residential"),
        ("rezedential", "residential"),
        ("residenchul", "residential"),
        ("komershal", "commercial"),
        ("commerchul", "commercial"),
        ("komercial", "commercial"),
        ("comercial", "commercial"),
        ("aksess", "access"),
        // Discourse markers
        ("olways", "always"),
        ("olweys", "always"),
        ("alwayz", "always"),
        ("olweyz", "always"),
        ("olrait", "alright"),
        ("alrayt", "alright"),
        ("olright", "alright"),
        ("greit", "great"),
        ("grayt", "great"),
        ("okey", "okay"),
        ("okai", "okay"),
        ("okeh", "okay"),
        ("sory", "sorry"),
        ("sorrey", "sorry"),
        ("sorey", "sorry"),
        ("flexibel", "flexible"),
        ("flexeble", "flexible"),
        ("flixible", "flexible"),
        ("flexibul", "flexible"),
        ("workink", "working"),
        ("warking", "working"),
        ("workeng", "working"),
        ("arownd", "around"),
        ("araund", "around"),
        ("erround", "around"),
        ("holdink", "holding"),
        ("houlding", "holding"),
        ("hoaldink", "holding"),
        ("houldenk", "holding"),
        ("nifer", "never"),
        ("nefer", "never"),
        ("nevir", "never"),
        ("nevar", "never"),
        ("efer", "ever"),
        ("efir", "ever"),
        ("evar", "ever"),
    ])
});

/// Applied corrections: dictionary key to replacement.
pub type CorrectionsMade = Vec<(&'static str, &'static str)>;

/// Accent-correcting transcript normalizer.
pub struct PhoneticNormalizer {
    enabled: bool,
}

impl PhoneticNormalizer {
    /// Create a normalizer; a disabled one passes transcripts through.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Number of dictionary entries.
    pub fn dictionary_size() -> usize {
        PHONETIC_CORRECTIONS.len()
    }

    /// Apply corrections with the safety gate.
    ///
    /// Returns the corrected transcript and the list of corrections that
    /// fired. When the gate trips, the original transcript comes back with
    /// an empty correction list.
    pub fn apply(&self, transcript: &str) -> (String, CorrectionsMade) {
        if !self.enabled || transcript.is_empty() {
            return (transcript.to_string(), Vec::new());
        }

        let mut corrected = transcript.to_string();
        let mut corrections: CorrectionsMade = Vec::new();

        for (&wrong, &right) in PHONETIC_CORRECTIONS.iter() {
            if corrected.contains(wrong) {
                corrected = corrected.replace(wrong, right);
                corrections.push((wrong, right));
            }
        }

        if corrections.len() > MAX_CORRECTIONS {
            log::debug!(
                "[PhoneticNormalizer] gate tripped: {} corrections fired",
                corrections.len()
            );
            return (transcript.to_string(), Vec::new());
        }

        let original_words = transcript.split_whitespace().count();
        let corrected_words = corrected.split_whitespace().count();
        if original_words > 0 {
            let drift = (corrected_words as f64 - original_words as f64).abs()
                / original_words as f64;
            if drift > MAX_WORD_COUNT_DRIFT {
                log::debug!(
                    "[PhoneticNormalizer] gate tripped: word count drift {:.0}%",
                    drift * 100.0
                );
                return (transcript.to_string(), Vec::new());
            }
        }

        (corrected, corrections)
    }
}
