//! Typed result model for per-file audit outcomes.
//!
//! Every detector verdict, intro check and call status is a closed enum so
//! the aggregator and the tests are total functions over the result space.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict of a boolean detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Detection {
    /// The condition was detected.
    Yes,
    /// The condition was not detected.
    No,
    /// The detector itself failed.
    Error,
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detection::Yes => write!(f, "Yes"),
            Detection::No => write!(f, "No"),
            Detection::Error => write!(f, "Error"),
        }
    }
}

/// Verdict of the rebuttal detector; `NotApplicable` appears in lite mode
/// where no transcription runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebuttalVerdict {
    /// An objection-handling phrase was found.
    Yes,
    /// No rebuttal found.
    No,
    /// Transcription or matching failed.
    Error,
    /// Rebuttal detection did not run.
    NotApplicable,
}

impl fmt::Display for RebuttalVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuttalVerdict::Yes => write!(f, "Yes"),
            RebuttalVerdict::No => write!(f, "No"),
            RebuttalVerdict::Error => write!(f, "Error"),
            RebuttalVerdict::NotApplicable => write!(f, "N/A"),
        }
    }
}

/// Display value of a single intro check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckDisplay {
    /// Check passed.
    Yes,
    /// Check failed.
    No,
    /// Check could not be evaluated.
    NotApplicable,
}

impl fmt::Display for CheckDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckDisplay::Yes => write!(f, "Yes"),
            CheckDisplay::No => write!(f, "No"),
            CheckDisplay::NotApplicable => write!(f, "N/A"),
        }
    }
}

/// One intro check: a display value and a 0/100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckScore {
    /// Display value for the tabular output.
    pub display: CheckDisplay,
    /// Score contribution, 0 or 100.
    pub score: u8,
}

impl CheckScore {
    /// A passed check.
    pub fn yes() -> Self {
        Self {
            display: CheckDisplay::Yes,
            score: 100,
        }
    }

    /// A failed check.
    pub fn no() -> Self {
        Self {
            display: CheckDisplay::No,
            score: 0,
        }
    }

    /// A passed check whose polarity is inverted for display (e.g. "late
    /// hello absent" displays `No` but scores 100).
    pub fn inverted_pass() -> Self {
        Self {
            display: CheckDisplay::No,
            score: 100,
        }
    }

    /// A failed inverted check (condition present): displays `Yes`, scores 0.
    pub fn inverted_fail() -> Self {
        Self {
            display: CheckDisplay::Yes,
            score: 0,
        }
    }

    /// An unevaluable check.
    pub fn not_applicable() -> Self {
        Self {
            display: CheckDisplay::NotApplicable,
            score: 0,
        }
    }
}

/// The six intro checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntroScores {
    /// Agent introduced themselves by name.
    pub agent_intro: CheckScore,
    /// Agent addressed the owner by name or respectfully.
    pub owner_name: CheckScore,
    /// Agent referenced the property.
    pub property_ref: CheckScore,
    /// Rebuttal was used.
    pub rebuttal: CheckScore,
    /// Late hello absent.
    pub late_hello: CheckScore,
    /// Releasing absent.
    pub releasing: CheckScore,
}

impl IntroScores {
    /// Intro score percentage: arithmetic mean of the six 0/100 scores.
    pub fn percentage(&self) -> f64 {
        let total = self.agent_intro.score as u32
            + self.owner_name.score as u32
            + self.property_ref.score as u32
            + self.rebuttal.score as u32
            + self.late_hello.score as u32
            + self.releasing.score as u32;
        total as f64 / 6.0
    }

    /// Call status derived from the intro score percentage.
    pub fn status(&self) -> CallStatus {
        CallStatus::from_score(self.percentage())
    }
}

/// Overall call quality status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallStatus {
    /// Intro score at least 83 %.
    Excellent,
    /// Intro score at least 50 %.
    Good,
    /// Intro score at least 17 %.
    NeedsTraining,
    /// Intro score below 17 %.
    Critical,
    /// Lite mode ran only the local detectors; no intro score exists.
    LiteCompleted,
    /// The file could not be processed.
    Error,
}

impl CallStatus {
    /// Map an intro score percentage to a status.
    pub fn from_score(percentage: f64) -> Self {
        if percentage >= 83.0 {
            CallStatus::Excellent
        } else if percentage >= 50.0 {
            CallStatus::Good
        } else if percentage >= 17.0 {
            CallStatus::NeedsTraining
        } else {
            CallStatus::Critical
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallStatus::Excellent => write!(f, "Excellent"),
            CallStatus::Good => write!(f, "Good"),
            CallStatus::NeedsTraining => write!(f, "Needs Training"),
            CallStatus::Critical => write!(f, "Critical"),
            CallStatus::LiteCompleted => write!(f, "Lite Completed"),
            CallStatus::Error => write!(f, "Error"),
        }
    }
}

/// Complete per-file audit result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    /// Agent display name from the filename grammar.
    pub agent_name: String,
    /// Phone number from the filename grammar.
    pub phone_number: String,
    /// Display timestamp from the filename grammar.
    pub timestamp: String,
    /// Call disposition from the filename grammar.
    pub disposition: String,
    /// Dialer name from the parent directory, when present.
    pub dialer_name: Option<String>,
    /// Source file path.
    pub file_path: String,
    /// Releasing detector verdict.
    pub releasing: Detection,
    /// Late-hello detector verdict.
    pub late_hello: Detection,
    /// Rebuttal detector verdict.
    pub rebuttal: RebuttalVerdict,
    /// Confidence of the winning rebuttal candidate.
    pub rebuttal_confidence: Option<f32>,
    /// Agent transcript (lowercased), empty when transcription did not run.
    pub transcript: String,
    /// The six intro checks, absent for error rows and lite mode.
    pub intro_scores: Option<IntroScores>,
    /// Whether the full classification pipeline succeeded.
    pub classification_success: bool,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
    /// Error description for failed or degraded files.
    pub error: Option<String>,
    /// Caller-supplied metadata attached to every result of a run.
    #[serde(default)]
    pub extra: std::collections::BTreeMap<String, String>,
}

impl FileResult {
    /// An error row carrying only filename-derived metadata.
    pub fn error_row(
        agent_name: String,
        phone_number: String,
        timestamp: String,
        disposition: String,
        dialer_name: Option<String>,
        file_path: String,
        error: String,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            agent_name,
            phone_number,
            timestamp,
            disposition,
            dialer_name,
            file_path,
            releasing: Detection::Error,
            late_hello: Detection::Error,
            rebuttal: RebuttalVerdict::Error,
            rebuttal_confidence: None,
            transcript: String::new(),
            intro_scores: None,
            classification_success: false,
            processing_time_ms,
            error: Some(error),
            extra: std::collections::BTreeMap::new(),
        }
    }

    /// Status for the tabular output.
    pub fn status(&self) -> CallStatus {
        if !self.classification_success {
            return CallStatus::Error;
        }
        match &self.intro_scores {
            Some(scores) => scores.status(),
            None => CallStatus::LiteCompleted,
        }
    }

    /// Intro score as a display percentage, e.g. `"67%"`.
    pub fn intro_score_display(&self) -> String {
        match &self.intro_scores {
            Some(scores) => format!("{:.0}%", scores.percentage()),
            None => "N/A".to_string(),
        }
    }
}
