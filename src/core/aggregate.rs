//! Tabular aggregation of per-file results.
//!
//! Two primary views over raw [`FileResult`]s: the flagged-only view
//! (releasing, late hello, or a missed rebuttal) and the all-results view.
//! Both exclude failed classifications; error rows get their own view so
//! failed files stay visible for retry and triage.

use crate::core::report::{CheckDisplay, Detection, FileResult, RebuttalVerdict};
use tabled::Tabled;

/// One display row of the audit table. Column names are part of the
/// output contract.
#[derive(Debug, Clone, Tabled)]
pub struct ResultRow {
    /// Agent display name.
    #[tabled(rename = "Agent Name")]
    pub agent_name: String,
    /// Phone number.
    #[tabled(rename = "Phone Number")]
    pub phone_number: String,
    /// Call timestamp.
    #[tabled(rename = "Timestamp")]
    pub timestamp: String,
    /// Call disposition.
    #[tabled(rename = "Disposition")]
    pub disposition: String,
    /// Dialer name, empty when unknown.
    #[tabled(rename = "Dialer Name")]
    pub dialer_name: String,
    /// Releasing verdict.
    #[tabled(rename = "Releasing Detection")]
    pub releasing: String,
    /// Late-hello verdict.
    #[tabled(rename = "Late Hello Detection")]
    pub late_hello: String,
    /// Rebuttal verdict.
    #[tabled(rename = "Rebuttal Detection")]
    pub rebuttal: String,
    /// Agent transcript.
    #[tabled(rename = "Transcription")]
    pub transcription: String,
    /// Agent intro check.
    #[tabled(rename = "Agent Intro")]
    pub agent_intro: String,
    /// Owner name check.
    #[tabled(rename = "Owner Name")]
    pub owner_name: String,
    /// Property reference check.
    #[tabled(rename = "Reason for calling")]
    pub reason_for_calling: String,
    /// Intro score percentage.
    #[tabled(rename = "Intro Score")]
    pub intro_score: String,
    /// Call status.
    #[tabled(rename = "Status")]
    pub status: String,
}

impl ResultRow {
    fn from_result(result: &FileResult) -> Self {
        let (agent_intro, owner_name, reason_for_calling) = match &result.intro_scores {
            Some(scores) => (
                scores.agent_intro.display.to_string(),
                scores.owner_name.display.to_string(),
                scores.property_ref.display.to_string(),
            ),
            None => (
                CheckDisplay::NotApplicable.to_string(),
                CheckDisplay::NotApplicable.to_string(),
                CheckDisplay::NotApplicable.to_string(),
            ),
        };
        Self {
            agent_name: result.agent_name.clone(),
            phone_number: result.phone_number.clone(),
            timestamp: result.timestamp.clone(),
            disposition: result.disposition.clone(),
            dialer_name: result.dialer_name.clone().unwrap_or_default(),
            releasing: result.releasing.to_string(),
            late_hello: result.late_hello.to_string(),
            rebuttal: result.rebuttal.to_string(),
            transcription: result.transcript.clone(),
            agent_intro,
            owner_name,
            reason_for_calling,
            intro_score: result.intro_score_display(),
            status: result.status().to_string(),
        }
    }
}

/// Whether a result carries a call-quality flag: releasing, late hello, or
/// a missed rebuttal.
pub fn is_flagged(result: &FileResult) -> bool {
    result.releasing == Detection::Yes
        || result.late_hello == Detection::Yes
        || result.rebuttal == RebuttalVerdict::No
}

/// Flagged-only view over successful results.
pub fn flagged_rows(results: &[FileResult]) -> Vec<ResultRow> {
    results
        .iter()
        .filter(|r| r.classification_success)
        .filter(|r| is_flagged(r))
        .map(ResultRow::from_result)
        .collect()
}

/// All successful results.
pub fn all_rows(results: &[FileResult]) -> Vec<ResultRow> {
    results
        .iter()
        .filter(|r| r.classification_success)
        .map(ResultRow::from_result)
        .collect()
}

/// Failed files, kept out of the main views but visible for triage.
pub fn error_rows(results: &[FileResult]) -> Vec<ResultRow> {
    results
        .iter()
        .filter(|r| !r.classification_success)
        .map(ResultRow::from_result)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::{CheckScore, IntroScores};

    fn result(
        releasing: Detection,
        late_hello: Detection,
        rebuttal: RebuttalVerdict,
        success: bool,
    ) -> FileResult {
        FileResult {
            agent_name: "John Smith".into(),
            phone_number: "5551234567".into(),
            timestamp: "2024-03-14 9:45AM".into(),
            disposition: "No Answer".into(),
            dialer_name: Some("ReadyMode".into()),
            file_path: "/calls/a.wav".into(),
            releasing,
            late_hello,
            rebuttal,
            rebuttal_confidence: None,
            transcript: "hello".into(),
            intro_scores: Some(IntroScores {
                agent_intro: CheckScore::yes(),
                owner_name: CheckScore::no(),
                property_ref: CheckScore::no(),
                rebuttal: CheckScore::no(),
                late_hello: CheckScore::inverted_pass(),
                releasing: CheckScore::inverted_pass(),
            }),
            classification_success: success,
            processing_time_ms: 1000,
            error: if success { None } else { Some("boom".into()) },
            extra: Default::default(),
        }
    }

    #[test]
    fn test_flagging_rules() {
        assert!(is_flagged(&result(
            Detection::Yes,
            Detection::No,
            RebuttalVerdict::Yes,
            true
        )));
        assert!(is_flagged(&result(
            Detection::No,
            Detection::Yes,
            RebuttalVerdict::Yes,
            true
        )));
        // A missed rebuttal is itself a flag
        assert!(is_flagged(&result(
            Detection::No,
            Detection::No,
            RebuttalVerdict::No,
            true
        )));
        assert!(!is_flagged(&result(
            Detection::No,
            Detection::No,
            RebuttalVerdict::Yes,
            true
        )));
        // N/A rebuttal (lite) is not a missed rebuttal
        assert!(!is_flagged(&result(
            Detection::No,
            Detection::No,
            RebuttalVerdict::NotApplicable,
            true
        )));
    }

    #[test]
    fn test_views_exclude_failures() {
        let results = vec![
            result(Detection::Yes, Detection::No, RebuttalVerdict::No, true),
            result(Detection::No, Detection::No, RebuttalVerdict::Yes, true),
            result(Detection::No, Detection::No, RebuttalVerdict::No, false),
        ];
        assert_eq!(flagged_rows(&results).len(), 1);
        assert_eq!(all_rows(&results).len(), 2);
        assert_eq!(error_rows(&results).len(), 1);
        assert_eq!(error_rows(&results)[0].status, "Error");
    }

    #[test]
    fn test_row_rendering() {
        let rows = all_rows(&[result(
            Detection::No,
            Detection::No,
            RebuttalVerdict::Yes,
            true,
        )]);
        let row = &rows[0];
        assert_eq!(row.agent_name, "John Smith");
        assert_eq!(row.dialer_name, "ReadyMode");
        assert_eq!(row.releasing, "No");
        assert_eq!(row.rebuttal, "Yes");
        assert_eq!(row.agent_intro, "Yes");
        assert_eq!(row.owner_name, "No");
        // 3 of 6 checks pass
        assert_eq!(row.intro_score, "50%");
        assert_eq!(row.status, "Good");
    }

    #[test]
    fn test_lite_row_renders_not_applicable() {
        let mut lite = result(
            Detection::No,
            Detection::No,
            RebuttalVerdict::NotApplicable,
            true,
        );
        lite.intro_scores = None;
        let rows = all_rows(&[lite]);
        let row = &rows[0];
        assert_eq!(row.rebuttal, "N/A");
        assert_eq!(row.agent_intro, "N/A");
        assert_eq!(row.intro_score, "N/A");
        assert_eq!(row.status, "Lite Completed");
    }
}
