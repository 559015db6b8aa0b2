//! Aggregation view integration tests: flagged/all/error views and the
//! output column contract.

use callaudit::cli::table::create_results_table;
use callaudit::core::aggregate::{all_rows, error_rows, flagged_rows, is_flagged};
use callaudit::core::report::{
    CheckScore, Detection, FileResult, IntroScores, RebuttalVerdict,
};

fn result(
    releasing: Detection,
    late_hello: Detection,
    rebuttal: RebuttalVerdict,
    success: bool,
) -> FileResult {
    FileResult {
        agent_name: "Dana Reyes".into(),
        phone_number: "5553331111".into(),
        timestamp: "2024-05-01 2:15PM".into(),
        disposition: "Contact".into(),
        dialer_name: Some("CallTools".into()),
        file_path: "/calls/x.wav".into(),
        releasing,
        late_hello,
        rebuttal,
        rebuttal_confidence: Some(0.8),
        transcript: "hello this is dana".into(),
        intro_scores: Some(IntroScores {
            agent_intro: CheckScore::yes(),
            owner_name: CheckScore::no(),
            property_ref: CheckScore::yes(),
            rebuttal: match rebuttal {
                RebuttalVerdict::Yes => CheckScore::yes(),
                _ => CheckScore::no(),
            },
            late_hello: match late_hello {
                Detection::No => CheckScore::inverted_pass(),
                _ => CheckScore::inverted_fail(),
            },
            releasing: match releasing {
                Detection::No => CheckScore::inverted_pass(),
                _ => CheckScore::inverted_fail(),
            },
        }),
        classification_success: success,
        processing_time_ms: 2_000,
        error: if success { None } else { Some("decode failed".into()) },
        extra: Default::default(),
    }
}

#[test]
fn test_flagged_view_keeps_only_problem_calls() {
    let results = vec![
        // Clean call with a rebuttal: not flagged
        result(Detection::No, Detection::No, RebuttalVerdict::Yes, true),
        // Missed rebuttal: flagged
        result(Detection::No, Detection::No, RebuttalVerdict::No, true),
        // Releasing: flagged
        result(Detection::Yes, Detection::No, RebuttalVerdict::Yes, true),
        // Late hello: flagged
        result(Detection::No, Detection::Yes, RebuttalVerdict::Yes, true),
    ];
    assert_eq!(flagged_rows(&results).len(), 3);
    assert_eq!(all_rows(&results).len(), 4);
}

#[test]
fn test_failed_classifications_excluded_from_both_views() {
    let results = vec![
        result(Detection::No, Detection::No, RebuttalVerdict::No, false),
        result(Detection::No, Detection::No, RebuttalVerdict::No, true),
    ];
    assert_eq!(flagged_rows(&results).len(), 1);
    assert_eq!(all_rows(&results).len(), 1);
    assert_eq!(error_rows(&results).len(), 1);
}

#[test]
fn test_flag_predicate() {
    assert!(is_flagged(&result(
        Detection::Yes,
        Detection::No,
        RebuttalVerdict::Yes,
        true
    )));
    assert!(!is_flagged(&result(
        Detection::No,
        Detection::No,
        RebuttalVerdict::Yes,
        true
    )));
    // Lite rows never count as missed rebuttals
    assert!(!is_flagged(&result(
        Detection::No,
        Detection::No,
        RebuttalVerdict::NotApplicable,
        true
    )));
}

#[test]
fn test_rendered_table_contract() {
    let rows = all_rows(&[result(
        Detection::No,
        Detection::No,
        RebuttalVerdict::Yes,
        true,
    )]);
    let table = create_results_table(rows);

    for column in [
        "Agent Name",
        "Phone Number",
        "Timestamp",
        "Disposition",
        "Dialer Name",
        "Releasing Detection",
        "Late Hello Detection",
        "Rebuttal Detection",
        "Transcription",
        "Agent Intro",
        "Owner Name",
        "Reason for calling",
        "Intro Score",
        "Status",
    ] {
        assert!(table.contains(column), "missing column {}", column);
    }
    assert!(table.contains("Dana Reyes"));
    assert!(table.contains("CallTools"));
    // 5 of 6 checks pass: 83% Excellent
    assert!(table.contains("83%"));
    assert!(table.contains("Excellent"));
}

#[test]
fn test_error_rows_render_error_status() {
    let rows = error_rows(&[result(
        Detection::No,
        Detection::No,
        RebuttalVerdict::No,
        false,
    )]);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, "Error");
    // Filename-derived fields survive for triage
    assert_eq!(rows[0].agent_name, "Dana Reyes");
}
