//! Filename grammar integration tests.

use callaudit::core::naming::{
    extract_dialer_name, format_agent_name, format_timestamp_for_display, parse_file_metadata,
};
use std::path::PathBuf;

#[test]
fn test_full_dialer_export_stem() {
    let path = PathBuf::from(
        "/exports/Campaign South ReadyMode/MarkDavis _ 2024-06-02 10_15AM _ 5559871234 _ Voicemail.mp3",
    );
    let meta = parse_file_metadata(&path);
    assert_eq!(meta.agent_name, "Mark Davis");
    assert_eq!(meta.timestamp, "2024-06-02 10:15AM");
    assert_eq!(meta.phone_number, "5559871234");
    assert_eq!(meta.disposition, "Voicemail");
    assert_eq!(meta.dialer_name.as_deref(), Some("ReadyMode"));
}

#[test]
fn test_two_field_and_bare_stems() {
    let meta = parse_file_metadata(&PathBuf::from("/calls/LisaWong _ 5550001111.wav"));
    assert_eq!(meta.agent_name, "Lisa Wong");
    assert_eq!(meta.phone_number, "5550001111");
    assert!(meta.timestamp.is_empty());
    assert!(meta.disposition.is_empty());

    let meta = parse_file_metadata(&PathBuf::from("/calls/monday-batch-17.flac"));
    assert_eq!(meta.agent_name, "mondaybatch17");
    assert!(meta.phone_number.is_empty());
}

#[test]
fn test_delimiter_must_be_space_underscore_space() {
    // Plain underscores are not field delimiters; the stem stays one
    // agent field (and CamelCase spacing still applies)
    let meta = parse_file_metadata(&PathBuf::from("/calls/John_Smith_5551234.mp3"));
    assert_eq!(meta.phone_number, "");
    assert_eq!(meta.agent_name, "John_ Smith_5551234");
}

#[test]
fn test_agent_name_display_form() {
    assert_eq!(format_agent_name("AmirHassan"), "Amir Hassan");
    assert_eq!(format_agent_name("JDSalinger"), "J D Salinger");
    assert_eq!(format_agent_name("Already Spaced"), "Already Spaced");
}

#[rstest::rstest]
#[case("7_05PM", "7:05PM")]
#[case("2024-06-02 10_15am", "2024-06-02 10:15am")]
#[case("2024_06_02", "2024_06_02")] // non-time underscores survive
#[case("", "")]
fn test_timestamp_display_form(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(format_timestamp_for_display(input), expected);
}

#[test]
fn test_dialer_from_parent_folder() {
    assert_eq!(
        extract_dialer_name("North Team CallTools"),
        Some("CallTools".to_string())
    );
    assert_eq!(extract_dialer_name("exports"), None);
}

#[test]
fn test_three_field_stem_falls_back_to_bare() {
    // Neither 4 nor 2 fields: the whole stem becomes the agent
    let meta = parse_file_metadata(&PathBuf::from("/calls/A _ B _ C.mp3"));
    assert_eq!(meta.agent_name, "A _ B _ C");
    assert!(meta.phone_number.is_empty());
}
