//! Filename metadata grammar for call recordings.
//!
//! Dialer exports name recordings as
//! `<agent> _ <timestamp> _ <phone> _ <disposition>.<ext>` with a literal
//! space-underscore-space delimiter; older exports carry only
//! `<agent> _ <phone>` and ad-hoc uploads just a stem. The parent folder
//! ends with the dialer name after the last space.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Field delimiter in recording stems.
const FIELD_DELIMITER: &str = " _ ";

static TIME_DISPLAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<h>\d{1,2})_(?P<m>\d{2})(?P<ap>(?i:AM|PM))").unwrap());
static DIALER_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r".*\s(?P<dialer>\S+)$").unwrap());

/// Metadata parsed from a recording path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Agent display name with CamelCase runs spaced out.
    pub agent_name: String,
    /// Phone number field, empty when absent.
    pub phone_number: String,
    /// Display timestamp (`HH_MMam` rendered as `HH:MMam`), empty when absent.
    pub timestamp: String,
    /// Call disposition, empty when absent.
    pub disposition: String,
    /// Dialer name from the parent directory, when derivable.
    pub dialer_name: Option<String>,
}

/// Parse a recording path into display metadata.
pub fn parse_file_metadata(path: &Path) -> FileMetadata {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let parts: Vec<&str> = stem.split(FIELD_DELIMITER).collect();
    let (agent_raw, timestamp, phone_number, disposition) = match parts.as_slice() {
        [agent, timestamp, phone, disposition] => {
            (*agent, timestamp.to_string(), phone.to_string(), disposition.to_string())
        }
        [agent, phone] => (*agent, String::new(), phone.to_string(), String::new()),
        _ => (stem, String::new(), String::new(), String::new()),
    };

    let agent_cleaned = agent_raw.replace(['-', '.'], "");
    FileMetadata {
        agent_name: format_agent_name(&agent_cleaned),
        phone_number,
        timestamp: format_timestamp_for_display(&timestamp),
        disposition,
        dialer_name: path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .and_then(extract_dialer_name),
    }
}

/// Insert a space before every interior capital of a CamelCase run.
///
/// Names that already contain spaces are returned unchanged.
pub fn format_agent_name(agent_name: &str) -> String {
    if agent_name.contains(' ') {
        return agent_name.to_string();
    }
    let mut out = String::with_capacity(agent_name.len() + 4);
    for (i, c) in agent_name.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// Render `HH_MMam|pm` time fragments as `HH:MMam|pm`.
pub fn format_timestamp_for_display(timestamp: &str) -> String {
    if timestamp.trim().is_empty() {
        return timestamp.to_string();
    }
    TIME_DISPLAY
        .replace_all(timestamp, "${h}:${m}${ap}")
        .into_owned()
}

/// Extract the dialer name from a folder name: the suffix after the last
/// space. A folder name without spaces yields nothing.
pub fn extract_dialer_name(folder_name: &str) -> Option<String> {
    DIALER_SUFFIX
        .captures(folder_name)
        .map(|c| c["dialer"].to_string())
}
