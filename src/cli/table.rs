//! Table formatting utilities for displaying structured CLI output.
//!
//! Renders the audit result rows and the pending-phrase review queue with
//! a consistent rounded-border style that works in both light and dark
//! terminal themes.

use crate::core::aggregate::ResultRow;
use crate::services::learning::{PendingPhrase, QualityTier};
use tabled::settings::{Alignment, Modify, Style, object::Rows};
use tabled::{Table, Tabled};

/// Create the audit result table.
///
/// # Examples
///
/// ```rust,ignore
/// let table = create_results_table(rows);
/// println!("{}", table);
/// ```
///
/// Empty input yields a header-only table.
pub fn create_results_table(rows: Vec<ResultRow>) -> String {
    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::left()));
    table.to_string()
}

/// Display row for the pending phrase review queue.
#[derive(Tabled)]
pub struct PendingPhraseRow {
    /// Row id used by approve/reject.
    #[tabled(rename = "ID")]
    pub id: i64,
    /// The candidate phrase.
    #[tabled(rename = "Phrase")]
    pub phrase: String,
    /// Category it matched into.
    #[tabled(rename = "Category")]
    pub category: String,
    /// Best observed confidence.
    #[tabled(rename = "Confidence")]
    pub confidence: String,
    /// Merged detection count.
    #[tabled(rename = "Detections")]
    pub detections: u32,
    /// Quality score and tier label.
    #[tabled(rename = "Quality")]
    pub quality: String,
}

impl PendingPhraseRow {
    /// Build a display row from a store row.
    pub fn from_pending(phrase: &PendingPhrase) -> Self {
        Self {
            id: phrase.id,
            phrase: phrase.phrase.clone(),
            category: phrase.category.clone(),
            confidence: format!("{:.2}", phrase.confidence),
            detections: phrase.detection_count,
            quality: format!(
                "{:.2} ({})",
                phrase.quality_score,
                QualityTier::from_score(phrase.quality_score).label()
            ),
        }
    }
}

/// Create the pending phrase review table.
pub fn create_pending_table(rows: Vec<PendingPhraseRow>) -> String {
    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::left()));
    table.to_string()
}
