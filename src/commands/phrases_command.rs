//! The `phrases` command: review queue, approvals, rejections and
//! repository statistics.

use crate::cli::table::{PendingPhraseRow, create_pending_table};
use crate::cli::{PhrasesAction, PhrasesArgs, print_success, print_warning};
use crate::config::ConfigService;
use crate::core::ComponentFactory;
use crate::services::learning::PendingStatus;
use crate::{Result, error::AuditError};

/// Execute the phrases command.
pub async fn execute(args: PhrasesArgs, config_service: &dyn ConfigService) -> Result<()> {
    let factory = ComponentFactory::new(config_service)?;
    let store = factory.create_learning_store()?;

    match args.action {
        PhrasesAction::List { status } => {
            let parsed = PendingStatus::parse(&status).ok_or_else(|| {
                AuditError::CommandExecution(format!("Unknown status: {}", status))
            })?;
            let phrases = store.pending_phrases(parsed)?;
            if phrases.is_empty() {
                print_warning(&format!("No {} phrases", status));
                return Ok(());
            }
            let rows: Vec<PendingPhraseRow> =
                phrases.iter().map(PendingPhraseRow::from_pending).collect();
            println!("{}", create_pending_table(rows));
        }
        PhrasesAction::Approve { id } => {
            let row = store.approve_phrase(id)?;
            refresh_repository(&factory, &store).await;
            print_success(&format!(
                "Approved '{}' into {}",
                row.phrase, row.category
            ));
        }
        PhrasesAction::ApproveCategory { category } => {
            let threshold = store.adaptive_threshold(&category);
            let pending = store.pending_phrases(PendingStatus::Pending)?;
            let mut approved = 0;
            for row in pending
                .iter()
                .filter(|p| p.category == category && p.quality_score >= threshold)
            {
                store.approve_phrase(row.id)?;
                approved += 1;
            }
            if approved > 0 {
                refresh_repository(&factory, &store).await;
            }
            print_success(&format!(
                "Approved {} phrases in {} (quality threshold {:.2})",
                approved, category, threshold
            ));
        }
        PhrasesAction::Reject { id, reason } => {
            let row = store.reject_phrase(id, &reason)?;
            print_success(&format!("Rejected and blacklisted '{}'", row.phrase));
        }
        PhrasesAction::Add { category, phrase } => {
            store.add_phrase_manually(&category, &phrase)?;
            refresh_repository(&factory, &store).await;
            print_success(&format!("Added '{}' to {}", phrase, category));
        }
        PhrasesAction::Stats => {
            let stats = store.stats()?;
            println!("Approved learned phrases:");
            if stats.approved_by_category.is_empty() {
                println!("  (none)");
            }
            for (category, count) in &stats.approved_by_category {
                println!("  {:<36} {}", category, count);
            }
            println!("Pending queue:");
            if stats.pending_by_status.is_empty() {
                println!("  (empty)");
            }
            for (status, count) in &stats.pending_by_status {
                println!("  {:<36} {}", status, count);
            }
            println!("Blacklisted phrases: {}", stats.blacklisted);
            if let Some(rate) = stats.approval_rate {
                println!("Approval rate: {:.0}%", rate * 100.0);
            }
        }
    }
    Ok(())
}

/// Rebuild the semantic index after repository changes; best-effort since
/// the embedder may be offline during review sessions.
async fn refresh_repository(
    factory: &ComponentFactory,
    store: &std::sync::Arc<crate::services::learning::PhraseLearningStore>,
) {
    let embedder = match factory.create_embedder() {
        Ok(embedder) => embedder,
        Err(e) => {
            print_warning(&format!("Semantic index not refreshed: {}", e));
            return;
        }
    };
    let repository = factory.create_repository(embedder, store.clone());
    if let Err(e) = repository.refresh().await {
        print_warning(&format!("Semantic index refresh failed: {}", e));
    }
}
