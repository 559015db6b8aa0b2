//! The `audit` command: run the batch engine over a folder and print the
//! tabular views.

use crate::cli::{AuditArgs, create_progress_bar, print_success, print_warning};
use crate::config::ConfigService;
use crate::core::ComponentFactory;
use crate::core::aggregate::{all_rows, error_rows, flagged_rows};
use crate::core::batch::ProcessFolderOptions;
use crate::core::naming::parse_file_metadata;
use crate::services::vad::analyze_audio;
use crate::{Result, cli::table::create_results_table};
use log::info;
use std::sync::Arc;

/// Execute the audit command.
///
/// # Errors
///
/// Fails when the folder is unreadable or the engine cannot be
/// constructed; per-file failures become error rows instead.
pub async fn execute(args: AuditArgs, config_service: &dyn ConfigService) -> Result<()> {
    let factory = ComponentFactory::new(config_service)?;
    let engine = if args.lite {
        factory.create_lite_batch_engine()?
    } else {
        factory.create_batch_engine()?
    };

    let files = engine.find_audio_files(&args.path)?;
    if files.is_empty() {
        print_warning(&format!(
            "No supported audio files under {}",
            args.path.display()
        ));
        return Ok(());
    }
    info!("Auditing {} files under {:?}", files.len(), args.path);

    if args.debug_audio {
        print_audio_diagnostics(&factory, &files)?;
    }

    let progress_bar = if args.quiet {
        None
    } else {
        Some(create_progress_bar(files.len() as u64))
    };
    let progress_for_engine = progress_bar.clone().map(|pb| {
        Arc::new(move |done: usize, _total: usize| {
            pb.set_position(done as u64);
        }) as crate::core::batch::ProgressCallback
    });

    let options = ProcessFolderOptions {
        lite: args.lite,
        max_workers: args.max_workers,
        progress: progress_for_engine,
        ..Default::default()
    };
    let results = engine.process_folder(&args.path, &options).await?;
    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    let rows = if args.all_results {
        all_rows(&results)
    } else {
        flagged_rows(&results)
    };
    if rows.is_empty() {
        print_success("No flagged calls");
    } else {
        println!("{}", create_results_table(rows));
    }

    let errors = error_rows(&results);
    if !errors.is_empty() {
        print_warning(&format!("{} files failed processing:", errors.len()));
        println!("{}", create_results_table(errors));
    }

    let flagged = results
        .iter()
        .filter(|r| r.classification_success)
        .filter(|r| crate::core::aggregate::is_flagged(r))
        .count();
    print_success(&format!(
        "Processed {} files ({} flagged)",
        results.len(),
        flagged
    ));
    Ok(())
}

fn print_audio_diagnostics(
    factory: &ComponentFactory,
    files: &[std::path::PathBuf],
) -> Result<()> {
    let pipeline = factory.create_audio_pipeline()?;
    let config = factory.config();
    for path in files {
        let metadata = parse_file_metadata(path);
        match pipeline.load_call(path) {
            Ok(call) => {
                let diag = analyze_audio(
                    &call.agent,
                    &metadata.agent_name,
                    &config.vad,
                    &config.late_hello,
                );
                println!(
                    "{}: {:.1}s, {} segments ({:.0}% speech), first onset {:?}, \
                     releasing={}, late_hello={}",
                    path.display(),
                    diag.duration_seconds,
                    diag.segment_count,
                    diag.speech_percentage,
                    diag.first_onset_ms,
                    diag.releasing,
                    diag.late_hello
                );
            }
            Err(e) => {
                print_warning(&format!("{}: {}", path.display(), e));
            }
        }
    }
    Ok(())
}
