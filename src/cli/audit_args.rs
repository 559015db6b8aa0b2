// src/cli/audit_args.rs
use clap::Args;
use std::path::PathBuf;

/// Folder audit parameters
#[derive(Args, Debug, Clone)]
pub struct AuditArgs {
    /// Folder containing call recordings
    pub path: PathBuf,

    /// Show every successful call, not just flagged ones
    #[arg(long)]
    pub all_results: bool,

    /// Lite mode: releasing and late-hello only, no transcription
    #[arg(long)]
    pub lite: bool,

    /// Worker-pool upper bound (overrides configuration)
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Print per-file audio diagnostics
    #[arg(long)]
    pub debug_audio: bool,

    /// Suppress the progress bar
    #[arg(long)]
    pub quiet: bool,
}

impl AuditArgs {
    /// Validate argument combinations before execution.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(workers) = self.max_workers {
            if workers == 0 {
                return Err("--max-workers must be at least 1".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> AuditArgs {
        AuditArgs {
            path: PathBuf::from("/calls"),
            all_results: false,
            lite: false,
            max_workers: None,
            debug_audio: false,
            quiet: false,
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(args().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut a = args();
        a.max_workers = Some(0);
        assert!(a.validate().is_err());
        a.max_workers = Some(4);
        assert!(a.validate().is_ok());
    }
}
