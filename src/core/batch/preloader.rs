//! Model preloader: single-flight warm-up before a batch run.
//!
//! Loads the phrase embedding index (which exercises the embedder) and
//! probes the transcriber, in parallel, exactly once per process even when
//! multiple batch runs race into it.

use crate::services::rebuttal::PhraseRepository;
use crate::services::transcriber::Transcriber;
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

/// Single-flight warm-up of the detection models.
pub struct ModelPreloader {
    repository: Arc<PhraseRepository>,
    transcriber: Arc<dyn Transcriber>,
    loaded: OnceCell<bool>,
}

impl ModelPreloader {
    /// Create a preloader over the shared components.
    pub fn new(repository: Arc<PhraseRepository>, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            repository,
            transcriber,
            loaded: OnceCell::new(),
        }
    }

    /// Warm everything up; concurrent callers share one warm-up.
    ///
    /// Returns `true` when every component loaded. Failures are logged and
    /// leave the pipeline on its degraded paths (exact-only matching, per-
    /// file transcriber errors) rather than blocking the batch.
    pub async fn preload_all(&self) -> bool {
        *self
            .loaded
            .get_or_init(|| async {
                info!("[ModelPreloader] warming up models");
                let start = Instant::now();

                let (index_result, transcriber_result) =
                    tokio::join!(self.repository.refresh(), self.transcriber.warm_up());

                let mut success = true;
                if let Err(e) = index_result {
                    warn!("[ModelPreloader] phrase index warm-up failed: {}", e);
                    success = false;
                }
                if let Err(e) = transcriber_result {
                    warn!("[ModelPreloader] transcriber warm-up failed: {}", e);
                    success = false;
                }

                if success {
                    info!(
                        "[ModelPreloader] all models ready in {:.2}s",
                        start.elapsed().as_secs_f64()
                    );
                } else {
                    warn!(
                        "[ModelPreloader] degraded warm-up after {:.2}s",
                        start.elapsed().as_secs_f64()
                    );
                }
                success
            })
            .await
    }

    /// Whether a warm-up already completed.
    pub fn is_loaded(&self) -> bool {
        self.loaded.get().copied().unwrap_or(false)
    }
}
