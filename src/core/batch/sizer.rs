//! Adaptive batch sizing from system load, file sizes and throughput.
//!
//! Each batch run starts from a base size and scales it multiplicatively:
//! down under memory or CPU pressure, up on an idle host, down for large
//! files and slow rolling throughput, and down near the tail so the last
//! batches stay responsive to feedback. One instance per user run.

use log::{debug, warn};
use std::collections::VecDeque;
use std::path::PathBuf;
use sysinfo::System;

/// Lower bound for a batch.
const MIN_BATCH_SIZE: usize = 10;
/// Upper bound and base size for a batch.
const MAX_BATCH_SIZE: usize = 1000;
/// Memory usage fraction above which batches shrink.
const MEMORY_PRESSURE: f64 = 0.75;
/// CPU usage fraction above which batches shrink.
const CPU_PRESSURE: f64 = 0.80;
/// Rolling window of per-file processing times.
const HISTORY_WINDOW: usize = 20;
/// Sample at most this many files for the average-size rule.
const SIZE_SAMPLE_FILES: usize = 100;

/// Resource sample consumed by the sizing rules.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSample {
    /// Memory in use as a fraction of total.
    pub memory_used_fraction: f64,
    /// Available memory in GiB.
    pub available_memory_gb: f64,
    /// Global CPU usage as a fraction.
    pub cpu_used_fraction: f64,
}

/// Per-user adaptive batch sizer.
pub struct AdaptiveBatchSizer {
    system: System,
    processing_times: VecDeque<f64>,
}

impl AdaptiveBatchSizer {
    /// Create a sizer with an empty history.
    pub fn new() -> Self {
        Self {
            system: System::new(),
            processing_times: VecDeque::with_capacity(HISTORY_WINDOW),
        }
    }

    /// Compute the batch size for the next batch.
    ///
    /// `remaining` is the not-yet-submitted file list (only the first 100
    /// are stat'ed for the size rule).
    pub fn calculate(&mut self, remaining: &[PathBuf], completed: usize, total: usize) -> usize {
        let sample = self.sample_resources();
        let avg_file_size_mb = average_file_size_mb(remaining);
        let avg_processing_time = self.average_processing_time();
        let batch_size = compute_batch_size(
            sample,
            avg_file_size_mb,
            avg_processing_time,
            total.saturating_sub(completed),
        );
        debug!(
            "[AdaptiveBatchSizer] mem {:.0}%, cpu {:.0}%, avg file {:.1}MB, avg time {:?}s -> {}",
            sample.memory_used_fraction * 100.0,
            sample.cpu_used_fraction * 100.0,
            avg_file_size_mb,
            avg_processing_time,
            batch_size
        );
        batch_size
    }

    /// Record one per-file processing time (seconds), rolling window of 20.
    pub fn update_processing_time(&mut self, seconds: f64) {
        if self.processing_times.len() == HISTORY_WINDOW {
            self.processing_times.pop_front();
        }
        self.processing_times.push_back(seconds);
    }

    /// Rolling average processing time, when history exists.
    pub fn average_processing_time(&self) -> Option<f64> {
        if self.processing_times.is_empty() {
            return None;
        }
        Some(self.processing_times.iter().sum::<f64>() / self.processing_times.len() as f64)
    }

    /// Clear history at the start of a batch run.
    pub fn reset(&mut self) {
        self.processing_times.clear();
    }

    fn sample_resources(&mut self) -> ResourceSample {
        self.system.refresh_memory();
        self.system.refresh_cpu_usage();

        let total = self.system.total_memory() as f64;
        let used = self.system.used_memory() as f64;
        let available_gb = self.system.available_memory() as f64 / (1024.0 * 1024.0 * 1024.0);
        let memory_used_fraction = if total > 0.0 { used / total } else { 0.0 };

        let cpus = self.system.cpus();
        let cpu_used_fraction = if cpus.is_empty() {
            0.0
        } else {
            cpus.iter().map(|c| c.cpu_usage() as f64).sum::<f64>() / (cpus.len() as f64 * 100.0)
        };

        ResourceSample {
            memory_used_fraction,
            available_memory_gb: available_gb,
            cpu_used_fraction,
        }
    }
}

impl Default for AdaptiveBatchSizer {
    fn default() -> Self {
        Self::new()
    }
}

/// The pure sizing rules, separated from sampling for testability.
pub fn compute_batch_size(
    sample: ResourceSample,
    avg_file_size_mb: f64,
    avg_processing_time: Option<f64>,
    remaining: usize,
) -> usize {
    let mut batch_size = MAX_BATCH_SIZE as f64;

    // Memory: shrink under pressure, grow when plenty is free
    if sample.memory_used_fraction > MEMORY_PRESSURE {
        let reduction =
            (sample.memory_used_fraction - MEMORY_PRESSURE) / (1.0 - MEMORY_PRESSURE);
        batch_size *= 1.0 - reduction * 0.5;
    } else if sample.memory_used_fraction < 0.5 && sample.available_memory_gb > 4.0 {
        let increase = (0.5 - sample.memory_used_fraction) * 2.0;
        batch_size *= 1.0 + increase * 0.5;
    }

    // CPU: shrink when busy, grow when idle
    if sample.cpu_used_fraction > CPU_PRESSURE {
        let reduction = (sample.cpu_used_fraction - CPU_PRESSURE) / (1.0 - CPU_PRESSURE);
        batch_size *= 1.0 - reduction * 0.4;
    } else if sample.cpu_used_fraction < 0.5 {
        let increase = (0.5 - sample.cpu_used_fraction) * 2.0;
        batch_size *= 1.0 + increase * 0.3;
    }

    // File sizes: large recordings shrink the batch, small ones grow it
    if avg_file_size_mb > 10.0 {
        let reduction = ((avg_file_size_mb - 10.0) / 20.0).min(0.5);
        batch_size *= 1.0 - reduction;
    } else if avg_file_size_mb > 0.0 && avg_file_size_mb < 2.0 {
        let increase = ((2.0 - avg_file_size_mb) / 2.0).min(0.3);
        batch_size *= 1.0 + increase;
    }

    // Throughput: slow per-file times shrink the batch
    if let Some(avg_time) = avg_processing_time {
        if avg_time > 30.0 {
            let reduction = ((avg_time - 30.0) / 60.0).min(0.3);
            batch_size *= 1.0 - reduction;
        }
    }

    let mut batch_size = (batch_size as usize).clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);

    // Tail: near the end, halve the remainder instead of over-allocating
    if remaining < batch_size * 2 {
        batch_size = batch_size.min((remaining / 2).max(MIN_BATCH_SIZE));
    }

    batch_size
}

fn average_file_size_mb(files: &[PathBuf]) -> f64 {
    let sample: Vec<&PathBuf> = files.iter().take(SIZE_SAMPLE_FILES).collect();
    if sample.is_empty() {
        return 0.0;
    }
    let mut total_bytes = 0u64;
    let mut counted = 0usize;
    for path in &sample {
        match std::fs::metadata(path) {
            Ok(meta) => {
                total_bytes += meta.len();
                counted += 1;
            }
            Err(e) => {
                warn!("[AdaptiveBatchSizer] stat failed for {:?}: {}", path, e);
            }
        }
    }
    if counted == 0 {
        return 0.0;
    }
    total_bytes as f64 / counted as f64 / (1024.0 * 1024.0)
}
