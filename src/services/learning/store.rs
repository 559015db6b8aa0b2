//! SQLite-backed phrase learning store.
//!
//! Single-connection store guarded by a mutex; dedup relies on a SQL
//! uniqueness check over `lower(trim(phrase))` for pending rows and a
//! `(category, phrase)` constraint for the approved repository. Quality
//! scores, canonical forms and adaptive thresholds are cached in memory
//! with the TTLs the review workflow expects.

use crate::config::LearningConfig;
use crate::services::learning::{
    HIGH_PRIORITY_CONFIDENCE, HIGH_PRIORITY_QUALITY, MAX_CONTEXT_CHARS, PendingPhrase,
    PendingStatus, QualityInputs, RepositoryStats, canonical_form, quality_score, truncate_phrase,
};
use crate::services::rebuttal::chunker::is_polite_closing;
use crate::services::rebuttal::matcher::{MatchObserver, ObserveOutcome, SemanticObservation};
use crate::services::rebuttal::repository::LearnedPhraseSource;
use crate::{Result, error::AuditError};
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

/// TTL for cached quality scores.
const QUALITY_CACHE_TTL_SECS: i64 = 3600;
/// TTL for cached adaptive thresholds.
const THRESHOLD_CACHE_TTL_SECS: i64 = 604_800;

/// Base adaptive thresholds per category.
fn base_threshold(category: &str) -> f64 {
    match category {
        "OTHER_PROPERTY_FAMILY" => 0.88,
        "MIXED_FUTURE_OTHER_FAMILY" => 0.85,
        _ => 0.80,
    }
}

/// SQLite-backed learning store.
pub struct PhraseLearningStore {
    conn: Mutex<Connection>,
    config: LearningConfig,
    canonical_cache: Mutex<HashMap<String, String>>,
    quality_cache: Mutex<HashMap<String, (f64, DateTime<Utc>)>>,
    threshold_cache: Mutex<HashMap<String, (f64, DateTime<Utc>)>>,
}

impl PhraseLearningStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, LearningConfig::default())
    }

    /// Open with explicit learning configuration.
    pub fn open_with_config(path: &Path, config: LearningConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, config)
    }

    /// In-memory store for tests.
    pub fn open_in_memory(config: LearningConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, config)
    }

    fn with_connection(conn: Connection, config: LearningConfig) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS pending_phrases (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 phrase TEXT NOT NULL,
                 category TEXT NOT NULL,
                 confidence REAL NOT NULL,
                 detection_count INTEGER NOT NULL DEFAULT 1,
                 first_detected TEXT NOT NULL,
                 last_detected TEXT NOT NULL,
                 sample_contexts TEXT NOT NULL DEFAULT '',
                 similar_to TEXT NOT NULL DEFAULT '',
                 quality_score REAL NOT NULL DEFAULT 0,
                 canonical_form TEXT NOT NULL DEFAULT '',
                 status TEXT NOT NULL DEFAULT 'pending'
             );
             CREATE UNIQUE INDEX IF NOT EXISTS idx_pending_unique
                 ON pending_phrases (LOWER(TRIM(phrase))) WHERE status = 'pending';
             CREATE TABLE IF NOT EXISTS repository_phrases (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 category TEXT NOT NULL,
                 phrase TEXT NOT NULL,
                 source TEXT NOT NULL DEFAULT 'manual',
                 usage_count INTEGER NOT NULL DEFAULT 0,
                 successful_detections INTEGER NOT NULL DEFAULT 0,
                 effectiveness_score REAL,
                 added_at TEXT NOT NULL,
                 UNIQUE (category, phrase)
             );
             CREATE TABLE IF NOT EXISTS phrase_blacklist (
                 phrase TEXT NOT NULL,
                 category TEXT NOT NULL,
                 reason TEXT NOT NULL DEFAULT '',
                 rejected_at TEXT NOT NULL,
                 UNIQUE (phrase, category)
             );
             CREATE TABLE IF NOT EXISTS category_performance (
                 category TEXT PRIMARY KEY,
                 approval_rate REAL,
                 avg_quality_score REAL,
                 total_phrases INTEGER NOT NULL DEFAULT 0,
                 updated_at TEXT NOT NULL
             );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            config,
            canonical_cache: Mutex::new(HashMap::new()),
            quality_cache: Mutex::new(HashMap::new()),
            threshold_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Canonical form with the per-input cache.
    pub fn canonical_form_cached(&self, phrase: &str) -> String {
        let key = phrase.to_lowercase().trim().to_string();
        {
            let cache = self.canonical_cache.lock().unwrap();
            if let Some(cached) = cache.get(&key) {
                return cached.clone();
            }
        }
        let canonical = canonical_form(phrase);
        self.canonical_cache
            .lock()
            .unwrap()
            .insert(key, canonical.clone());
        canonical
    }

    /// Quality score with the 1-hour TTL cache keyed by (id, confidence).
    pub fn quality_score_cached(&self, row_key: &str, inputs: &QualityInputs) -> f64 {
        let now = Utc::now();
        let cache_key = format!("{}_{}", row_key, inputs.confidence);
        {
            let cache = self.quality_cache.lock().unwrap();
            if let Some((score, cached_at)) = cache.get(&cache_key) {
                if (now - *cached_at).num_seconds() < QUALITY_CACHE_TTL_SECS {
                    return *score;
                }
            }
        }
        let score = quality_score(inputs, now);
        self.quality_cache
            .lock()
            .unwrap()
            .insert(cache_key, (score, now));
        score
    }

    /// Adaptive per-category approval threshold with a 7-day cache.
    ///
    /// Base thresholds shift down 0.02 when the category's historical
    /// approval rate exceeds 0.95 and up 0.02 when it falls under 0.80.
    pub fn adaptive_threshold(&self, category: &str) -> f64 {
        let now = Utc::now();
        {
            let cache = self.threshold_cache.lock().unwrap();
            if let Some((threshold, cached_at)) = cache.get(category) {
                if (now - *cached_at).num_seconds() < THRESHOLD_CACHE_TTL_SECS {
                    return *threshold;
                }
            }
        }

        let mut threshold = base_threshold(category);
        let lookup: Result<Option<f64>> = (|| {
            let conn = self.conn.lock().unwrap();
            let rate = conn
                .query_row(
                    "SELECT approval_rate FROM category_performance WHERE category = ?1",
                    params![category],
                    |row| row.get::<_, Option<f64>>(0),
                )
                .optional()?
                .flatten();
            Ok(rate)
        })();
        if let Ok(Some(approval_rate)) = lookup {
            if approval_rate > 0.95 {
                threshold -= 0.02;
            } else if approval_rate < 0.80 {
                threshold += 0.02;
            }
        }

        self.threshold_cache
            .lock()
            .unwrap()
            .insert(category.to_string(), (threshold, now));
        threshold
    }

    /// The track-semantic-match write path.
    ///
    /// Pre-filters, dedups by `lower(trim(phrase))` alone, inserts or
    /// merges, and fires the auto-approval triggers. Returns what happened
    /// so the caller can schedule a repository refresh after an approval.
    pub fn track_semantic_match(&self, observation: &SemanticObservation) -> Result<ObserveOutcome> {
        if observation.confidence < self.config.confidence_threshold {
            return Ok(ObserveOutcome::default());
        }

        let clean_phrase = observation.phrase.to_lowercase().trim().to_string();
        let clean_category = observation.category.trim().to_string();
        if clean_phrase.len() < 3 {
            return Ok(ObserveOutcome::default());
        }
        if is_polite_closing(&clean_phrase) {
            return Ok(ObserveOutcome::default());
        }
        let clean_phrase = truncate_phrase(&clean_phrase);

        if self.is_blacklisted(&clean_phrase, &clean_category)? {
            debug!("[learning] blacklisted, skipping: '{}'", clean_phrase);
            return Ok(ObserveOutcome::default());
        }
        if self.exists_in_repository(&clean_phrase, &clean_category)? {
            return Ok(ObserveOutcome::default());
        }

        let context: String = observation.context.chars().take(MAX_CONTEXT_CHARS).collect();
        let now = Utc::now();
        let normalized = clean_phrase.to_lowercase().trim().to_string();

        let existing = {
            let conn = self.conn.lock().unwrap();
            conn.query_row(
                "SELECT id, detection_count, confidence, sample_contexts, category
                 FROM pending_phrases
                 WHERE LOWER(TRIM(phrase)) = ?1 AND status = 'pending'
                 ORDER BY confidence DESC, detection_count DESC
                 LIMIT 1",
                params![normalized],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?
        };

        let outcome = if let Some((id, count, existing_conf, existing_ctx, existing_cat)) = existing
        {
            // Merge into the existing row: max confidence, bumped count,
            // joined context
            let new_count = count + 1;
            let new_confidence = existing_conf.max(observation.confidence as f64);
            let merged_context = merge_contexts(&existing_ctx, &context);
            let inputs = QualityInputs {
                confidence: new_confidence as f32,
                detection_count: new_count,
                last_detected: now,
                context_chars: merged_context.len(),
            };
            let score = self.quality_score_cached(&id.to_string(), &inputs);
            let canonical = self.canonical_form_cached(&clean_phrase);

            {
                let conn = self.conn.lock().unwrap();
                conn.execute(
                    "UPDATE pending_phrases
                     SET detection_count = ?1, confidence = ?2, last_detected = ?3,
                         sample_contexts = ?4, quality_score = ?5, canonical_form = ?6
                     WHERE id = ?7",
                    params![
                        new_count,
                        new_confidence,
                        now.to_rfc3339(),
                        merged_context,
                        score,
                        canonical,
                        id
                    ],
                )?;
            }

            let auto_approved = self.maybe_auto_approve(
                id,
                &clean_phrase,
                &existing_cat,
                new_confidence as f32,
                score,
                new_count,
            )?;
            ObserveOutcome {
                recorded: true,
                auto_approved,
            }
        } else {
            let inputs = QualityInputs {
                confidence: observation.confidence,
                detection_count: 1,
                last_detected: now,
                context_chars: context.len(),
            };
            let score = self.quality_score_cached("new", &inputs);
            let canonical = self.canonical_form_cached(&clean_phrase);

            let id = {
                let conn = self.conn.lock().unwrap();
                conn.execute(
                    "INSERT INTO pending_phrases
                     (phrase, category, confidence, detection_count, first_detected,
                      last_detected, sample_contexts, similar_to, quality_score, canonical_form)
                     VALUES (?1, ?2, ?3, 1, ?4, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        clean_phrase,
                        clean_category,
                        observation.confidence as f64,
                        now.to_rfc3339(),
                        context,
                        observation.similar_to,
                        score,
                        canonical
                    ],
                )?;
                conn.last_insert_rowid()
            };

            let auto_approved = self.maybe_auto_approve(
                id,
                &clean_phrase,
                &clean_category,
                observation.confidence,
                score,
                1,
            )?;
            ObserveOutcome {
                recorded: true,
                auto_approved,
            }
        };

        debug!(
            "[learning] tracked '{}' in {} (confidence {:.3})",
            clean_phrase, clean_category, observation.confidence
        );
        Ok(outcome)
    }

    /// Auto-approval triggers.
    ///
    /// High priority: confidence or quality at least 0.90, no frequency
    /// requirement. Standard: confidence at least the configured
    /// auto-approve threshold with the frequency requirement met.
    fn maybe_auto_approve(
        &self,
        id: i64,
        phrase: &str,
        category: &str,
        confidence: f32,
        quality: f64,
        detection_count: u32,
    ) -> Result<bool> {
        let high_priority =
            confidence >= HIGH_PRIORITY_CONFIDENCE || quality >= HIGH_PRIORITY_QUALITY;
        let standard = confidence >= self.config.auto_approve_threshold
            && detection_count >= self.config.frequency_threshold;
        if !(high_priority || standard) {
            return Ok(false);
        }

        self.finalize_approval(id, phrase, category, PendingStatus::AutoApproved, "auto_learned")?;
        info!("[learning] auto-approved '{}' in {}", phrase, category);
        Ok(true)
    }

    fn finalize_approval(
        &self,
        id: i64,
        phrase: &str,
        category: &str,
        status: PendingStatus,
        source: &str,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE pending_phrases SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )?;
            conn.execute(
                "INSERT INTO repository_phrases (category, phrase, source, added_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (category, phrase) DO NOTHING",
                params![category, phrase, source, now],
            )?;
        }
        self.update_category_performance(category)?;
        Ok(())
    }

    /// Manually approve a pending row.
    ///
    /// # Errors
    ///
    /// Fails when the id does not exist or is not pending.
    pub fn approve_phrase(&self, id: i64) -> Result<PendingPhrase> {
        let row = self
            .pending_by_id(id)?
            .ok_or_else(|| AuditError::store(format!("No pending phrase with id {}", id)))?;
        if row.status != PendingStatus::Pending {
            return Err(AuditError::store(format!(
                "Phrase {} is not pending (status {})",
                id,
                row.status.as_str()
            )));
        }
        self.finalize_approval(
            id,
            &row.phrase,
            &row.category,
            PendingStatus::Approved,
            "admin_approved",
        )?;
        info!("[learning] approved '{}' in {}", row.phrase, row.category);
        Ok(row)
    }

    /// Reject a pending row and blacklist the phrase.
    pub fn reject_phrase(&self, id: i64, reason: &str) -> Result<PendingPhrase> {
        let row = self
            .pending_by_id(id)?
            .ok_or_else(|| AuditError::store(format!("No pending phrase with id {}", id)))?;
        let now = Utc::now().to_rfc3339();
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE pending_phrases SET status = 'rejected' WHERE id = ?1",
                params![id],
            )?;
            conn.execute(
                "INSERT INTO phrase_blacklist (phrase, category, reason, rejected_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (phrase, category) DO UPDATE SET reason = ?3, rejected_at = ?4",
                params![row.phrase, row.category, reason, now],
            )?;
        }
        self.update_category_performance(&row.category)?;
        info!("[learning] rejected '{}' ({})", row.phrase, reason);
        Ok(row)
    }

    /// Add a phrase straight to the approved repository.
    pub fn add_phrase_manually(&self, category: &str, phrase: &str) -> Result<()> {
        let clean = truncate_phrase(phrase.to_lowercase().trim());
        if clean.len() < 3 {
            return Err(AuditError::store("Phrase too short"));
        }
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT INTO repository_phrases (category, phrase, source, added_at)
             VALUES (?1, ?2, 'manual', ?3)
             ON CONFLICT (category, phrase) DO NOTHING",
            params![category, clean, now],
        )?;
        if inserted == 0 {
            return Err(AuditError::store(format!(
                "Phrase already exists in {}",
                category
            )));
        }
        Ok(())
    }

    /// Pending rows with the given status, after opportunistic duplicate
    /// cleanup.
    pub fn pending_phrases(&self, status: PendingStatus) -> Result<Vec<PendingPhrase>> {
        self.cleanup_duplicates()?;
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, phrase, category, confidence, detection_count, first_detected,
                    last_detected, sample_contexts, similar_to, quality_score, canonical_form,
                    status
             FROM pending_phrases WHERE status = ?1
             ORDER BY quality_score DESC, detection_count DESC",
        )?;
        let rows = stmt
            .query_map(params![status.as_str()], row_to_pending)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Track usage/success of an approved phrase.
    ///
    /// Invariant preserved: `successful_detections <= usage_count`.
    pub fn track_phrase_effectiveness(
        &self,
        phrase: &str,
        category: &str,
        was_successful: bool,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE repository_phrases
             SET usage_count = usage_count + 1,
                 successful_detections = successful_detections + ?1,
                 effectiveness_score = CAST(successful_detections + ?1 AS REAL)
                     / (usage_count + 1)
             WHERE phrase = ?2 AND category = ?3",
            params![if was_successful { 1 } else { 0 }, phrase, category],
        )?;
        Ok(())
    }

    /// Aggregate statistics for the phrases CLI.
    pub fn stats(&self) -> Result<RepositoryStats> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) FROM repository_phrases GROUP BY category ORDER BY category",
        )?;
        let approved_by_category = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM pending_phrases GROUP BY status ORDER BY status",
        )?;
        let pending_by_status = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let blacklisted =
            conn.query_row("SELECT COUNT(*) FROM phrase_blacklist", [], |row| row.get(0))?;

        let settled: (u32, u32) = conn.query_row(
            "SELECT
                 SUM(CASE WHEN status IN ('approved', 'auto_approved') THEN 1 ELSE 0 END),
                 SUM(CASE WHEN status = 'rejected' THEN 1 ELSE 0 END)
             FROM pending_phrases",
            [],
            |row| {
                Ok((
                    row.get::<_, Option<u32>>(0)?.unwrap_or(0),
                    row.get::<_, Option<u32>>(1)?.unwrap_or(0),
                ))
            },
        )?;
        let total_settled = settled.0 + settled.1;
        let approval_rate = if total_settled > 0 {
            Some(settled.0 as f64 / total_settled as f64)
        } else {
            None
        };

        Ok(RepositoryStats {
            approved_by_category,
            pending_by_status,
            blacklisted,
            approval_rate,
        })
    }

    /// Remove duplicate pending rows sharing `lower(trim(phrase))` across
    /// categories: keep the best `(confidence, detection_count)` row, merge
    /// counts and contexts into it, delete the rest.
    pub fn cleanup_duplicates(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT LOWER(TRIM(phrase)) AS key, COUNT(*) AS n
             FROM pending_phrases WHERE status = 'pending'
             GROUP BY key HAVING n > 1",
        )?;
        let duplicate_keys: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);

        let mut removed = 0;
        for key in duplicate_keys {
            let mut stmt = conn.prepare(
                "SELECT id, detection_count, sample_contexts
                 FROM pending_phrases
                 WHERE LOWER(TRIM(phrase)) = ?1 AND status = 'pending'
                 ORDER BY confidence DESC, detection_count DESC",
            )?;
            let rows: Vec<(i64, u32, String)> = stmt
                .query_map(params![key], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            drop(stmt);

            let Some((keep_id, keep_count, keep_ctx)) = rows.first().cloned() else {
                continue;
            };
            let mut merged_count = keep_count;
            let mut merged_ctx = keep_ctx;
            for (dup_id, dup_count, dup_ctx) in rows.iter().skip(1) {
                merged_count += dup_count;
                merged_ctx = merge_contexts(&merged_ctx, dup_ctx);
                conn.execute("DELETE FROM pending_phrases WHERE id = ?1", params![dup_id])?;
                removed += 1;
            }
            conn.execute(
                "UPDATE pending_phrases SET detection_count = ?1, sample_contexts = ?2
                 WHERE id = ?3",
                params![merged_count, merged_ctx, keep_id],
            )?;
        }
        if removed > 0 {
            debug!("[learning] cleanup removed {} duplicate pending rows", removed);
        }
        Ok(removed)
    }

    fn pending_by_id(&self, id: i64) -> Result<Option<PendingPhrase>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, phrase, category, confidence, detection_count, first_detected,
                        last_detected, sample_contexts, similar_to, quality_score,
                        canonical_form, status
                 FROM pending_phrases WHERE id = ?1",
                params![id],
                row_to_pending,
            )
            .optional()?;
        Ok(row)
    }

    fn is_blacklisted(&self, phrase: &str, category: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let found = conn
            .query_row(
                "SELECT 1 FROM phrase_blacklist WHERE phrase = ?1 AND category = ?2",
                params![phrase, category],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn exists_in_repository(&self, phrase: &str, category: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let found = conn
            .query_row(
                "SELECT 1 FROM repository_phrases
                 WHERE LOWER(TRIM(phrase)) = LOWER(TRIM(?1)) AND category = ?2",
                params![phrase, category],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn update_category_performance(&self, category: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let (approved, rejected, avg_quality): (u32, u32, Option<f64>) = conn.query_row(
            "SELECT
                 SUM(CASE WHEN status IN ('approved', 'auto_approved') THEN 1 ELSE 0 END),
                 SUM(CASE WHEN status = 'rejected' THEN 1 ELSE 0 END),
                 AVG(quality_score)
             FROM pending_phrases WHERE category = ?1",
            params![category],
            |row| {
                Ok((
                    row.get::<_, Option<u32>>(0)?.unwrap_or(0),
                    row.get::<_, Option<u32>>(1)?.unwrap_or(0),
                    row.get::<_, Option<f64>>(2)?,
                ))
            },
        )?;
        let settled = approved + rejected;
        let approval_rate = if settled > 0 {
            Some(approved as f64 / settled as f64)
        } else {
            None
        };
        conn.execute(
            "INSERT INTO category_performance
                 (category, approval_rate, avg_quality_score, total_phrases, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (category) DO UPDATE SET
                 approval_rate = ?2, avg_quality_score = ?3, total_phrases = ?4, updated_at = ?5",
            params![category, approval_rate, avg_quality, settled, now],
        )?;
        Ok(())
    }
}

impl MatchObserver for PhraseLearningStore {
    fn observe(&self, observation: SemanticObservation) -> ObserveOutcome {
        // Best-effort: detection never fails on a store error
        match self.track_semantic_match(&observation) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("[learning] failed to track semantic match: {}", e);
                ObserveOutcome::default()
            }
        }
    }
}

impl LearnedPhraseSource for PhraseLearningStore {
    fn approved_phrases(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT category, phrase FROM repository_phrases ORDER BY category, phrase")?;
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (category, phrase) = row?;
            grouped.entry(category).or_default().push(phrase);
        }
        Ok(grouped)
    }
}

fn merge_contexts(existing: &str, new: &str) -> String {
    let merged = if !existing.is_empty() && !new.is_empty() {
        format!("{} | {}", existing, new)
    } else if !existing.is_empty() {
        existing.to_string()
    } else {
        new.to_string()
    };
    merged.chars().take(MAX_CONTEXT_CHARS).collect()
}

fn row_to_pending(row: &rusqlite::Row<'_>) -> std::result::Result<PendingPhrase, rusqlite::Error> {
    let first: String = row.get(5)?;
    let last: String = row.get(6)?;
    let status: String = row.get(11)?;
    Ok(PendingPhrase {
        id: row.get(0)?,
        phrase: row.get(1)?,
        category: row.get(2)?,
        confidence: row.get::<_, f64>(3)? as f32,
        detection_count: row.get(4)?,
        first_detected: parse_timestamp(&first),
        last_detected: parse_timestamp(&last),
        sample_contexts: row.get(7)?,
        similar_to: row.get(8)?,
        quality_score: row.get(9)?,
        canonical_form: row.get(10)?,
        status: PendingStatus::parse(&status).unwrap_or(PendingStatus::Pending),
    })
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PhraseLearningStore {
        PhraseLearningStore::open_in_memory(LearningConfig::default()).unwrap()
    }

    fn observation(phrase: &str, category: &str, confidence: f32) -> SemanticObservation {
        SemanticObservation {
            phrase: phrase.to_string(),
            category: category.to_string(),
            confidence,
            context: format!("context for {}", phrase),
            similar_to: "any other property".to_string(),
        }
    }

    #[test]
    fn test_low_confidence_not_recorded() {
        let s = store();
        let outcome = s
            .track_semantic_match(&observation("any spare houses", "OTHER_PROPERTY_FAMILY", 0.5))
            .unwrap();
        assert!(!outcome.recorded);
        assert!(s.pending_phrases(PendingStatus::Pending).unwrap().is_empty());
    }

    #[test]
    fn test_insert_and_merge_dedup_by_phrase_alone() {
        let s = store();
        // Same phrase observed across two categories merges into one row
        s.track_semantic_match(&observation("any spare houses", "A", 0.86))
            .unwrap();
        s.track_semantic_match(&observation("any spare houses", "B", 0.88))
            .unwrap();
        s.track_semantic_match(&observation("Any Spare Houses", "A", 0.87))
            .unwrap();

        let pending = s.pending_phrases(PendingStatus::Pending).unwrap();
        assert_eq!(pending.len(), 1);
        let row = &pending[0];
        assert_eq!(row.detection_count, 3);
        assert!((row.confidence - 0.88).abs() < 1e-6);
        assert!(row.sample_contexts.contains(" | "));
    }

    #[test]
    fn test_polite_closing_rejected() {
        let s = store();
        let outcome = s
            .track_semantic_match(&observation("thank you have a great day", "A", 0.9))
            .unwrap();
        assert!(!outcome.recorded);
    }

    #[test]
    fn test_short_phrase_rejected() {
        let s = store();
        let outcome = s.track_semantic_match(&observation("ok", "A", 0.9)).unwrap();
        assert!(!outcome.recorded);
    }

    #[test]
    fn test_long_phrase_truncated_to_twenty_words() {
        let s = store();
        let long_phrase = (0..25).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ");
        s.track_semantic_match(&observation(&long_phrase, "A", 0.86))
            .unwrap();
        let pending = s.pending_phrases(PendingStatus::Pending).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].phrase.split_whitespace().count(), 20);
    }

    #[test]
    fn test_high_priority_auto_approval() {
        let s = store();
        let outcome = s
            .track_semantic_match(&observation("any extra parcels to sell", "A", 0.92))
            .unwrap();
        assert!(outcome.auto_approved);

        // Approved phrases are visible to the repository loader
        let approved = s.approved_phrases().unwrap();
        assert!(approved["A"].contains(&"any extra parcels to sell".to_string()));

        // And future observations of the same phrase short-circuit
        let outcome = s
            .track_semantic_match(&observation("any extra parcels to sell", "A", 0.95))
            .unwrap();
        assert!(!outcome.recorded);
    }

    #[test]
    fn test_standard_auto_approval_needs_frequency() {
        let mut config = LearningConfig::default();
        config.confidence_threshold = 0.85;
        config.auto_approve_threshold = 0.87;
        config.frequency_threshold = 3;
        let s = PhraseLearningStore::open_in_memory(config).unwrap();

        // 0.88 is above the standard threshold but below high priority;
        // needs three detections
        let o = observation("any further buildings for sale", "A", 0.88);
        assert!(!s.track_semantic_match(&o).unwrap().auto_approved);
        assert!(!s.track_semantic_match(&o).unwrap().auto_approved);
        let third = s.track_semantic_match(&o).unwrap();
        assert!(third.auto_approved);
    }

    #[test]
    fn test_manual_approval_flow() {
        let s = store();
        s.track_semantic_match(&observation("any spare houses", "A", 0.86))
            .unwrap();
        let pending = s.pending_phrases(PendingStatus::Pending).unwrap();
        let id = pending[0].id;

        let row = s.approve_phrase(id).unwrap();
        assert_eq!(row.phrase, "any spare houses");
        assert!(s.pending_phrases(PendingStatus::Pending).unwrap().is_empty());
        assert!(s.approved_phrases().unwrap()["A"].contains(&"any spare houses".to_string()));

        // Double approval fails
        assert!(s.approve_phrase(id).is_err());
    }

    #[test]
    fn test_rejection_blacklists() {
        let s = store();
        s.track_semantic_match(&observation("any spare houses", "A", 0.86))
            .unwrap();
        let id = s.pending_phrases(PendingStatus::Pending).unwrap()[0].id;
        s.reject_phrase(id, "not a rebuttal").unwrap();

        // Future observations short-circuit on the blacklist
        let outcome = s
            .track_semantic_match(&observation("any spare houses", "A", 0.89))
            .unwrap();
        assert!(!outcome.recorded);

        let stats = s.stats().unwrap();
        assert_eq!(stats.blacklisted, 1);
    }

    #[test]
    fn test_add_phrase_manually_enforces_uniqueness() {
        let s = store();
        s.add_phrase_manually("A", "brand new phrase").unwrap();
        assert!(s.add_phrase_manually("A", "brand new phrase").is_err());
        // Same phrase, different category is allowed
        s.add_phrase_manually("B", "brand new phrase").unwrap();
    }

    #[test]
    fn test_effectiveness_tracking_invariant() {
        let s = store();
        s.add_phrase_manually("A", "tracked phrase").unwrap();
        s.track_phrase_effectiveness("tracked phrase", "A", true).unwrap();
        s.track_phrase_effectiveness("tracked phrase", "A", false).unwrap();
        s.track_phrase_effectiveness("tracked phrase", "A", true).unwrap();

        let conn = s.conn.lock().unwrap();
        let (usage, successes): (u32, u32) = conn
            .query_row(
                "SELECT usage_count, successful_detections FROM repository_phrases
                 WHERE phrase = 'tracked phrase'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(usage, 3);
        assert_eq!(successes, 2);
        assert!(successes <= usage);
    }

    #[test]
    fn test_adaptive_threshold_bases() {
        let s = store();
        assert!((s.adaptive_threshold("OTHER_PROPERTY_FAMILY") - 0.88).abs() < 1e-9);
        assert!((s.adaptive_threshold("MIXED_FUTURE_OTHER_FAMILY") - 0.85).abs() < 1e-9);
        assert!((s.adaptive_threshold("ANYTHING_ELSE") - 0.80).abs() < 1e-9);
    }

    #[test]
    fn test_adaptive_threshold_shifts_with_performance() {
        let s = store();
        {
            let conn = s.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO category_performance
                     (category, approval_rate, avg_quality_score, total_phrases, updated_at)
                 VALUES ('HOT', 0.98, 0.9, 40, ?1), ('COLD', 0.5, 0.4, 40, ?1)",
                params![Utc::now().to_rfc3339()],
            )
            .unwrap();
        }
        assert!((s.adaptive_threshold("HOT") - 0.78).abs() < 1e-9);
        assert!((s.adaptive_threshold("COLD") - 0.82).abs() < 1e-9);
    }

    #[test]
    fn test_cleanup_merges_cross_category_duplicates() {
        let s = store();
        // Bypass track_semantic_match dedup by inserting directly, which is
        // what legacy data looks like
        {
            let conn = s.conn.lock().unwrap();
            let now = Utc::now().to_rfc3339();
            conn.execute_batch(&format!(
                "DROP INDEX idx_pending_unique;
                 INSERT INTO pending_phrases
                     (phrase, category, confidence, detection_count, first_detected,
                      last_detected, sample_contexts)
                 VALUES
                     ('dup phrase', 'A', 0.9, 2, '{now}', '{now}', 'ctx a'),
                     ('dup phrase', 'B', 0.87, 5, '{now}', '{now}', 'ctx b'),
                     ('dup phrase ', 'C', 0.86, 1, '{now}', '{now}', 'ctx c');"
            ))
            .unwrap();
        }

        let removed = s.cleanup_duplicates().unwrap();
        assert_eq!(removed, 2);

        let pending = s.pending_phrases(PendingStatus::Pending).unwrap();
        assert_eq!(pending.len(), 1);
        let survivor = &pending[0];
        // Highest confidence row survived with merged counts and contexts
        assert_eq!(survivor.category, "A");
        assert_eq!(survivor.detection_count, 8);
        assert!(survivor.sample_contexts.contains("ctx b"));
        assert!(survivor.sample_contexts.contains("ctx c"));
    }

    #[test]
    fn test_context_capped_at_500_chars() {
        let s = store();
        let mut o = observation("any spare houses", "A", 0.86);
        o.context = "x".repeat(600);
        s.track_semantic_match(&o).unwrap();
        let mut o2 = observation("any spare houses", "A", 0.86);
        o2.context = "y".repeat(600);
        s.track_semantic_match(&o2).unwrap();

        let pending = s.pending_phrases(PendingStatus::Pending).unwrap();
        assert!(pending[0].sample_contexts.len() <= MAX_CONTEXT_CHARS);
    }

    #[test]
    fn test_canonical_form_stored() {
        let s = store();
        s.track_semantic_match(&observation(
            "okay would you consider selling you know",
            "A",
            0.86,
        ))
        .unwrap();
        let pending = s.pending_phrases(PendingStatus::Pending).unwrap();
        assert_eq!(pending[0].canonical_form, "would you consider selling");
    }
}
