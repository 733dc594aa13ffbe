//! Age-based retention.
//!
//! The sweep walks the timestamp index from the oldest reading upwards and
//! deletes everything at or before `now - window`. It works in chunks: each
//! chunk is a single statement that picks the oldest `chunk_size` expired
//! ids and deletes them, and the writer is released between chunks so
//! ingestion is never held up for long. Because every chunk re-evaluates the
//! cutoff at the moment it runs, a reading inserted mid-sweep is only
//! removed if it is itself expired.
//!
//! The store has no scheduler. Callers invoke [`Store::sweep`] directly or
//! throttle it with [`Store::sweep_if_due`].

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::error::Result;
use crate::queries::encode_bound;
use crate::schema::IDX_TIMESTAMP;
use crate::store::Store;

/// Retention window in days.
pub const RETENTION_DAYS: i64 = 30;

/// Default number of readings deleted per chunk.
pub const DEFAULT_CHUNK_SIZE: u32 = 100;

/// Key in `store_meta` holding the time of the last completed sweep.
const LAST_SWEEP_KEY: &str = "last_sweep_at";

/// How much history to keep and how to delete the rest.
///
/// The writer is held for one chunk at a time, so with the default chunk
/// size a sweep may block ingestion for up to [`DEFAULT_CHUNK_SIZE`] deletes.
/// A chunk size of 1 releases the writer after every deleted reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Readings at or older than `now - window` are deleted.
    pub window: Duration,
    /// Readings deleted per writer lock acquisition.
    pub chunk_size: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            window: Duration::days(RETENTION_DAYS),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl RetentionPolicy {
    /// Set the chunk size (at least 1).
    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// The newest timestamp that is expired at `now`.
    pub fn cutoff(&self, now: OffsetDateTime) -> OffsetDateTime {
        now - self.window
    }
}

/// Outcome of a retention sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Readings at or before this instant were eligible for deletion.
    #[serde(with = "time::serde::rfc3339")]
    pub cutoff: OffsetDateTime,
    /// Readings deleted.
    pub deleted: u64,
    /// Chunks that deleted at least one reading.
    pub chunks: u32,
}

impl Store {
    /// Delete readings older than the 30 day retention window.
    ///
    /// Returns the number of readings deleted. Calling it again with nothing
    /// left to delete returns 0.
    pub fn sweep(&self, now: OffsetDateTime) -> Result<u64> {
        Ok(self.sweep_with(now, &RetentionPolicy::default())?.deleted)
    }

    /// Run a sweep with an explicit policy.
    ///
    /// If a chunk fails, the chunks before it stay deleted and the error is
    /// returned; every chunk is atomic, so the store is consistent either way.
    pub fn sweep_with(&self, now: OffsetDateTime, policy: &RetentionPolicy) -> Result<SweepReport> {
        let cutoff = policy.cutoff(now);
        let encoded_cutoff = encode_bound(cutoff);
        let chunk_size = policy.chunk_size.max(1);
        let sql = format!(
            "DELETE FROM readings WHERE id IN (
                 SELECT id FROM readings INDEXED BY {}
                 WHERE timestamp <= ?1
                 ORDER BY timestamp ASC, id ASC
                 LIMIT ?2
             )",
            IDX_TIMESTAMP
        );

        let mut report = SweepReport {
            cutoff,
            deleted: 0,
            chunks: 0,
        };

        loop {
            let removed = self.connections().with_writer(|conn| {
                Ok(conn.execute(&sql, rusqlite::params![encoded_cutoff, chunk_size])?)
            })?;

            if removed == 0 {
                break;
            }
            report.deleted += removed as u64;
            report.chunks += 1;
            debug!("Sweep chunk {} removed {} reading(s)", report.chunks, removed);

            if removed < chunk_size as usize {
                break;
            }
        }

        info!(
            "Retention sweep removed {} reading(s) at or before {}",
            report.deleted, cutoff
        );
        Ok(report)
    }

    /// Sweep unless the last sweep finished less than `min_interval` ago.
    ///
    /// Returns `None` when the sweep was skipped. The time of each completed
    /// sweep is persisted, so throttling survives restarts. A last-sweep time
    /// in the future (clock moved backwards) does not block sweeping.
    pub fn sweep_if_due(
        &self,
        now: OffsetDateTime,
        min_interval: Duration,
        policy: &RetentionPolicy,
    ) -> Result<Option<SweepReport>> {
        if let Some(last) = self.last_sweep_at()? {
            let elapsed = now - last;
            if elapsed >= Duration::ZERO && elapsed < min_interval {
                debug!("Skipping sweep, last one ran {} ago", elapsed);
                return Ok(None);
            }
        }

        let report = self.sweep_with(now, policy)?;
        self.set_meta(LAST_SWEEP_KEY, encode_bound(now))?;
        Ok(Some(report))
    }

    /// When the last throttled sweep completed, if ever.
    pub fn last_sweep_at(&self) -> Result<Option<OffsetDateTime>> {
        Ok(self
            .get_meta(LAST_SWEEP_KEY)?
            .and_then(crate::queries::decode_timestamp))
    }
}
