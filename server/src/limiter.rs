// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter for contact form submissions.
//!
//! Each submitter identifier owns one bucket `{window start, hits}`. A hit
//! is counted before the limit is checked, so the request that crosses the
//! limit is rejected and still counted. Windows are fixed, not sliding: up
//! to twice the limit can get through around a window boundary.
//!
//! Stores expose a single increment-and-fetch operation. The file store
//! holds an exclusive advisory lock on the bucket file for the whole
//! read-modify-write, so concurrent requests from one identifier cannot
//! lose updates. Store failures never fail a request; they are logged and
//! the hit is judged against a fresh bucket.

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Window length in seconds.
pub const WINDOW_SECS: i64 = 3600;

/// Memory store size above which expired buckets are dropped.
const MEMORY_PRUNE_THRESHOLD: usize = 10_000;

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Request is allowed
    Allowed {
        /// Remaining submissions in the current window
        remaining: u32,
        /// Time until the window resets
        reset_in: Duration,
    },
    /// Request is rate limited
    Denied {
        /// Time until the window resets
        retry_after: Duration,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// Persisted per-identifier counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBucket {
    #[serde(rename = "ts")]
    pub window_start: i64,
    #[serde(rename = "hits")]
    pub hit_count: u32,
}

impl RateBucket {
    pub fn fresh(now: i64) -> Self {
        Self {
            window_start: now,
            hit_count: 0,
        }
    }

    /// Whether the window covers `now`. A window that starts in the future
    /// is not current.
    pub fn is_current(&self, now: i64) -> bool {
        (0..WINDOW_SECS).contains(&now.saturating_sub(self.window_start))
    }

    /// Count one hit at `now`, starting a new window if the old one is over.
    pub fn hit(self, now: i64) -> Self {
        let base = if self.is_current(now) {
            self
        } else {
            Self::fresh(now)
        };
        Self {
            hit_count: base.hit_count.saturating_add(1),
            ..base
        }
    }
}

/// Bucket store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bucket store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bucket store task failed: {0}")]
    Task(String),
}

/// Storage for rate buckets.
pub trait BucketStore: Send + Sync {
    /// Atomically count one hit for `identifier` at `now` and return the
    /// updated bucket.
    fn increment(&self, identifier: &str, now: i64) -> Result<RateBucket, StoreError>;
}

/// One JSON file per identifier, `{"ts": <window start>, "hits": <count>}`.
#[derive(Debug, Clone)]
pub struct FileBucketStore {
    root: PathBuf,
}

impl FileBucketStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the bucket for `identifier`.
    pub fn bucket_path(&self, identifier: &str) -> PathBuf {
        self.root
            .join(format!("bucket_{}", sanitize_identifier(identifier)))
    }

    fn ensure_root(&self) -> std::io::Result<()> {
        if self.root.is_dir() {
            return Ok(());
        }
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(&self.root)
    }
}

impl BucketStore for FileBucketStore {
    fn increment(&self, identifier: &str, now: i64) -> Result<RateBucket, StoreError> {
        self.ensure_root()?;
        let path = self.bucket_path(identifier);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        FileExt::lock_exclusive(&file)?;
        let result = update_locked(&mut file, now);
        if let Err(e) = FileExt::unlock(&file) {
            warn!(path = %path.display(), error = %e, "Failed to unlock bucket file");
        }
        result
    }
}

fn update_locked(file: &mut fs::File, now: i64) -> Result<RateBucket, StoreError> {
    let mut raw = String::new();
    file.read_to_string(&mut raw)?;

    // empty or unreadable records start over
    let current = serde_json::from_str::<RateBucket>(&raw).unwrap_or_else(|_| RateBucket::fresh(now));
    let updated = current.hit(now);

    let encoded = serde_json::to_vec(&updated).map_err(std::io::Error::from)?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&encoded)?;
    Ok(updated)
}

/// Keep `[A-Za-z0-9.-:]`, replace everything else with `_`.
fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// In-process bucket map.
#[derive(Debug, Default)]
pub struct MemoryBucketStore {
    buckets: Mutex<HashMap<String, RateBucket>>,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buckets.lock().map(|b| b.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BucketStore for MemoryBucketStore {
    fn increment(&self, identifier: &str, now: i64) -> Result<RateBucket, StoreError> {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if buckets.len() > MEMORY_PRUNE_THRESHOLD {
            buckets.retain(|_, bucket| bucket.is_current(now));
            debug!(remaining = buckets.len(), "Pruned expired rate buckets");
        }

        let bucket = buckets
            .entry(identifier.to_string())
            .or_insert_with(|| RateBucket::fresh(now));
        *bucket = bucket.hit(now);
        Ok(*bucket)
    }
}

/// Per-identifier submission limiter.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn BucketStore>,
    limit_per_hour: u32,
}

impl RateLimiter {
    /// Create a new rate limiter over `store`.
    pub fn new(store: Arc<dyn BucketStore>, limit_per_hour: u32) -> Self {
        Self {
            store,
            limit_per_hour,
        }
    }

    /// Count one submission from `identifier` at `now` (unix seconds) and
    /// decide whether it may proceed.
    pub async fn admit(&self, identifier: &str, now: i64) -> Decision {
        let store = Arc::clone(&self.store);
        let key = identifier.to_string();
        let counted = tokio::task::spawn_blocking(move || store.increment(&key, now))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))
            .and_then(|result| result);

        let bucket = match counted {
            Ok(bucket) => bucket,
            Err(e) => {
                warn!(identifier, error = %e, "Rate store unavailable, judging against a fresh bucket");
                RateBucket::fresh(now).hit(now)
            }
        };

        self.decide(&bucket, now)
    }

    fn decide(&self, bucket: &RateBucket, now: i64) -> Decision {
        let reset_at = bucket.window_start.saturating_add(WINDOW_SECS);
        let reset_in = Duration::from_secs(reset_at.saturating_sub(now).clamp(0, WINDOW_SECS) as u64);
        if bucket.hit_count > self.limit_per_hour {
            debug!(hits = bucket.hit_count, limit = self.limit_per_hour, "Submission limit exceeded");
            Decision::Denied {
                retry_after: reset_in,
            }
        } else {
            Decision::Allowed {
                remaining: self.limit_per_hour - bucket.hit_count,
                reset_in,
            }
        }
    }
}
