//! Collision-avoiding identifier allocation
//!
//! A candidate is generated and checked against the existing-identifier
//! set, retrying up to [`MAX_ATTEMPTS`] times. If the bound is exhausted
//! and the last candidate still collides, the current timestamp is
//! appended to it to force distinctness. That fallback deliberately
//! changes the emitted shape under contention and callers depend on it;
//! do not replace it with another retry round.

use crate::strategy::IdStrategy;
use chrono::{Datelike, Utc};
use rand::Rng;
use std::collections::HashSet;
use uuid::Uuid;

/// Retry bound for collision avoidance.
pub const MAX_ATTEMPTS: usize = 10;

/// Prefix used by the readable strategy when none is supplied.
pub const DEFAULT_PREFIX: &str = "item";

const SUFFIX_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Allocates identifiers that are unique within a known existing set.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    max_attempts: usize,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Generate a fresh identifier with the given strategy.
    ///
    /// `prefix` only affects the readable strategy and defaults to
    /// [`DEFAULT_PREFIX`]. Membership checks scan `existing`, so cost is
    /// O(attempts) set lookups.
    pub fn generate(
        &self,
        strategy: IdStrategy,
        existing: &HashSet<String>,
        prefix: Option<&str>,
    ) -> String {
        let prefix = prefix.unwrap_or(DEFAULT_PREFIX);
        self.generate_with(existing, || candidate(strategy, prefix))
    }

    /// Run the retry loop over an arbitrary candidate source.
    ///
    /// Exposed so tests can force deterministic collisions.
    pub fn generate_with(
        &self,
        existing: &HashSet<String>,
        mut source: impl FnMut() -> String,
    ) -> String {
        let mut candidate = source();
        let mut attempts = 1;

        while existing.contains(&candidate) {
            if attempts >= self.max_attempts {
                let fallback = format!("{candidate}_{}", Utc::now().timestamp_millis());
                tracing::warn!(
                    attempts,
                    id = %fallback,
                    "id collision retry bound exhausted, appending timestamp"
                );
                return fallback;
            }
            candidate = source();
            attempts += 1;
        }
        candidate
    }
}

/// Produce one candidate of the given shape.
fn candidate(strategy: IdStrategy, prefix: &str) -> String {
    match strategy {
        IdStrategy::Uuid => Uuid::new_v4().to_string(),
        IdStrategy::Short => random_suffix(16),
        IdStrategy::TimestampOrdered => {
            format!("{}_{}", Utc::now().timestamp_millis(), random_suffix(8))
        }
        IdStrategy::Readable => {
            let now = Utc::now();
            format!(
                "{prefix}-{}-{:02}-{:02}-{}",
                now.year(),
                now.month(),
                now.day(),
                random_suffix(4)
            )
        }
    }
}

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| SUFFIX_CHARS[rng.gen_range(0..SUFFIX_CHARS.len())] as char)
        .collect()
}
