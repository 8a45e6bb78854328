// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-object retry delays for failing reconciliations

use crate::types::Identity;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Doubles the retry delay for every consecutive failure of the same object.
///
/// The count is kept per identity and cleared once the object reconciles.
pub struct ErrorBackoff {
    base: Duration,
    max: Duration,
    failures: Mutex<HashMap<Identity, u32>>,
}

impl ErrorBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failure of `identity` and return how long to wait before retrying
    pub fn next_delay(&self, identity: &Identity) -> Duration {
        let mut failures = self.failures();
        let attempts = failures.entry(identity.clone()).or_insert(0);
        let delay = delay_for(self.base, self.max, *attempts);
        *attempts = attempts.saturating_add(1);
        delay
    }

    /// Forget earlier failures of `identity`
    pub fn reset(&self, identity: &Identity) {
        self.failures().remove(identity);
    }

    // A panic while holding the lock leaves only counters behind; keep using them.
    fn failures(&self) -> MutexGuard<'_, HashMap<Identity, u32>> {
        self.failures.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn delay_for(base: Duration, max: Duration, attempts: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempts)).min(max)
}
