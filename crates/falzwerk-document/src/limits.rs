// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-request wall-clock budget.

use std::time::{Duration, Instant};

use falzwerk_core::error::{FalzwerkError, Result};

/// Checked between units of work (usually pages). A capability call that is
/// already running is not interrupted; the next check fails instead.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// A deadline that never expires, for direct library use and tests.
    pub fn unbounded() -> Self {
        Self::start(Duration::MAX)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed() > self.budget
    }

    /// Fail with `ResourceExhausted` once the budget is spent. `what` names
    /// the work that was about to start.
    pub fn check(&self, what: &str) -> Result<()> {
        if self.is_expired() {
            return Err(FalzwerkError::ResourceExhausted(format!(
                "time budget of {}s exceeded before {what}",
                self.budget.as_secs()
            )));
        }
        Ok(())
    }
}
