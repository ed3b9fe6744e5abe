//! Dual clock sources for power-state time accounting.
//!
//! The engine needs both a monotonic reading (stops being meaningful
//! across suspend, like a tick counter) and a wall reading (keeps running
//! while suspended). Injecting them behind a trait keeps the accounting
//! deterministic under test.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;

#[cfg(test)]
use mockall::automock;

static MONOTONIC_BASE: Lazy<Instant> = Lazy::new(Instant::now);

#[cfg_attr(test, automock)]
pub trait Clock: Send + Sync {
    /// Milliseconds of awake runtime since an arbitrary process-local epoch.
    fn monotonic_ms(&self) -> u64;
    /// Wall-clock milliseconds since the Unix epoch; advances across
    /// suspend.
    fn wall_ms(&self) -> u64;
}

/// Process clocks backed by `Instant` and `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn monotonic_ms(&self) -> u64 {
        MONOTONIC_BASE.elapsed().as_millis() as u64
    }

    fn wall_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
