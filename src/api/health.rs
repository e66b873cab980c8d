//! Shared health state for the /health endpoint.
//! Updated by the live sync loop, read by the API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Default)]
pub struct HealthState {
    /// Unix seconds of the last completed tick (0 = none yet).
    pub last_tick_at: AtomicU64,
    /// Size of the provider live set on the last completed tick.
    pub last_live_count: AtomicU64,
    pub ticks_run: AtomicU64,
    pub ticks_skipped: AtomicU64,
    pub ticks_failed: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self, live_count: u64) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.last_tick_at.store(now, Ordering::Relaxed);
        self.last_live_count.store(live_count, Ordering::Relaxed);
        self.ticks_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ticks_skipped(&self) {
        self.ticks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ticks_failed(&self) {
        self.ticks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_tick_at(&self) -> u64 {
        self.last_tick_at.load(Ordering::Relaxed)
    }

    pub fn last_live_count(&self) -> u64 {
        self.last_live_count.load(Ordering::Relaxed)
    }

    pub fn ticks_run(&self) -> u64 {
        self.ticks_run.load(Ordering::Relaxed)
    }

    pub fn ticks_skipped(&self) -> u64 {
        self.ticks_skipped.load(Ordering::Relaxed)
    }

    pub fn ticks_failed(&self) -> u64 {
        self.ticks_failed.load(Ordering::Relaxed)
    }
}
