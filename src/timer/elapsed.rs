//! Elapsed-time accounting across suspend/resume cycles.

/// Tracks how much time has passed since the last completed sampling pass,
/// merging awake monotonic deltas with suspended wall-clock deltas into
/// one total.
///
/// The monotonic stamp is folded in on suspend entry and restamped on
/// resume; the wall stamp recorded at suspend entry measures the suspended
/// duration. All arithmetic saturates at zero so clock skew can never
/// produce a negative delta.
#[derive(Debug)]
pub struct ElapsedAccountant {
    total_ms: u64,
    awake_stamp_ms: u64,
    suspend_stamp_ms: u64,
}

impl ElapsedAccountant {
    pub fn new(now_mono_ms: u64) -> Self {
        Self {
            total_ms: 0,
            awake_stamp_ms: now_mono_ms,
            suspend_stamp_ms: 0,
        }
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }

    /// Folds the awake delta since the last stamp into the total.
    pub fn roll_awake(&mut self, now_mono_ms: u64) {
        self.total_ms += now_mono_ms.saturating_sub(self.awake_stamp_ms);
        self.awake_stamp_ms = now_mono_ms;
    }

    /// Records the wall timestamp at suspend entry.
    pub fn note_suspend(&mut self, now_wall_ms: u64) {
        self.suspend_stamp_ms = now_wall_ms;
    }

    /// Folds the suspended duration into the total; returns that duration.
    pub fn roll_suspended(&mut self, now_wall_ms: u64) -> u64 {
        let suspended = now_wall_ms.saturating_sub(self.suspend_stamp_ms);
        self.total_ms += suspended;
        suspended
    }

    /// Restarts the awake delta from `now` without touching the total.
    pub fn restamp_awake(&mut self, now_mono_ms: u64) {
        self.awake_stamp_ms = now_mono_ms;
    }

    /// Zeroes the total after a completed sampling pass.
    pub fn reset(&mut self, now_mono_ms: u64) {
        self.total_ms = 0;
        self.awake_stamp_ms = now_mono_ms;
    }
}
