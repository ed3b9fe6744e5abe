//! Alarm/timer scheduling and power-state accounting.
//!
//! [`BattTimer`] owns the two schedulable primitives (an awake-only
//! periodic timer and a suspend-surviving wake alarm) and the elapsed-time
//! accounting that has to stay consistent across both clock domains. It is
//! the serialization point for sampling: every path that wants a sample
//! goes through the dispatcher, and forced dispatches cancel whatever was
//! pending first.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::platform::{Clock, VoltageComparator, WakeAlarm};
use crate::sampler::Dispatcher;

pub mod constants;
mod elapsed;

pub use elapsed::ElapsedAccountant;

use constants::{
    BATT_SUSPEND_CHECK_SECS, BATT_TIMER_CHECK_SECS, RESUME_CHECK_BUFFER_MS, SUSPEND_RETRY_AFTER,
};

/// Outcome of the suspend-prepare hook.
///
/// `Busy` is not an error: it tells the PM layer an overdue sample has been
/// forced onto the worker and suspend should be retried after it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmDecision {
    /// Safe to suspend; the wake alarm is armed.
    Ready,
    /// Do not suspend yet; retry after the hint.
    Busy { retry_after: Duration },
}

const BUSY: PmDecision = PmDecision::Busy {
    retry_after: SUSPEND_RETRY_AFTER,
};

struct TimerState {
    elapsed: ElapsedAccountant,
    /// Voltage-alarm notifications since the last completed pass.
    alarm_fired: u32,
    /// Whether the hardware comparator should be armed for suspend.
    alarm_enabled: bool,
    /// Cable-present / externally-requested urgency.
    urgency: bool,
    /// Active phone call; polls must stay on the precise short interval.
    phone_call: bool,
    /// Configured check interval in seconds; 0 until first configured.
    timeout_secs: u32,
    /// Set once the periodic timer has been started for the first time.
    started: bool,
}

pub struct BattTimer {
    state: Mutex<TimerState>,
    dispatcher: Arc<Dispatcher>,
    timer_task: Mutex<Option<JoinHandle<()>>>,
    clock: Arc<dyn Clock>,
    wake_alarm: Arc<dyn WakeAlarm>,
    comparator: Arc<dyn VoltageComparator>,
    alarm_force_threshold: u32,
}

impl BattTimer {
    pub(crate) fn new(
        dispatcher: Arc<Dispatcher>,
        clock: Arc<dyn Clock>,
        wake_alarm: Arc<dyn WakeAlarm>,
        comparator: Arc<dyn VoltageComparator>,
        alarm_force_threshold: u32,
    ) -> Self {
        let now = clock.monotonic_ms();
        Self {
            state: Mutex::new(TimerState {
                elapsed: ElapsedAccountant::new(now),
                alarm_fired: 0,
                alarm_enabled: false,
                urgency: false,
                phone_call: false,
                timeout_secs: 0,
                started: false,
            }),
            dispatcher,
            timer_task: Mutex::new(None),
            clock,
            wake_alarm,
            comparator,
            alarm_force_threshold,
        }
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Arms the awake-only periodic timer; replaces any pending expiry.
    ///
    /// Must run within a tokio runtime.
    pub(crate) fn set_check_timer(&self, secs: u32) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(u64::from(secs))).await;
            dispatcher.dispatch();
        });
        if let Some(prev) = self.timer_task.lock().replace(handle) {
            prev.abort();
        }
    }

    /// Stores the check interval; the first call also starts the periodic
    /// timer.
    pub(crate) fn set_alarm_timeout(&self, secs: u32) {
        let start = {
            let mut st = self.state.lock();
            st.timeout_secs = secs;
            if st.started {
                false
            } else {
                st.started = true;
                true
            }
        };
        if start {
            info!(secs, "starting periodic battery check");
            self.set_check_timer(secs);
        }
    }

    pub(crate) fn timeout_secs(&self) -> u32 {
        self.state.lock().timeout_secs
    }

    pub(crate) fn set_urgency(&self, urgent: bool) {
        self.state.lock().urgency = urgent;
        debug!(urgent, "urgency flag updated");
    }

    pub(crate) fn set_phone_call(&self, active: bool) {
        self.state.lock().phone_call = active;
    }

    pub(crate) fn set_alarm_enabled(&self, enabled: bool) {
        self.state.lock().alarm_enabled = enabled;
    }

    pub(crate) fn reset_alarm_count(&self) {
        self.state.lock().alarm_fired = 0;
    }

    /// Counts one voltage-alarm notification; returns the running count.
    pub(crate) fn note_alarm_fired(&self) -> u32 {
        let mut st = self.state.lock();
        st.alarm_fired += 1;
        st.alarm_fired
    }

    /// Cancels any pending timer and queued pass, then dispatches a fresh
    /// sampling pass. The serial worker queue guarantees the fresh pass
    /// runs only after any in-flight pass has completed.
    pub(crate) fn force_dispatch(&self) {
        if let Some(handle) = self.timer_task.lock().take() {
            handle.abort();
        }
        self.dispatcher.invalidate();
        self.dispatcher.dispatch();
    }

    /// Suspend-prepare hook.
    ///
    /// Folds the awake delta into the elapsed total, records the
    /// suspend-entry wall stamp, then decides how far out the wake alarm
    /// must be armed. An overdue sample under an urgency condition forces
    /// an immediate dispatch and defers the suspend instead of arming a
    /// non-positive-duration alarm.
    pub fn prepare(&self) -> PmDecision {
        let now_mono = self.clock.monotonic_ms();
        let now_wall = self.clock.wall_ms();

        let (interval_ms, arm_comparator, total_ms) = {
            let mut st = self.state.lock();
            st.elapsed.roll_awake(now_mono);
            st.elapsed.note_suspend(now_wall);
            let total_ms = st.elapsed.total_ms();

            if st.phone_call || st.urgency {
                let time_diff = i64::from(st.timeout_secs) * 1000 - total_ms as i64;
                if time_diff <= 0 {
                    drop(st);
                    debug!(time_diff, "sample overdue at suspend entry, forcing dispatch");
                    self.force_dispatch();
                    return BUSY;
                }
                (time_diff as u64, false, total_ms)
            } else {
                (
                    u64::from(BATT_SUSPEND_CHECK_SECS) * 1000,
                    st.alarm_enabled,
                    total_ms,
                )
            }
        };

        if arm_comparator {
            if let Err(e) = self.comparator.set_enabled(true) {
                error!("failed to arm voltage comparator for suspend: {e}");
                return BUSY;
            }
        }

        debug!(
            total_ms,
            interval_ms, "suspend entry, arming wake alarm"
        );
        if let Err(e) = self.wake_alarm.start(Duration::from_millis(interval_ms)) {
            error!("failed to arm wake alarm: {e}");
            return BUSY;
        }
        PmDecision::Ready
    }

    /// Resume-complete hook.
    ///
    /// Folds the suspended duration into the elapsed total, then forces an
    /// immediate sample when the total crossed the check threshold or the
    /// voltage alarm fired more than the configured number of times. The
    /// wake alarm and the hardware comparator are always disarmed; prepare
    /// re-arms them when still needed.
    pub fn complete(&self) {
        let now_wall = self.clock.wall_ms();
        let now_mono = self.clock.monotonic_ms();

        let force = {
            let mut st = self.state.lock();
            let suspended_ms = st.elapsed.roll_suspended(now_wall);
            st.elapsed.restamp_awake(now_mono);

            let check_ms = if st.phone_call || st.urgency {
                (u64::from(st.timeout_secs) * 1000).saturating_sub(RESUME_CHECK_BUFFER_MS)
            } else {
                u64::from(BATT_TIMER_CHECK_SECS) * 1000
            };
            debug!(
                suspended_ms,
                total_ms = st.elapsed.total_ms(),
                check_ms,
                alarm_fired = st.alarm_fired,
                "resume accounting"
            );
            st.elapsed.total_ms() >= check_ms || st.alarm_fired > self.alarm_force_threshold
        };

        if force {
            self.force_dispatch();
        }
        // The alarm did its job (or was not needed); the awake-only timer
        // takes over from here.
        self.wake_alarm.stop();
        if let Err(e) = self.comparator.set_enabled(false) {
            warn!("failed to disarm voltage comparator at resume: {e}");
        }
    }

    #[cfg(test)]
    pub(crate) fn urgency_flag(&self) -> bool {
        self.state.lock().urgency
    }

    #[cfg(test)]
    pub(crate) fn alarm_enabled_flag(&self) -> bool {
        self.state.lock().alarm_enabled
    }

    #[cfg(test)]
    pub(crate) fn alarm_fired_count(&self) -> u32 {
        self.state.lock().alarm_fired
    }

    #[cfg(test)]
    pub(crate) fn total_elapsed_ms(&self) -> u64 {
        self.state.lock().elapsed.total_ms()
    }

    /// Elapsed total and alarm count for a finishing pass; resets both and
    /// restamps the awake clock.
    pub(crate) fn complete_pass(&self, now_mono_ms: u64) -> (u64, u32) {
        let mut st = self.state.lock();
        st.elapsed.roll_awake(now_mono_ms);
        let total = st.elapsed.total_ms();
        let fired = st.alarm_fired;
        st.elapsed.reset(now_mono_ms);
        st.alarm_fired = 0;
        (total, fired)
    }
}
