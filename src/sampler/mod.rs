//! The asynchronous sampling worker.
//!
//! All I/O-bearing work funnels through one task draining an mpsc queue,
//! so interrupt-like contexts (timer fire, alarm fire, fault line) never
//! block: they only enqueue. The serial queue is also what guarantees at
//! most one sampling pass in flight at a time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::monitor::Shared;
use crate::platform::{AdcReader, ChargerIc, Clock, EventSink, PowerControl, SuspendBlocker};
use crate::timer::BattTimer;
use crate::types::{AdcChannel, AdcSnapshot, BatteryEvent, ChargerMode};

/// Work items handled by the sampling worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerMsg {
    /// Run one sampling pass. The epoch lets a forced dispatch invalidate
    /// passes that were queued before the cancellation point.
    Sample { epoch: u64 },
    /// Disable charging and power off. Irreversible.
    Shutdown,
}

/// Front end of the worker queue.
///
/// Mirrors work-queue semantics: enqueueing while a pass is already queued
/// is a no-op, and a forced dispatch bumps the epoch so any stale queued
/// pass is dropped by the worker instead of running twice.
pub(crate) struct Dispatcher {
    queued: AtomicBool,
    epoch: AtomicU64,
    tx: UnboundedSender<WorkerMsg>,
    blocker: Arc<dyn SuspendBlocker>,
}

impl Dispatcher {
    pub(crate) fn new(tx: UnboundedSender<WorkerMsg>, blocker: Arc<dyn SuspendBlocker>) -> Self {
        Self {
            queued: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            tx,
            blocker,
        }
    }

    /// Enqueues a sampling pass unless one is already queued. The suspend
    /// blocker is acquired here and released by the worker, so the system
    /// cannot suspend between dispatch and pass completion.
    pub(crate) fn dispatch(&self) {
        if self.queued.swap(true, Ordering::SeqCst) {
            return;
        }
        self.blocker.acquire();
        let msg = WorkerMsg::Sample {
            epoch: self.epoch.load(Ordering::SeqCst),
        };
        if self.tx.send(msg).is_err() {
            error!("sampling worker is gone, dropping dispatch");
            self.queued.store(false, Ordering::SeqCst);
            self.blocker.release();
        }
    }

    /// Invalidates any queued-but-not-started pass so the next dispatch
    /// cannot race it into a duplicate run.
    pub(crate) fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.queued.store(false, Ordering::SeqCst);
    }

    /// Marks a queued pass as started; returns false for a stale pass.
    ///
    /// Starting a pass retires its epoch, so when a dispatch races a
    /// forced dispatch into two messages carrying the same epoch, only
    /// the first one runs.
    pub(crate) fn begin_pass(&self, epoch: u64) -> bool {
        if self
            .epoch
            .compare_exchange(epoch, epoch + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.queued.store(false, Ordering::SeqCst);
        true
    }
}

/// Reads all four battery channels into a fresh snapshot.
pub(crate) fn read_snapshot(adc: &dyn AdcReader) -> Result<AdcSnapshot> {
    Ok(AdcSnapshot {
        voltage: adc.read_channel(AdcChannel::Voltage)?,
        current: adc.read_channel(AdcChannel::Current)?,
        temperature: adc.read_channel(AdcChannel::Temperature)?,
        battery_id: adc.read_channel(AdcChannel::BatteryId)?,
    })
}

pub(crate) struct Sampler {
    pub(crate) shared: Arc<Shared>,
    pub(crate) timer: Arc<BattTimer>,
    pub(crate) adc: Arc<dyn AdcReader>,
    pub(crate) charger_ic: Arc<dyn ChargerIc>,
    pub(crate) power: Arc<dyn PowerControl>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) blocker: Arc<dyn SuspendBlocker>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Sampler {
    pub(crate) async fn run(self, mut rx: UnboundedReceiver<WorkerMsg>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                WorkerMsg::Sample { epoch } => {
                    if !self.timer.dispatcher().begin_pass(epoch) {
                        debug!("dropping sampling pass queued before cancellation");
                        self.blocker.release();
                        continue;
                    }
                    self.sample_pass();
                }
                WorkerMsg::Shutdown => {
                    self.emergency_shutdown();
                    break;
                }
            }
        }
    }

    /// One full sampling pass. Housekeeping (notification, accounting
    /// reset, timer re-arm, blocker release) runs even when the raw read
    /// fails; consumers then keep seeing the previous cached samples.
    fn sample_pass(&self) {
        match read_snapshot(self.adc.as_ref()) {
            Ok(snapshot) => *self.shared.adc_data.lock() = snapshot,
            Err(e) => error!("battery ADC read failed, keeping cached samples: {e}"),
        }

        let (total_time_ms, alarm_fired) = self.timer.complete_pass(self.clock.monotonic_ms());
        self.events.broadcast(BatteryEvent::SampleCompleted {
            total_time_ms,
            alarm_fired,
        });

        let timeout_secs = self.timer.timeout_secs();
        if timeout_secs > 0 {
            self.timer.set_check_timer(timeout_secs);
        } else {
            warn!("check interval not configured yet, not re-arming timer");
        }
        self.blocker.release();
    }

    fn emergency_shutdown(&self) {
        error!("shutting down device due to battery fault");
        if let Err(e) = self.charger_ic.set_mode(ChargerMode::Stop) {
            error!("failed to disable charging before power-off: {e}");
        }
        self.power.power_off();
    }
}
