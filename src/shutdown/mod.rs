//! Emergency shutdown on the battery fault line.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::error;

use crate::platform::FaultLine;
use crate::sampler::WorkerMsg;

/// Debounce delay between the fault interrupt and the power-off action.
pub const FAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Two-stage fault handler: the immediate stage masks the line and
/// schedules; the deferred stage (on the worker, after the debounce)
/// disables charging and powers off.
pub struct ShutdownHandler {
    fault_line: Arc<dyn FaultLine>,
    tx: UnboundedSender<WorkerMsg>,
    latched: AtomicBool,
}

impl ShutdownHandler {
    pub(crate) fn new(fault_line: Arc<dyn FaultLine>, tx: UnboundedSender<WorkerMsg>) -> Self {
        Self {
            fault_line,
            tx,
            latched: AtomicBool::new(false),
        }
    }

    /// Immediate stage, safe to call from interrupt-like context: masks
    /// the line so a noisy signal cannot re-enter, then hands off. Only
    /// the first trip schedules the shutdown.
    pub fn on_fault_interrupt(&self) {
        self.fault_line.mask();
        if self.latched.swap(true, Ordering::SeqCst) {
            return;
        }
        error!("battery fault line tripped, powering off after debounce");

        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(FAULT_DEBOUNCE).await;
            if tx.send(WorkerMsg::Shutdown).is_err() {
                error!("sampling worker is gone, cannot run shutdown sequence");
            }
        });
    }
}
