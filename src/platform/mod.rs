//! Collaborator interfaces toward the platform.
//!
//! The engine never touches registers itself; everything hardware-shaped
//! comes in through the traits below so the whole coordinator can run
//! against mocks. Implementations are expected to be cheap and
//! non-blocking: every call here is made from the sampling worker or from
//! a PM transition hook, never with an internal lock held.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::types::{AdcChannel, BatteryEvent, ChargerMode, ADC_SAMPLES_PER_CHANNEL};

#[cfg(test)]
use mockall::automock;

pub mod clock;

pub use clock::{Clock, SystemClock};

/// Raw multi-sample ADC access.
#[cfg_attr(test, automock)]
pub trait AdcReader: Send + Sync {
    /// Reads one burst of samples from the given channel.
    fn read_channel(&self, channel: AdcChannel) -> Result<[i32; ADC_SAMPLES_PER_CHANNEL]>;
}

/// Charger-IC enable/disable control.
#[cfg_attr(test, automock)]
pub trait ChargerIc: Send + Sync {
    fn set_mode(&self, mode: ChargerMode) -> Result<()>;
}

/// Hardware voltage comparator capable of waking the system when battery
/// voltage leaves the configured band.
#[cfg_attr(test, automock)]
pub trait VoltageComparator: Send + Sync {
    fn set_enabled(&self, enabled: bool) -> Result<()>;
    fn set_thresholds(&self, lower_mv: u32, upper_mv: u32) -> Result<()>;
}

/// A timer that fires and wakes the system even while suspended.
#[cfg_attr(test, automock)]
pub trait WakeAlarm: Send + Sync {
    /// Arms the alarm to fire after `delay`. Re-arming replaces any pending
    /// expiry.
    fn start(&self, delay: Duration) -> Result<()>;
    fn stop(&self);
}

/// A suspend-blocking resource (wake-lock equivalent).
///
/// Counting semantics: every `acquire` must be balanced by exactly one
/// `release`, and the system may suspend only when no acquisition is
/// outstanding. `acquire_timeout` self-releases after the given grace
/// window.
#[cfg_attr(test, automock)]
pub trait SuspendBlocker: Send + Sync {
    fn acquire(&self);
    fn acquire_timeout(&self, timeout: Duration);
    fn release(&self);
}

/// The battery fault interrupt line.
#[cfg_attr(test, automock)]
pub trait FaultLine: Send + Sync {
    /// Masks the line so it cannot trigger again.
    fn mask(&self);
}

/// Irreversible platform power-off.
#[cfg_attr(test, automock)]
pub trait PowerControl: Send + Sync {
    /// By contract this does not return on real hardware.
    fn power_off(&self);
}

/// Fire-and-forget event broadcast toward user space.
#[cfg_attr(test, automock)]
pub trait EventSink: Send + Sync {
    fn broadcast(&self, event: BatteryEvent);
}

/// The full set of platform collaborators the monitor is wired to.
#[derive(Clone)]
pub struct Platform {
    pub adc: Arc<dyn AdcReader>,
    pub charger_ic: Arc<dyn ChargerIc>,
    pub comparator: Arc<dyn VoltageComparator>,
    pub wake_alarm: Arc<dyn WakeAlarm>,
    pub fault_line: Arc<dyn FaultLine>,
    pub power: Arc<dyn PowerControl>,
    pub events: Arc<dyn EventSink>,
    pub clock: Arc<dyn Clock>,
    /// Held across every sampling pass and control-surface call.
    pub battery_blocker: Arc<dyn SuspendBlocker>,
    /// Held while a cable is attached (USB) or for a short grace window.
    pub vbus_blocker: Arc<dyn SuspendBlocker>,
}
