//! The user-facing control surface.
//!
//! Request/response operations mirroring the device's control channel.
//! Every operation holds the battery suspend blocker for its duration and
//! releases it on every path, error paths included.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use scopeguard::defer;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::monitor::Shared;
use crate::platform::{ChargerIc, EventSink, SuspendBlocker};
use crate::timer::BattTimer;
use crate::types::{
    AdcSnapshot, BatteryEvent, BatteryReport, ChargerMode, ChargingSource, VoltageAlarmConfig,
    ADC_SAMPLES_PER_CHANNEL,
};
use crate::voltage_alarm::VoltageAlarm;

/// Upper bound for the debug-log scratch buffer.
pub const DEBUG_LOG_LENGTH: usize = 1024;

pub struct BatteryControl {
    shared: Arc<Shared>,
    timer: Arc<BattTimer>,
    voltage_alarm: VoltageAlarm,
    charger_ic: Arc<dyn ChargerIc>,
    events: Arc<dyn EventSink>,
    blocker: Arc<dyn SuspendBlocker>,
}

impl BatteryControl {
    pub(crate) fn new(
        shared: Arc<Shared>,
        timer: Arc<BattTimer>,
        voltage_alarm: VoltageAlarm,
        charger_ic: Arc<dyn ChargerIc>,
        events: Arc<dyn EventSink>,
        blocker: Arc<dyn SuspendBlocker>,
    ) -> Self {
        Self {
            shared,
            timer,
            voltage_alarm,
            charger_ic,
            events,
            blocker,
        }
    }

    /// Claims the control surface; only one client may hold it at a time.
    pub fn open(&self) -> Result<()> {
        if self.shared.open.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyOpen);
        }
        info!("battery control surface opened");
        Ok(())
    }

    pub fn release(&self) {
        self.shared.open.store(false, Ordering::SeqCst);
        info!("battery control surface released");
    }

    /// Currently detected charging source.
    pub fn charging_source(&self) -> ChargingSource {
        self.blocker.acquire();
        defer! { self.blocker.release(); }
        self.shared.report.lock().charging_source
    }

    /// Sets the check interval in seconds; the first call also starts the
    /// periodic sampling timer.
    pub fn set_alarm_timeout(&self, secs: u32) -> Result<()> {
        self.blocker.acquire();
        defer! { self.blocker.release(); }
        if secs == 0 {
            return Err(Error::invalid_argument("check interval must be non-zero"));
        }
        self.timer.set_alarm_timeout(secs);
        Ok(())
    }

    /// ADC reference calibration values read at bring-up.
    pub fn adc_reference(&self) -> [i32; ADC_SAMPLES_PER_CHANNEL] {
        self.blocker.acquire();
        defer! { self.blocker.release(); }
        self.shared.adc_vref
    }

    /// Raw samples from the last completed sampling pass.
    pub fn last_sample(&self) -> AdcSnapshot {
        self.blocker.acquire();
        defer! { self.blocker.release(); }
        self.shared.adc_data.lock().clone()
    }

    /// Switches the charger IC and broadcasts the new switch state.
    pub fn set_charger_mode(&self, mode: ChargerMode) -> Result<()> {
        self.blocker.acquire();
        defer! { self.blocker.release(); }
        info!(?mode, "switching charger");
        self.charger_ic.set_mode(mode)?;
        self.events.broadcast(BatteryEvent::ChargerSwitch {
            enabled: mode != ChargerMode::Stop,
        });
        Ok(())
    }

    /// Replaces the whole battery report atomically and broadcasts the
    /// change.
    pub fn push_report(&self, report: BatteryReport) {
        self.blocker.acquire();
        defer! { self.blocker.release(); }
        let level = report.level;
        *self.shared.report.lock() = report;
        debug!(level, "battery report updated");
        self.events.broadcast(BatteryEvent::ReportChanged);
    }

    /// Stores a bounded debug-log string for later readback.
    pub fn set_debug_log(&self, text: &str) -> Result<()> {
        self.blocker.acquire();
        defer! { self.blocker.release(); }
        if text.len() > DEBUG_LOG_LENGTH {
            return Err(Error::invalid_argument("debug log exceeds buffer length"));
        }
        *self.shared.debug_log.lock() = text.to_owned();
        Ok(())
    }

    pub fn debug_log(&self) -> String {
        self.shared.debug_log.lock().clone()
    }

    /// Programs the voltage-alarm comparator.
    pub fn configure_voltage_alarm(&self, config: VoltageAlarmConfig) -> Result<()> {
        self.blocker.acquire();
        defer! { self.blocker.release(); }
        if config.lower_mv >= config.upper_mv {
            return Err(Error::invalid_argument(
                "voltage alarm lower threshold must be below upper",
            ));
        }
        self.voltage_alarm.configure(config)
    }

    /// Externally overrides the urgency flag normally mirrored from cable
    /// presence.
    pub fn set_urgency_flag(&self, urgent: bool) {
        self.blocker.acquire();
        defer! { self.blocker.release(); }
        info!(urgent, "urgency flag set via control surface");
        self.timer.set_urgency(urgent);
    }

    /// Signals whether a phone call is in progress.
    pub fn set_phone_call(&self, active: bool) {
        self.blocker.acquire();
        defer! { self.blocker.release(); }
        self.timer.set_phone_call(active);
    }

    /// Changes the full-battery level percentage and broadcasts it.
    pub fn set_full_level(&self, percent: u32) -> Result<()> {
        self.blocker.acquire();
        defer! { self.blocker.release(); }
        if percent > 100 {
            return Err(Error::invalid_argument("full level must be at most 100"));
        }
        info!(percent, "full level changed");
        self.events
            .broadcast(BatteryEvent::FullLevelChanged { percent });
        Ok(())
    }
}
