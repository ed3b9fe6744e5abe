//! Charger/cable state machine.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::monitor::Shared;
use crate::platform::{EventSink, SuspendBlocker};
use crate::timer::BattTimer;
use crate::types::{BatteryEvent, CableType, ChargerIcEvent, ChargingSource};

/// Grace window for which the vbus blocker stays held after a non-USB
/// cable change, so user space can observe the notification before the
/// system suspends.
pub const VBUS_WAKE_GRACE: Duration = Duration::from_secs(5);

/// Converts raw cable-detection events into the recorded charging source,
/// applies the debounced wake-lock policy, and emits change notifications.
pub struct ChargerStateMachine {
    shared: Arc<Shared>,
    timer: Arc<BattTimer>,
    vbus_blocker: Arc<dyn SuspendBlocker>,
    events: Arc<dyn EventSink>,
}

impl ChargerStateMachine {
    pub(crate) fn new(
        shared: Arc<Shared>,
        timer: Arc<BattTimer>,
        vbus_blocker: Arc<dyn SuspendBlocker>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            shared,
            timer,
            vbus_blocker,
            events,
        }
    }

    /// Applies one cable-detection event.
    ///
    /// Idempotent: an event mapping to the already-recorded source is a
    /// logged no-op with no notification emitted. The check and the
    /// update happen under one report-lock hold, so two racing identical
    /// events cannot both pass the check.
    pub fn on_cable_event(&self, cable: CableType) {
        let source = ChargingSource::from(cable);
        if cable == CableType::Unknown {
            warn!("unknown cable type, treating as USB");
        }

        let previous = {
            let mut rep = self.shared.report.lock();
            if rep.charging_source == source {
                info!(?cable, "charger type unchanged, ignoring");
                return;
            }
            let previous = rep.charging_source;
            rep.charging_source = source;
            info!(?cable, ?source, "charging source changed");
            previous
        };
        // Cable presence shortens the polling interval across suspend.
        self.timer.set_urgency(source.cable_present());

        self.update_wake_lock(previous, source);
        self.events.broadcast(BatteryEvent::CableChanged { source });
    }

    /// USB keeps the device awake for as long as the cable is attached;
    /// everything else only holds the blocker for the grace window. The
    /// indefinite hold taken at USB attach is handed back when the cable
    /// stops being USB.
    fn update_wake_lock(&self, previous: ChargingSource, source: ChargingSource) {
        if source == ChargingSource::Usb {
            self.vbus_blocker.acquire();
        } else {
            if previous == ChargingSource::Usb {
                self.vbus_blocker.release();
            }
            self.vbus_blocker.acquire_timeout(VBUS_WAKE_GRACE);
        }
    }

    /// Handles a notification pushed by the charger IC.
    pub fn on_charger_ic_event(&self, event: ChargerIcEvent) {
        match event {
            ChargerIcEvent::OverVoltage { active } => {
                self.shared.report.lock().over_voltage = active;
                warn!(active, "charger input over-voltage state changed");
                self.events.broadcast(BatteryEvent::ReportChanged);
            }
        }
    }
}
