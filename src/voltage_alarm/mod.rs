//! Voltage-alarm comparator management.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Result;
use crate::platform::VoltageComparator;
use crate::timer::BattTimer;
use crate::types::VoltageAlarmConfig;

/// Programs the hardware voltage comparator and counts fired
/// notifications for the scheduler's urgency decision.
#[derive(Clone)]
pub struct VoltageAlarm {
    timer: Arc<BattTimer>,
    comparator: Arc<dyn VoltageComparator>,
}

impl VoltageAlarm {
    pub(crate) fn new(timer: Arc<BattTimer>, comparator: Arc<dyn VoltageComparator>) -> Self {
        Self { timer, comparator }
    }

    /// Programs the comparator thresholds.
    ///
    /// The comparator is disabled before the thresholds are written,
    /// whatever its prior state: programming a live comparator can produce
    /// a spurious fire. It is re-enabled afterwards only when requested.
    pub fn configure(&self, config: VoltageAlarmConfig) -> Result<()> {
        self.timer.reset_alarm_count();
        self.timer.set_alarm_enabled(config.enabled);

        self.comparator.set_enabled(false)?;
        self.comparator
            .set_thresholds(config.lower_mv, config.upper_mv)?;
        if config.enabled {
            self.comparator.set_enabled(true)?;
        }

        info!(
            lower_mv = config.lower_mv,
            upper_mv = config.upper_mv,
            enabled = config.enabled,
            "voltage alarm configured"
        );
        Ok(())
    }

    /// Records one alarm-fired notification. Whether this forces a sample
    /// is decided by the scheduler at the next PM boundary.
    pub fn on_fired(&self) {
        let count = self.timer.note_alarm_fired();
        warn!(count, "battery voltage alarm fired");
    }
}
