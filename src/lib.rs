//! battmon - battery-state monitoring and charge-control coordination
//!
//! This crate is the battery coordinator for a handheld device: it
//! periodically samples battery telemetry, tracks charger/cable presence,
//! enforces a voltage-alarm safety envelope, and performs an emergency
//! shutdown on the hardware fault line, while keeping a single logical
//! "time since last sample" counter consistent across suspend/resume
//! cycles.
//!
//! # Architecture
//!
//! - [`timer`]: alarm/timer scheduling and elapsed-time accounting across
//!   the awake-only tick timer and the suspend-surviving wake alarm
//! - `sampler`: the single asynchronous worker that runs sampling passes
//! - [`charger`]: the cable/charging-source state machine
//! - [`voltage_alarm`]: voltage comparator programming and fire counting
//! - [`shutdown`]: debounced emergency power-off on the fault line
//! - [`control`]: the user-facing request/response surface
//! - [`platform`]: the collaborator traits the engine is wired to
//!
//! All hardware access goes through the [`platform`] traits, so the whole
//! engine runs unmodified against mocks in tests.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use battmon::platform::{
//!     AdcReader, ChargerIc, EventSink, FaultLine, Platform, PowerControl, SuspendBlocker,
//!     SystemClock, VoltageComparator, WakeAlarm,
//! };
//! use battmon::{
//!     AdcChannel, BatteryEvent, BatteryMonitor, CableType, ChargerMode, MonitorConfig,
//!     ADC_SAMPLES_PER_CHANNEL,
//! };
//!
//! struct Board;
//!
//! impl AdcReader for Board {
//!     fn read_channel(&self, _: AdcChannel) -> battmon::Result<[i32; ADC_SAMPLES_PER_CHANNEL]> {
//!         Ok([0; ADC_SAMPLES_PER_CHANNEL])
//!     }
//! }
//! impl ChargerIc for Board {
//!     fn set_mode(&self, _: ChargerMode) -> battmon::Result<()> {
//!         Ok(())
//!     }
//! }
//! impl VoltageComparator for Board {
//!     fn set_enabled(&self, _: bool) -> battmon::Result<()> {
//!         Ok(())
//!     }
//!     fn set_thresholds(&self, _: u32, _: u32) -> battmon::Result<()> {
//!         Ok(())
//!     }
//! }
//! impl WakeAlarm for Board {
//!     fn start(&self, _: Duration) -> battmon::Result<()> {
//!         Ok(())
//!     }
//!     fn stop(&self) {}
//! }
//! impl SuspendBlocker for Board {
//!     fn acquire(&self) {}
//!     fn acquire_timeout(&self, _: Duration) {}
//!     fn release(&self) {}
//! }
//! impl FaultLine for Board {
//!     fn mask(&self) {}
//! }
//! impl PowerControl for Board {
//!     fn power_off(&self) {}
//! }
//! impl EventSink for Board {
//!     fn broadcast(&self, _: BatteryEvent) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> battmon::Result<()> {
//!     let board = Arc::new(Board);
//!     let platform = Platform {
//!         adc: board.clone(),
//!         charger_ic: board.clone(),
//!         comparator: board.clone(),
//!         wake_alarm: board.clone(),
//!         fault_line: board.clone(),
//!         power: board.clone(),
//!         events: board.clone(),
//!         clock: Arc::new(SystemClock),
//!         battery_blocker: board.clone(),
//!         vbus_blocker: board,
//!     };
//!
//!     let monitor = BatteryMonitor::start(platform, MonitorConfig::default())?;
//!     monitor.control().set_alarm_timeout(360)?;
//!     monitor.on_cable_event(CableType::Usb);
//!     Ok(())
//! }
//! ```

pub mod charger;
pub mod control;
pub mod error;
pub mod monitor;
pub mod platform;
pub(crate) mod sampler;
pub mod shutdown;
pub mod timer;
pub mod types;
pub mod voltage_alarm;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Error, Result};
pub use monitor::{BatteryMonitor, MonitorConfig};
pub use timer::PmDecision;
pub use types::{
    AdcChannel, AdcSnapshot, BatteryEvent, BatteryReport, CableType, ChargerIcEvent, ChargerMode,
    ChargingSource, VoltageAlarmConfig, ADC_SAMPLES_PER_CHANNEL,
};
