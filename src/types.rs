//! Shared data types for the battery monitoring engine.

use serde::{Deserialize, Serialize};

/// Number of raw samples returned per ADC channel read.
pub const ADC_SAMPLES_PER_CHANNEL: usize = 5;

/// ADC channels the engine samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdcChannel {
    Voltage,
    Current,
    Temperature,
    BatteryId,
    /// Reference calibration channel, read once at bring-up.
    VrefCalibration,
}

/// The currently detected power-delivery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ChargingSource {
    /// No cable present, running from the battery.
    Battery,
    /// USB cable.
    Usb,
    /// AC wall charger.
    Ac,
    /// Wireless charging pad.
    Wireless,
}

impl ChargingSource {
    /// Whether any external power-delivery path is present.
    pub fn cable_present(self) -> bool {
        self != ChargingSource::Battery
    }
}

/// A raw cable-detection event as delivered by the cable-detect hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CableType {
    None,
    Usb,
    Ac,
    Wireless,
    /// The detection logic could not classify the cable.
    Unknown,
}

impl From<CableType> for ChargingSource {
    fn from(cable: CableType) -> Self {
        match cable {
            CableType::Usb => ChargingSource::Usb,
            CableType::Ac => ChargingSource::Ac,
            CableType::Wireless => ChargingSource::Wireless,
            // An unclassified cable still delivers power; treat it as USB
            // rather than rejecting the event.
            CableType::Unknown => ChargingSource::Usb,
            CableType::None => ChargingSource::Battery,
        }
    }
}

/// Charger-IC operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargerMode {
    /// Charging disabled.
    Stop,
    /// Standard-rate charging.
    SlowCharge,
    /// High-rate charging.
    FastCharge,
}

/// An event pushed by the charger IC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChargerIcEvent {
    /// The charger input voltage left its safe range.
    OverVoltage { active: bool },
}

/// The shared battery status record.
///
/// Telemetry fields are filled in by whoever runs the gauge algorithm and
/// pushed back wholesale through [`push_report`]; the engine itself only
/// maintains `charging_source` and `over_voltage`. All fields are replaced
/// atomically, never field by field, so readers always observe a consistent
/// record.
///
/// [`push_report`]: crate::control::BatteryControl::push_report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryReport {
    /// Battery voltage in millivolts.
    pub voltage_mv: u32,
    /// Battery pack identifier.
    pub battery_id: u32,
    /// Battery temperature in tenths of a degree Celsius.
    pub temperature_decideg: i32,
    /// Charge current in milliamps.
    pub current_ma: i32,
    /// Discharge current in milliamps.
    pub discharge_current_ma: i32,
    /// Charge level percentage (0-100).
    pub level: u32,
    /// Detected power-delivery path.
    pub charging_source: ChargingSource,
    /// Whether the charger IC is allowed to charge.
    pub charging_enabled: bool,
    /// Full-battery capacity in microamp-hours.
    pub full_battery_uah: u32,
    /// Percentage at which the battery is reported full.
    pub full_level: u32,
    /// Charger input over-voltage condition.
    pub over_voltage: bool,
    /// Temperature fault code; -1 when no fault has been seen.
    pub temp_fault: i32,
    /// Whether a battery pack is present.
    pub battery_present: bool,
}

impl Default for BatteryReport {
    fn default() -> Self {
        // Conservative placeholder values reported until the first gauge
        // pass pushes real numbers.
        Self {
            voltage_mv: 3300,
            battery_id: 1,
            temperature_decideg: 300,
            current_ma: 0,
            discharge_current_ma: 0,
            level: 10,
            charging_source: ChargingSource::Battery,
            charging_enabled: false,
            full_battery_uah: 1_580_000,
            full_level: 100,
            over_voltage: false,
            temp_fault: -1,
            battery_present: false,
        }
    }
}

/// Raw multi-sample ADC readings from the last completed sampling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdcSnapshot {
    pub voltage: [i32; ADC_SAMPLES_PER_CHANNEL],
    pub current: [i32; ADC_SAMPLES_PER_CHANNEL],
    pub temperature: [i32; ADC_SAMPLES_PER_CHANNEL],
    pub battery_id: [i32; ADC_SAMPLES_PER_CHANNEL],
}

/// Voltage-alarm comparator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoltageAlarmConfig {
    /// Lower voltage threshold in millivolts.
    pub lower_mv: u32,
    /// Upper voltage threshold in millivolts.
    pub upper_mv: u32,
    /// Whether the comparator should be armed after programming.
    pub enabled: bool,
}

/// Broadcast notifications emitted toward the user-space daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum BatteryEvent {
    /// The shared battery report was replaced.
    ReportChanged,
    /// The detected charging source changed.
    CableChanged { source: ChargingSource },
    /// A sampling pass finished; carries the elapsed time accounted since
    /// the previous pass and the voltage-alarm fire count in between.
    SampleCompleted { total_time_ms: u64, alarm_fired: u32 },
    /// Charging was switched on or off through the control surface.
    ChargerSwitch { enabled: bool },
    /// The full-battery level percentage was changed.
    FullLevelChanged { percent: u32 },
}
