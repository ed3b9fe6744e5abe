//! Top-level coordinator wiring.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::control::BatteryControl;
use crate::charger::ChargerStateMachine;
use crate::error::Result;
use crate::platform::Platform;
use crate::sampler::{self, Dispatcher, Sampler};
use crate::shutdown::ShutdownHandler;
use crate::timer::constants::DEFAULT_ALARM_FORCE_THRESHOLD;
use crate::timer::{BattTimer, PmDecision};
use crate::types::{
    AdcChannel, AdcSnapshot, BatteryReport, CableType, ChargerIcEvent, ADC_SAMPLES_PER_CHANNEL,
};
use crate::voltage_alarm::VoltageAlarm;

/// Process-wide mutable singletons, initialized at startup and kept for
/// the whole process lifetime.
pub(crate) struct Shared {
    pub(crate) report: Mutex<BatteryReport>,
    pub(crate) adc_data: Mutex<AdcSnapshot>,
    pub(crate) adc_vref: [i32; ADC_SAMPLES_PER_CHANNEL],
    pub(crate) debug_log: Mutex<String>,
    pub(crate) open: AtomicBool,
}

impl Shared {
    pub(crate) fn new(adc_vref: [i32; ADC_SAMPLES_PER_CHANNEL], adc_data: AdcSnapshot) -> Self {
        Self {
            report: Mutex::new(BatteryReport::default()),
            adc_data: Mutex::new(adc_data),
            adc_vref,
            debug_log: Mutex::new(String::new()),
            open: AtomicBool::new(false),
        }
    }
}

/// Tunables fixed at construction.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Voltage-alarm fire count above which a PM boundary forces an
    /// immediate sample.
    pub alarm_force_threshold: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            alarm_force_threshold: DEFAULT_ALARM_FORCE_THRESHOLD,
        }
    }
}

/// The battery-state monitoring and charge-control coordinator.
///
/// Construction performs the bring-up reads and spawns the sampling
/// worker; the platform glue then feeds hardware and PM events into the
/// `on_*`/`pm_*` entry points and user space talks to [`control`].
///
/// [`control`]: BatteryMonitor::control
pub struct BatteryMonitor {
    shared: Arc<Shared>,
    timer: Arc<BattTimer>,
    charger: ChargerStateMachine,
    voltage_alarm: VoltageAlarm,
    shutdown: ShutdownHandler,
    control: BatteryControl,
    _worker: JoinHandle<()>,
}

impl BatteryMonitor {
    /// Brings the monitor up. Must run within a tokio runtime.
    ///
    /// Reads the ADC reference calibration and an initial battery
    /// snapshot; either failing aborts bring-up.
    pub fn start(platform: Platform, config: MonitorConfig) -> Result<Self> {
        let adc_vref = platform
            .adc
            .read_channel(AdcChannel::VrefCalibration)
            .map_err(|e| {
                error!("vref ADC read failed at bring-up: {e}");
                e
            })?;
        info!(?adc_vref, "vref ADC calibration read");

        let first_snapshot = sampler::read_snapshot(platform.adc.as_ref()).map_err(|e| {
            error!("first battery ADC read failed at bring-up: {e}");
            e
        })?;

        let shared = Arc::new(Shared::new(adc_vref, first_snapshot));
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(Dispatcher::new(
            tx.clone(),
            Arc::clone(&platform.battery_blocker),
        ));
        let timer = Arc::new(BattTimer::new(
            dispatcher,
            Arc::clone(&platform.clock),
            Arc::clone(&platform.wake_alarm),
            Arc::clone(&platform.comparator),
            config.alarm_force_threshold,
        ));

        let worker = tokio::spawn(
            Sampler {
                shared: Arc::clone(&shared),
                timer: Arc::clone(&timer),
                adc: Arc::clone(&platform.adc),
                charger_ic: Arc::clone(&platform.charger_ic),
                power: Arc::clone(&platform.power),
                events: Arc::clone(&platform.events),
                blocker: Arc::clone(&platform.battery_blocker),
                clock: Arc::clone(&platform.clock),
            }
            .run(rx),
        );

        let charger = ChargerStateMachine::new(
            Arc::clone(&shared),
            Arc::clone(&timer),
            Arc::clone(&platform.vbus_blocker),
            Arc::clone(&platform.events),
        );
        let voltage_alarm = VoltageAlarm::new(Arc::clone(&timer), Arc::clone(&platform.comparator));
        let shutdown = ShutdownHandler::new(Arc::clone(&platform.fault_line), tx);
        let control = BatteryControl::new(
            Arc::clone(&shared),
            Arc::clone(&timer),
            voltage_alarm.clone(),
            Arc::clone(&platform.charger_ic),
            Arc::clone(&platform.events),
            Arc::clone(&platform.battery_blocker),
        );

        info!("battery monitor bring-up finished");
        Ok(Self {
            shared,
            timer,
            charger,
            voltage_alarm,
            shutdown,
            control,
            _worker: worker,
        })
    }

    pub fn control(&self) -> &BatteryControl {
        &self.control
    }

    /// Cable-detect notification entry point.
    pub fn on_cable_event(&self, cable: CableType) {
        self.charger.on_cable_event(cable);
    }

    /// Charger-IC notification entry point.
    pub fn on_charger_event(&self, event: ChargerIcEvent) {
        self.charger.on_charger_ic_event(event);
    }

    /// Voltage-comparator fired notification entry point.
    pub fn on_voltage_alarm_fired(&self) {
        self.voltage_alarm.on_fired();
    }

    /// Battery fault interrupt entry point.
    pub fn on_fault_interrupt(&self) {
        self.shutdown.on_fault_interrupt();
    }

    /// Suspend-prepare PM hook.
    pub fn pm_prepare(&self) -> PmDecision {
        self.timer.prepare()
    }

    /// Resume-complete PM hook.
    pub fn pm_complete(&self) {
        self.timer.complete();
    }

    /// A copy of the current battery report.
    pub fn report(&self) -> BatteryReport {
        self.shared.report.lock().clone()
    }
}
