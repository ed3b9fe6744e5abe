//! Shared fakes for the module tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::error::{Error, Result};
use crate::monitor::Shared;
use crate::platform::{
    AdcReader, ChargerIc, Clock, EventSink, FaultLine, PowerControl, SuspendBlocker,
    VoltageComparator, WakeAlarm,
};
use crate::sampler::{Dispatcher, WorkerMsg};
use crate::timer::constants::DEFAULT_ALARM_FORCE_THRESHOLD;
use crate::timer::BattTimer;
use crate::types::{AdcChannel, AdcSnapshot, BatteryEvent, ChargerMode, ADC_SAMPLES_PER_CHANNEL};

pub(crate) fn init_test_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A clock the test advances by hand.
#[derive(Debug, Default)]
pub(crate) struct ManualClock {
    mono: AtomicU64,
    wall: AtomicU64,
}

impl ManualClock {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Advances both clocks, as awake time does.
    pub(crate) fn advance_awake(&self, ms: u64) {
        self.mono.fetch_add(ms, Ordering::SeqCst);
        self.wall.fetch_add(ms, Ordering::SeqCst);
    }

    /// Advances only the wall clock, as suspended time does.
    pub(crate) fn advance_suspended(&self, ms: u64) {
        self.wall.fetch_add(ms, Ordering::SeqCst);
    }

    /// Rewinds the wall clock to simulate skew.
    pub(crate) fn rewind_wall(&self, ms: u64) {
        self.wall.fetch_sub(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn monotonic_ms(&self) -> u64 {
        self.mono.load(Ordering::SeqCst)
    }

    fn wall_ms(&self) -> u64 {
        self.wall.load(Ordering::SeqCst)
    }
}

/// Records every broadcast event.
#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<BatteryEvent>>,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn events(&self) -> Vec<BatteryEvent> {
        self.events.lock().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&BatteryEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn broadcast(&self, event: BatteryEvent) {
        self.events.lock().push(event);
    }
}

/// Counts acquire/release pairs; timed acquisitions are recorded
/// separately.
#[derive(Default)]
pub(crate) struct CountingBlocker {
    pub(crate) acquired: AtomicUsize,
    pub(crate) released: AtomicUsize,
    timed: Mutex<Vec<Duration>>,
}

impl CountingBlocker {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn timed_holds(&self) -> Vec<Duration> {
        self.timed.lock().clone()
    }

    pub(crate) fn balanced(&self) -> bool {
        self.acquired.load(Ordering::SeqCst) == self.released.load(Ordering::SeqCst)
    }
}

impl SuspendBlocker for CountingBlocker {
    fn acquire(&self) {
        self.acquired.fetch_add(1, Ordering::SeqCst);
    }

    fn acquire_timeout(&self, timeout: Duration) {
        self.timed.lock().push(timeout);
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Returns deterministic per-channel samples; flips to failing on demand.
#[derive(Default)]
pub(crate) struct StaticAdc {
    pub(crate) fail: AtomicBool,
}

impl StaticAdc {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn samples(channel: AdcChannel) -> [i32; ADC_SAMPLES_PER_CHANNEL] {
        let base = match channel {
            AdcChannel::Voltage => 3800,
            AdcChannel::Current => 420,
            AdcChannel::Temperature => 310,
            AdcChannel::BatteryId => 1,
            AdcChannel::VrefCalibration => 66,
        };
        [base; ADC_SAMPLES_PER_CHANNEL]
    }

    pub(crate) fn snapshot() -> AdcSnapshot {
        AdcSnapshot {
            voltage: Self::samples(AdcChannel::Voltage),
            current: Self::samples(AdcChannel::Current),
            temperature: Self::samples(AdcChannel::Temperature),
            battery_id: Self::samples(AdcChannel::BatteryId),
        }
    }
}

impl AdcReader for StaticAdc {
    fn read_channel(&self, channel: AdcChannel) -> Result<[i32; ADC_SAMPLES_PER_CHANNEL]> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::adc_read("channel read timed out"));
        }
        Ok(Self::samples(channel))
    }
}

/// Records charger-IC mode switches.
#[derive(Default)]
pub(crate) struct RecordingChargerIc {
    modes: Mutex<Vec<ChargerMode>>,
    pub(crate) fail: AtomicBool,
}

impl RecordingChargerIc {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn modes(&self) -> Vec<ChargerMode> {
        self.modes.lock().clone()
    }
}

impl ChargerIc for RecordingChargerIc {
    fn set_mode(&self, mode: ChargerMode) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::hardware("charger IC not responding"));
        }
        self.modes.lock().push(mode);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComparatorCall {
    Enabled(bool),
    Thresholds(u32, u32),
}

/// Records comparator programming order.
#[derive(Default)]
pub(crate) struct RecordingComparator {
    calls: Mutex<Vec<ComparatorCall>>,
    pub(crate) fail_enable: AtomicBool,
}

impl RecordingComparator {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn calls(&self) -> Vec<ComparatorCall> {
        self.calls.lock().clone()
    }
}

impl VoltageComparator for RecordingComparator {
    fn set_enabled(&self, enabled: bool) -> Result<()> {
        if enabled && self.fail_enable.load(Ordering::SeqCst) {
            return Err(Error::hardware("comparator busy"));
        }
        self.calls.lock().push(ComparatorCall::Enabled(enabled));
        Ok(())
    }

    fn set_thresholds(&self, lower_mv: u32, upper_mv: u32) -> Result<()> {
        self.calls
            .lock()
            .push(ComparatorCall::Thresholds(lower_mv, upper_mv));
        Ok(())
    }
}

/// Records wake-alarm arming and disarming requests.
#[derive(Default)]
pub(crate) struct RecordingWakeAlarm {
    starts: Mutex<Vec<Duration>>,
    pub(crate) stopped: AtomicUsize,
    pub(crate) fail: AtomicBool,
}

impl RecordingWakeAlarm {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn starts(&self) -> Vec<Duration> {
        self.starts.lock().clone()
    }
}

impl WakeAlarm for RecordingWakeAlarm {
    fn start(&self, delay: Duration) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::hardware("alarm slot busy"));
        }
        self.starts.lock().push(delay);
        Ok(())
    }

    fn stop(&self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct RecordingFaultLine {
    pub(crate) masked: AtomicUsize,
}

impl RecordingFaultLine {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl FaultLine for RecordingFaultLine {
    fn mask(&self) {
        self.masked.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct RecordingPower {
    pub(crate) off_count: AtomicUsize,
}

impl RecordingPower {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl PowerControl for RecordingPower {
    fn power_off(&self) {
        self.off_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// A timer plus handles to its fakes and the raw worker queue.
pub(crate) struct TimerFixture {
    pub(crate) timer: Arc<BattTimer>,
    pub(crate) clock: Arc<ManualClock>,
    pub(crate) wake_alarm: Arc<RecordingWakeAlarm>,
    pub(crate) comparator: Arc<RecordingComparator>,
    pub(crate) blocker: Arc<CountingBlocker>,
    pub(crate) rx: UnboundedReceiver<WorkerMsg>,
}

pub(crate) fn timer_fixture() -> TimerFixture {
    let clock = ManualClock::new();
    let wake_alarm = RecordingWakeAlarm::new();
    let comparator = RecordingComparator::new();
    let blocker = CountingBlocker::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let dispatcher = Arc::new(Dispatcher::new(
        tx,
        Arc::clone(&blocker) as Arc<dyn SuspendBlocker>,
    ));
    let timer = Arc::new(BattTimer::new(
        dispatcher,
        Arc::clone(&clock) as Arc<dyn Clock>,
        Arc::clone(&wake_alarm) as Arc<dyn WakeAlarm>,
        Arc::clone(&comparator) as Arc<dyn VoltageComparator>,
        DEFAULT_ALARM_FORCE_THRESHOLD,
    ));
    TimerFixture {
        timer,
        clock,
        wake_alarm,
        comparator,
        blocker,
        rx,
    }
}

pub(crate) fn shared_fixture() -> Arc<Shared> {
    Arc::new(Shared::new(
        StaticAdc::samples(AdcChannel::VrefCalibration),
        StaticAdc::snapshot(),
    ))
}

/// Lets queued worker messages and freshly spawned tasks run on the
/// current-thread test runtime.
pub(crate) async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
