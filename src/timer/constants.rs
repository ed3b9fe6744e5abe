use std::time::Duration;

/// Wake-alarm interval while suspended with no urgency condition.
pub const BATT_SUSPEND_CHECK_SECS: u32 = 3600;

/// Elapsed-time threshold checked at resume under normal conditions.
pub const BATT_TIMER_CHECK_SECS: u32 = 360;

/// Buffer subtracted from the configured timeout when checking the
/// elapsed total at resume under an urgency condition.
pub const RESUME_CHECK_BUFFER_MS: u64 = 500;

/// Voltage-alarm fire count above which the next PM boundary forces an
/// immediate sample. Overridable through
/// [`MonitorConfig`](crate::monitor::MonitorConfig).
pub const DEFAULT_ALARM_FORCE_THRESHOLD: u32 = 2;

/// Retry hint handed to the PM layer when suspend must be deferred.
pub const SUSPEND_RETRY_AFTER: Duration = Duration::from_millis(100);
