use std::time::Duration;

use crate::logging::LogFormat;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Threads draining the inbox when the configuration does not say otherwise.
pub const DEFAULT_INBOX_THREAD_COUNT: usize = 5;

/// Threads draining the control inbox by default.
pub const DEFAULT_CONTROL_INBOX_THREAD_COUNT: usize = 1;

/// Threads draining the outbox by default.
pub const DEFAULT_OUTBOX_THREAD_COUNT: usize = 1;

/// Deferred messages are always drained by a single thread.
pub const DEFERRED_MESSAGE_THREAD_COUNT: usize = 1;

/// First pause taken by an idle processing thread.
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(250);

/// Longest pause taken by an idle processing thread.
pub const DEFAULT_MAX_IDLE_BACKOFF: Duration = Duration::from_secs(5);

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value for serde defaults.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

pub(crate) const fn default_inbox_thread_count() -> usize {
    DEFAULT_INBOX_THREAD_COUNT
}

pub(crate) const fn default_control_inbox_thread_count() -> usize {
    DEFAULT_CONTROL_INBOX_THREAD_COUNT
}

pub(crate) const fn default_outbox_thread_count() -> usize {
    DEFAULT_OUTBOX_THREAD_COUNT
}

pub(crate) fn default_idle_backoff_ms() -> u64 {
    duration_millis(DEFAULT_IDLE_BACKOFF)
}

pub(crate) fn default_max_idle_backoff_ms() -> u64 {
    duration_millis(DEFAULT_MAX_IDLE_BACKOFF)
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
