//! Shared configuration for Courier bus nodes.
//!
//! [`Config`] is layered by `ortho_config`: built-in defaults, then a TOML
//! file (`--config-path` or `COURIER_CONFIG_PATH`), then `COURIER_*`
//! environment variables, then command-line flags. The fields are flat so
//! every layer can reach every setting; the node reads them through the
//! typed sections in [`sections`].

use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod queue_uri;
pub mod sections;

pub use defaults::{
    DEFAULT_CONTROL_INBOX_THREAD_COUNT, DEFAULT_IDLE_BACKOFF, DEFAULT_INBOX_THREAD_COUNT,
    DEFAULT_LOG_FILTER, DEFAULT_MAX_IDLE_BACKOFF, DEFAULT_OUTBOX_THREAD_COUNT,
    DEFERRED_MESSAGE_THREAD_COUNT, default_log_filter, default_log_filter_string,
    default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use queue_uri::{QueueUri, QueueUriParseError};
pub use sections::{
    IdleBackoff, InboxSection, ProcessingSection, QueueStartupAction, WorkerSection,
};

/// Resolved node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "COURIER")]
pub struct Config {
    /// `tracing` filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Log record format.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
    /// Materialise every configured queue during startup.
    #[serde(default)]
    pub create_queues: bool,
    /// Inbox work queue; the inbox is disabled when absent.
    #[serde(default)]
    pub inbox_work_queue: Option<QueueUri>,
    /// Inbox error queue.
    #[serde(default)]
    pub inbox_error_queue: Option<QueueUri>,
    /// Inbox processing threads.
    #[serde(default = "defaults::default_inbox_thread_count")]
    pub inbox_thread_count: usize,
    /// Action applied to the inbox work queue before consumption.
    #[serde(default)]
    pub inbox_startup_action: QueueStartupAction,
    /// Control inbox work queue; the control inbox is disabled when absent.
    #[serde(default)]
    pub control_inbox_work_queue: Option<QueueUri>,
    /// Control inbox error queue.
    #[serde(default)]
    pub control_inbox_error_queue: Option<QueueUri>,
    /// Control inbox processing threads.
    #[serde(default = "defaults::default_control_inbox_thread_count")]
    pub control_inbox_thread_count: usize,
    /// Outbox work queue; the outbox is disabled when absent.
    #[serde(default)]
    pub outbox_work_queue: Option<QueueUri>,
    /// Outbox error queue.
    #[serde(default)]
    pub outbox_error_queue: Option<QueueUri>,
    /// Outbox processing threads.
    #[serde(default = "defaults::default_outbox_thread_count")]
    pub outbox_thread_count: usize,
    /// Queue holding messages deferred for later delivery.
    #[serde(default)]
    pub deferred_queue: Option<QueueUri>,
    /// Distributor control inbox; setting it makes this node a worker.
    #[serde(default)]
    pub distributor_control_inbox: Option<QueueUri>,
    /// First idle pause for processing threads, in milliseconds.
    #[serde(default = "defaults::default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
    /// Longest idle pause for processing threads, in milliseconds.
    #[serde(default = "defaults::default_max_idle_backoff_ms")]
    pub max_idle_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            create_queues: false,
            inbox_work_queue: None,
            inbox_error_queue: None,
            inbox_thread_count: DEFAULT_INBOX_THREAD_COUNT,
            inbox_startup_action: QueueStartupAction::default(),
            control_inbox_work_queue: None,
            control_inbox_error_queue: None,
            control_inbox_thread_count: DEFAULT_CONTROL_INBOX_THREAD_COUNT,
            outbox_work_queue: None,
            outbox_error_queue: None,
            outbox_thread_count: DEFAULT_OUTBOX_THREAD_COUNT,
            deferred_queue: None,
            distributor_control_inbox: None,
            idle_backoff_ms: defaults::default_idle_backoff_ms(),
            max_idle_backoff_ms: defaults::default_max_idle_backoff_ms(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    pub fn load_layered() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration from an explicit argument list.
    pub fn load_layered_from<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Active log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Active log format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Whether physical queues are created during startup.
    #[must_use]
    pub fn create_queues(&self) -> bool {
        self.create_queues
    }

    /// Inbox settings, when the inbox is configured.
    #[must_use]
    pub fn inbox(&self) -> Option<InboxSection> {
        let work_queue = self.inbox_work_queue.clone()?;
        let processing = ProcessingSection::new(
            work_queue,
            self.inbox_error_queue.clone(),
            self.inbox_thread_count,
        );
        Some(InboxSection::new(processing, self.inbox_startup_action))
    }

    /// Control inbox settings, when configured.
    #[must_use]
    pub fn control_inbox(&self) -> Option<ProcessingSection> {
        let work_queue = self.control_inbox_work_queue.clone()?;
        Some(ProcessingSection::new(
            work_queue,
            self.control_inbox_error_queue.clone(),
            self.control_inbox_thread_count,
        ))
    }

    /// Outbox settings, when configured.
    #[must_use]
    pub fn outbox(&self) -> Option<ProcessingSection> {
        let work_queue = self.outbox_work_queue.clone()?;
        Some(ProcessingSection::new(
            work_queue,
            self.outbox_error_queue.clone(),
            self.outbox_thread_count,
        ))
    }

    /// Deferred message queue, when configured.
    #[must_use]
    pub fn deferred_queue(&self) -> Option<&QueueUri> {
        self.deferred_queue.as_ref()
    }

    /// Worker settings, present when the node reports to a distributor.
    #[must_use]
    pub fn worker(&self) -> Option<WorkerSection> {
        self.distributor_control_inbox
            .clone()
            .map(WorkerSection::new)
    }

    /// Whether this node takes its work from a distributor.
    #[must_use]
    pub fn is_worker(&self) -> bool {
        self.distributor_control_inbox.is_some()
    }

    /// Idle pause schedule for processing threads.
    #[must_use]
    pub fn idle_backoff(&self) -> IdleBackoff {
        IdleBackoff::new(
            Duration::from_millis(self.idle_backoff_ms),
            Duration::from_millis(self.max_idle_backoff_ms),
        )
    }

    /// Every local queue named by the configuration, without duplicates.
    ///
    /// The distributor's control inbox belongs to another node and is not
    /// included.
    #[must_use]
    pub fn configured_queues(&self) -> Vec<QueueUri> {
        let candidates = [
            &self.inbox_work_queue,
            &self.inbox_error_queue,
            &self.control_inbox_work_queue,
            &self.control_inbox_error_queue,
            &self.outbox_work_queue,
            &self.outbox_error_queue,
            &self.deferred_queue,
        ];
        let mut queues: Vec<QueueUri> = Vec::new();
        for uri in candidates.into_iter().flatten() {
            if !queues.contains(uri) {
                queues.push(uri.clone());
            }
        }
        queues
    }
}
