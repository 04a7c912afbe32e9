//! Typed views over the flat configuration fields.
//!
//! Configuration is loaded as flat scalars so each setting can be supplied
//! from a file, the environment, or the command line. The node consumes it
//! through the sections below, which only exist when the corresponding queue
//! role is configured.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::QueueUri;

/// Action applied to the inbox work queue before consumption begins.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum QueueStartupAction {
    /// Leave queued messages in place.
    #[default]
    None,
    /// Discard every queued message before the inbox pool starts.
    Purge,
}

/// Settings shared by every queue role that runs a worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingSection {
    work_queue: QueueUri,
    error_queue: Option<QueueUri>,
    thread_count: usize,
}

impl ProcessingSection {
    /// Builds a section with the thread count exactly as configured.
    #[must_use]
    pub fn new(work_queue: QueueUri, error_queue: Option<QueueUri>, thread_count: usize) -> Self {
        Self {
            work_queue,
            error_queue,
            thread_count,
        }
    }

    /// Queue drained by the role's worker pool.
    #[must_use]
    pub fn work_queue(&self) -> &QueueUri {
        &self.work_queue
    }

    /// Queue receiving messages that failed processing, when configured.
    #[must_use]
    pub fn error_queue(&self) -> Option<&QueueUri> {
        self.error_queue.as_ref()
    }

    /// Number of processing threads for the role.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }
}

/// Inbox settings: processing plus the startup action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxSection {
    processing: ProcessingSection,
    startup_action: QueueStartupAction,
}

impl InboxSection {
    /// Builds the inbox section.
    #[must_use]
    pub fn new(processing: ProcessingSection, startup_action: QueueStartupAction) -> Self {
        Self {
            processing,
            startup_action,
        }
    }

    /// Processing settings for the inbox.
    #[must_use]
    pub fn processing(&self) -> &ProcessingSection {
        &self.processing
    }

    /// Inbox work queue location.
    #[must_use]
    pub fn work_queue(&self) -> &QueueUri {
        self.processing.work_queue()
    }

    /// Number of inbox processing threads.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.processing.thread_count()
    }

    /// Action applied to the work queue before the inbox pool starts.
    #[must_use]
    pub fn startup_action(&self) -> QueueStartupAction {
        self.startup_action
    }
}

/// Present only when the node takes its work from a distributor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSection {
    distributor_control_inbox: QueueUri,
}

impl WorkerSection {
    /// Builds the worker section.
    #[must_use]
    pub fn new(distributor_control_inbox: QueueUri) -> Self {
        Self {
            distributor_control_inbox,
        }
    }

    /// Control inbox of the distributor this worker reports to.
    #[must_use]
    pub fn distributor_control_inbox(&self) -> &QueueUri {
        &self.distributor_control_inbox
    }
}

/// Idle pause schedule for processing threads.
///
/// Each consecutive idle pass doubles the previous pause until `max` is
/// reached. Any processed message resets the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleBackoff {
    initial: Duration,
    max: Duration,
}

impl IdleBackoff {
    /// Builds a schedule; `max` is never allowed below `initial`.
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
        }
    }

    /// Pause taken after the first idle pass.
    #[must_use]
    pub fn initial(&self) -> Duration {
        self.initial
    }

    /// Upper bound on any pause.
    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Pause following `current`.
    #[must_use]
    pub fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).clamp(self.initial, self.max)
    }
}
