//! Test double for [`HealthReporter`] that records structured events for assertions.
//!
//! The recorder captures every lifecycle event emitted during startup and
//! shutdown so tests can check both which events fired and their order.

use std::sync::Mutex;

use courier_config::{Config, QueueUri};

use crate::health::HealthReporter;
use crate::node::NodeError;
use crate::processing::{PoolError, ProcessorRole};
use crate::stage::Stage;
use crate::subsystem::SubsystemKind;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    StartupStarting,
    StartupSucceeded,
    StartupFailed(String),
    StageEntered(Stage),
    SubsystemInitialised(SubsystemKind),
    SubsystemAbsent(SubsystemKind),
    QueuePurgeStarted(String),
    QueuePurgeCompleted(String),
    QueuePurgeUnsupported(String),
    PoolStarted {
        role: ProcessorRole,
        threads: usize,
    },
    WorkerAnnounced {
        inbox: String,
        distributor: String,
    },
    PoolStopped(String),
    PoolStopFailed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Position of the first event equal to `event`.
    #[must_use]
    pub fn position_of(&self, event: &HealthEvent) -> Option<usize> {
        self.events().iter().position(|recorded| recorded == event)
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn startup_starting(&self) {
        self.record(HealthEvent::StartupStarting);
    }

    fn startup_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::StartupSucceeded);
    }

    fn startup_failed(&self, error: &NodeError) {
        self.record(HealthEvent::StartupFailed(error.to_string()));
    }

    fn stage_entered(&self, stage: Stage) {
        self.record(HealthEvent::StageEntered(stage));
    }

    fn subsystem_initialised(&self, kind: SubsystemKind) {
        self.record(HealthEvent::SubsystemInitialised(kind));
    }

    fn subsystem_absent(&self, kind: SubsystemKind) {
        self.record(HealthEvent::SubsystemAbsent(kind));
    }

    fn queue_purge_started(&self, queue: &QueueUri) {
        self.record(HealthEvent::QueuePurgeStarted(queue.to_string()));
    }

    fn queue_purge_completed(&self, queue: &QueueUri) {
        self.record(HealthEvent::QueuePurgeCompleted(queue.to_string()));
    }

    fn queue_purge_unsupported(&self, queue: &QueueUri) {
        self.record(HealthEvent::QueuePurgeUnsupported(queue.to_string()));
    }

    fn pool_started(&self, role: ProcessorRole, thread_count: usize) {
        self.record(HealthEvent::PoolStarted {
            role,
            threads: thread_count,
        });
    }

    fn worker_announced(&self, inbox: &QueueUri, distributor: &QueueUri) {
        self.record(HealthEvent::WorkerAnnounced {
            inbox: inbox.to_string(),
            distributor: distributor.to_string(),
        });
    }

    fn pool_stopped(&self, key: &str) {
        self.record(HealthEvent::PoolStopped(key.to_owned()));
    }

    fn pool_stop_failed(&self, key: &str, _error: &PoolError) {
        self.record(HealthEvent::PoolStopFailed(key.to_owned()));
    }
}
