//! Structured health reporting for node lifecycle events.

use std::sync::Arc;

use courier_config::{Config, QueueUri};

use crate::node::NodeError;
use crate::processing::{PoolError, ProcessorRole};
use crate::stage::Stage;
use crate::subsystem::SubsystemKind;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn startup_starting(&self);

    /// Invoked after every startup stage has run.
    fn startup_succeeded(&self, config: &Config);

    /// Invoked when startup fails.
    fn startup_failed(&self, error: &NodeError);

    /// Invoked as each stage begins.
    fn stage_entered(&self, stage: Stage);

    /// Invoked after a subsystem initialises.
    fn subsystem_initialised(&self, kind: SubsystemKind);

    /// Invoked when an optional subsystem is skipped because it is absent.
    fn subsystem_absent(&self, kind: SubsystemKind);

    /// Invoked before the inbox work queue is purged.
    fn queue_purge_started(&self, queue: &QueueUri);

    /// Invoked once the inbox work queue has been purged.
    fn queue_purge_completed(&self, queue: &QueueUri);

    /// Invoked when a purge was requested but the queue cannot be purged.
    fn queue_purge_unsupported(&self, queue: &QueueUri);

    /// Invoked after a worker pool starts.
    fn pool_started(&self, role: ProcessorRole, thread_count: usize);

    /// Invoked after a worker announces itself to its distributor.
    fn worker_announced(&self, inbox: &QueueUri, distributor: &QueueUri);

    /// Invoked after a pool recorded under `key` stops.
    fn pool_stopped(&self, key: &str);

    /// Invoked when a pool recorded under `key` fails to stop cleanly.
    fn pool_stop_failed(&self, key: &str, error: &PoolError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn startup_starting(&self) {
        (**self).startup_starting();
    }

    fn startup_succeeded(&self, config: &Config) {
        (**self).startup_succeeded(config);
    }

    fn startup_failed(&self, error: &NodeError) {
        (**self).startup_failed(error);
    }

    fn stage_entered(&self, stage: Stage) {
        (**self).stage_entered(stage);
    }

    fn subsystem_initialised(&self, kind: SubsystemKind) {
        (**self).subsystem_initialised(kind);
    }

    fn subsystem_absent(&self, kind: SubsystemKind) {
        (**self).subsystem_absent(kind);
    }

    fn queue_purge_started(&self, queue: &QueueUri) {
        (**self).queue_purge_started(queue);
    }

    fn queue_purge_completed(&self, queue: &QueueUri) {
        (**self).queue_purge_completed(queue);
    }

    fn queue_purge_unsupported(&self, queue: &QueueUri) {
        (**self).queue_purge_unsupported(queue);
    }

    fn pool_started(&self, role: ProcessorRole, thread_count: usize) {
        (**self).pool_started(role, thread_count);
    }

    fn worker_announced(&self, inbox: &QueueUri, distributor: &QueueUri) {
        (**self).worker_announced(inbox, distributor);
    }

    fn pool_stopped(&self, key: &str) {
        (**self).pool_stopped(key);
    }

    fn pool_stop_failed(&self, key: &str, error: &PoolError) {
        (**self).pool_stop_failed(key, error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn startup_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "startup_starting",
            "starting node"
        );
    }

    fn startup_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "startup_succeeded",
            worker = config.is_worker(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "node started"
        );
    }

    fn startup_failed(&self, error: &NodeError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "startup_failed",
            error = %error,
            "node failed to start"
        );
    }

    fn stage_entered(&self, stage: Stage) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "stage_entered",
            stage = %stage,
            "running startup stage"
        );
    }

    fn subsystem_initialised(&self, kind: SubsystemKind) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "subsystem_initialised",
            subsystem = %kind,
            "subsystem initialised"
        );
    }

    fn subsystem_absent(&self, kind: SubsystemKind) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "subsystem_absent",
            subsystem = %kind,
            "no {kind} configured; skipping"
        );
    }

    fn queue_purge_started(&self, queue: &QueueUri) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "queue_purge_started",
            queue = %queue,
            "purging inbox work queue"
        );
    }

    fn queue_purge_completed(&self, queue: &QueueUri) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "queue_purge_completed",
            queue = %queue,
            "inbox work queue purged"
        );
    }

    fn queue_purge_unsupported(&self, queue: &QueueUri) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "queue_purge_unsupported",
            queue = %queue,
            "inbox purge requested but the queue cannot be purged"
        );
    }

    fn pool_started(&self, role: ProcessorRole, thread_count: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "pool_started",
            pool = %role,
            threads = thread_count,
            "worker pool started"
        );
    }

    fn worker_announced(&self, inbox: &QueueUri, distributor: &QueueUri) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "worker_announced",
            inbox = %inbox,
            distributor = %distributor,
            "worker availability sent to distributor"
        );
    }

    fn pool_stopped(&self, key: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "pool_stopped",
            key,
            "worker pool stopped"
        );
    }

    fn pool_stop_failed(&self, key: &str, error: &PoolError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "pool_stop_failed",
            key,
            error = %error,
            "worker pool did not stop cleanly"
        );
    }
}
