//! Test harness utilities for the node startup suites.

mod config_loader;
mod processors;
mod provisioner;
mod queues;
mod reporter;
mod sender;
mod subsystems;
mod world;

pub use config_loader::{
    DISTRIBUTOR_CONTROL_INBOX, FailingConfigLoader, INBOX_ERROR_QUEUE, INBOX_WORK_QUEUE,
    full_config, purging_config, uri, worker_config,
};
pub use processors::{BoundRole, RecordingProcessors};
pub use provisioner::RecordingProvisioner;
pub use queues::{BROKEN_SCHEME, BrokenQueueFactory, FailingManagerHooks, UnpurgeableQueue};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use sender::{MockSender, RecordingSender};
pub use subsystems::CountingSubsystem;
pub use world::{TestWorld, world};
