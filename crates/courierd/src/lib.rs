//! Startup and runtime for Courier bus nodes.
//!
//! A node loads its configuration through [`courier_config`], initialises
//! structured telemetry, and then runs the fixed startup sequence in
//! [`startup`]: queue factories and queues first, then the message handling
//! subsystems, then one worker pool per configured queue role. A node that
//! works for a distributor finishes by announcing its inbox to the
//! distributor's control inbox.
//!
//! Optional subsystems the node was composed without are skipped with an
//! informational event rather than failing startup, and an inbox purge that
//! the queue transport cannot perform is reported as a warning. Every other
//! failure aborts startup with the originating error attached.
//!
//! The collaborators a node talks to are traits so tests can replace them:
//! [`Subsystem`] for pluggable services, [`QueueFactory`] for transports,
//! [`ProcessorFactoryProvider`] for the work done on each pool thread,
//! [`PoolProvisioner`] for starting pools, and [`MessageSender`] for the
//! worker announcement.

mod health;
mod message;
mod node;
mod process;
pub mod processing;
pub mod queue;
mod stage;
pub mod startup;
mod state;
mod subsystem;
mod telemetry;

pub use health::{HealthReporter, StructuredHealthReporter};
pub use message::{
    BusMessage, MessageSender, QueueMessageSender, SendError, TransportMessage,
    WorkerStartedEvent,
};
pub use node::{
    ConfigLoader, Node, NodeComponents, NodeError, StaticConfigLoader, SystemConfigLoader,
    start_node_with,
};
pub use process::{
    RunError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_node, run_node_with,
};
pub use processing::{
    PoolError, PoolProvisioner, PoolSpec, ProcessorFactoryProvider, ProcessorRole,
    ThreadPoolProvisioner, WorkerPoolHandle,
};
pub use queue::{Queue, QueueError, QueueFactory, QueueManager};
pub use stage::{Stage, StageParseError};
pub use startup::{PurgeOutcome, StartupError, StartupPipeline, StartupSequencer};
pub use state::{BootstrapState, BootstrapStateError};
pub use subsystem::{
    Initialisation, PassiveSubsystem, Subsystem, SubsystemError, SubsystemKind, Subsystems,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
