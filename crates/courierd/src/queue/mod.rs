//! Queue contracts and the queue manager.
//!
//! Transports plug in through [`QueueFactory`], keyed by URI scheme. Optional
//! queue operations are exposed as capability queries returning `Option`, so
//! a caller can tell a queue cannot be purged without attempting the purge.

mod manager;
mod memory;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use courier_config::{Config, QueueUri};

use crate::message::TransportMessage;

pub use manager::{QueueManager, QueueManagerHooks};
pub use memory::{MEMORY_SCHEME, MemoryQueue, MemoryQueueFactory};

const QUEUE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::queue");

/// An addressable work queue.
pub trait Queue: Send + Sync + fmt::Debug {
    /// Location identifying this queue.
    fn uri(&self) -> &QueueUri;

    /// Appends a message.
    fn enqueue(&self, message: TransportMessage) -> Result<(), QueueError>;

    /// Removes and returns the next message, if any.
    fn dequeue(&self) -> Result<Option<TransportMessage>, QueueError>;

    /// Purge capability, when the transport supports it.
    fn purger(&self) -> Option<&dyn PurgeQueue> {
        None
    }

    /// Create capability, when the transport supports it.
    fn creator(&self) -> Option<&dyn CreateQueue> {
        None
    }
}

/// Discards every message currently held by a queue.
pub trait PurgeQueue {
    /// Empties the queue.
    fn purge(&self) -> Result<(), QueueError>;
}

/// Materialises the physical queue behind a location.
pub trait CreateQueue {
    /// Creates the queue if it does not exist yet.
    fn create(&self) -> Result<(), QueueError>;
}

/// Builds queues for one URI scheme.
pub trait QueueFactory: Send + Sync {
    /// Scheme handled by this factory, such as `memory`.
    fn scheme(&self) -> &str;

    /// Prepares the factory for use; must tolerate repeated calls.
    fn attempt_initialization(&self, _config: &Config) -> Result<(), QueueError> {
        Ok(())
    }

    /// Builds the queue addressed by `uri`.
    fn create(&self, uri: &QueueUri) -> Result<Arc<dyn Queue>, QueueError>;
}

/// Errors raised by queues, factories, and the queue manager.
#[derive(Debug, Error)]
pub enum QueueError {
    /// No registered factory handles the location's scheme.
    #[error("no queue factory registered for scheme '{scheme}' (queue '{uri}')")]
    UnsupportedScheme {
        /// Scheme that had no factory.
        scheme: String,
        /// Queue that could not be resolved.
        uri: QueueUri,
    },
    /// A queue factory could not be initialised.
    #[error("queue factory '{scheme}' failed to initialise: {message}")]
    FactoryInitialization {
        /// Scheme of the failing factory.
        scheme: String,
        /// Failure description.
        message: String,
    },
    /// The queue manager's hooks failed during activation.
    #[error("queue manager failed to initialise: {message}")]
    ManagerInitialization {
        /// Failure description.
        message: String,
    },
    /// The transport rejected an operation.
    #[error("queue '{uri}' {operation} failed: {message}")]
    Transport {
        /// Queue the operation targeted.
        uri: QueueUri,
        /// Operation that failed.
        operation: &'static str,
        /// Failure description.
        message: String,
    },
    /// A lock protecting queue state was poisoned by a panicking thread.
    #[error("queue state for '{resource}' is poisoned")]
    Poisoned {
        /// Queue or registry whose lock was poisoned.
        resource: String,
    },
}
