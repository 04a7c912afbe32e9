//! Worker pools and the processing units they run.
//!
//! A worker pool runs a fixed number of threads for one [`ProcessorRole`].
//! Each thread owns a [`Processor`] built by the role's [`ProcessorFactory`]
//! and calls it repeatedly until the pool is stopped. What a processor does
//! with a message is up to the factory; [`DrainingProcessors`] is the stock
//! choice, handing every message to a [`MessageDispatcher`].

mod drain;
mod pool;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::queue::{Queue, QueueError};
use crate::stage::Stage;

pub use drain::{DispatchError, DrainingProcessors, MessageDispatcher, UnhandledDispatcher};
pub use pool::{
    PoolError, PoolProvisioner, PoolSpec, ProcessorThreadPool, ThreadPoolProvisioner,
    WorkerPoolHandle,
};

pub(crate) const PROCESSING_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::processing");

/// Queue roles that run a worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorRole {
    /// Application messages addressed to this node.
    Inbox,
    /// Control messages, such as distributor coordination.
    ControlInbox,
    /// Messages waiting to leave this node.
    Outbox,
    /// Messages held back until their delivery time.
    DeferredMessage,
}

impl ProcessorRole {
    /// Every role, in startup order.
    pub const ALL: [Self; 4] = [
        Self::Inbox,
        Self::ControlInbox,
        Self::Outbox,
        Self::DeferredMessage,
    ];

    /// Name given to the role's worker pool and its threads.
    #[must_use]
    pub const fn pool_name(self) -> &'static str {
        match self {
            Self::Inbox => "InboxProcessor",
            Self::ControlInbox => "ControlInboxProcessor",
            Self::Outbox => "OutboxProcessor",
            Self::DeferredMessage => "DeferredMessageProcessor",
        }
    }

    /// Key under which the running pool is kept in bootstrap state.
    #[must_use]
    pub const fn state_key(self) -> &'static str {
        match self {
            Self::Inbox => "InboxThreadPool",
            Self::ControlInbox => "ControlInboxThreadPool",
            Self::Outbox => "OutboxThreadPool",
            Self::DeferredMessage => "DeferredMessageThreadPool",
        }
    }

    /// Startup stage that launches the role's pool.
    #[must_use]
    pub const fn stage(self) -> Stage {
        match self {
            Self::Inbox => Stage::StartInboxProcessing,
            Self::ControlInbox => Stage::StartControlInboxProcessing,
            Self::Outbox => Stage::StartOutboxProcessing,
            Self::DeferredMessage => Stage::StartDeferredMessageProcessing,
        }
    }
}

impl fmt::Display for ProcessorRole {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.pool_name())
    }
}

/// Result of one processing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Work {
    /// A message was handled; the thread should go again immediately.
    Processed,
    /// Nothing was available; the thread should back off.
    Idle,
}

/// Errors raised by a processing pass.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The role's queue failed.
    #[error(transparent)]
    Queue(#[from] QueueError),
    /// A message could not be dispatched and had nowhere to go.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// One unit of processing, owned by a single pool thread.
pub trait Processor: Send {
    /// Performs one pass over the role's queue.
    fn execute(&mut self) -> Result<Work, ProcessingError>;
}

/// Builds one [`Processor`] per pool thread.
pub trait ProcessorFactory: Send + Sync {
    /// Builds a processor for a new thread.
    fn create(&self) -> Box<dyn Processor>;
}

/// Queues a role's processors work against.
#[derive(Debug, Clone)]
pub struct RoleQueues {
    /// Queue drained by the role.
    pub work: Arc<dyn Queue>,
    /// Destination for messages that fail processing.
    pub error: Option<Arc<dyn Queue>>,
}

/// Chooses the processor factory for each role.
pub trait ProcessorFactoryProvider: Send + Sync {
    /// Returns the factory for `role`, bound to the role's queues.
    fn factory_for(&self, role: ProcessorRole, queues: RoleQueues) -> Arc<dyn ProcessorFactory>;
}
