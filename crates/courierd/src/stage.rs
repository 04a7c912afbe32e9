//! The fixed list of node startup stages.
//!
//! Stages are totally ordered. Factories and providers come first so that
//! anything creating or consuming queues finds them initialised, optional
//! subsystems are brought up before any consumer that may rely on them, and
//! the worker announcement runs last because it reports the inbox location.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One step of the node startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Activate the queue manager and initialise every queue factory.
    InitializeQueueFactories,
    /// Materialise configured physical queues when enabled.
    CreateQueues,
    /// Initialise the message handler factory.
    InitializeMessageHandlerFactory,
    /// Initialise the message route provider.
    InitializeMessageRouteProvider,
    /// Initialise the forwarding route provider.
    InitializeForwardingRouteProvider,
    /// Initialise the pipeline factory.
    InitializePipelineFactory,
    /// Initialise the subscription manager when one is present.
    InitializeSubscriptionManager,
    /// Initialise the queue manager (again; activation is idempotent).
    InitializeQueueManager,
    /// Initialise the receive-message-state service when one is present.
    InitializeReceiveMessageStateService,
    /// Initialise the transaction-scope factory.
    InitializeTransactionScopeFactory,
    /// Purge (if requested) and start the inbox worker pool.
    StartInboxProcessing,
    /// Start the control inbox worker pool.
    StartControlInboxProcessing,
    /// Start the outbox worker pool.
    StartOutboxProcessing,
    /// Start the deferred message worker pool on non-worker nodes.
    StartDeferredMessageProcessing,
    /// Announce this worker to its distributor.
    StartWorker,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Self; 15] = [
        Self::InitializeQueueFactories,
        Self::CreateQueues,
        Self::InitializeMessageHandlerFactory,
        Self::InitializeMessageRouteProvider,
        Self::InitializeForwardingRouteProvider,
        Self::InitializePipelineFactory,
        Self::InitializeSubscriptionManager,
        Self::InitializeQueueManager,
        Self::InitializeReceiveMessageStateService,
        Self::InitializeTransactionScopeFactory,
        Self::StartInboxProcessing,
        Self::StartControlInboxProcessing,
        Self::StartOutboxProcessing,
        Self::StartDeferredMessageProcessing,
        Self::StartWorker,
    ];

    /// Zero-based position in [`Stage::ALL`].
    #[must_use]
    pub fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|candidate| *candidate == self)
            .unwrap_or(Self::ALL.len())
    }

    /// The stage that runs after this one.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.position() + 1).copied()
    }

    /// Kebab-case label used in logs and when parsing.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InitializeQueueFactories => "initialize-queue-factories",
            Self::CreateQueues => "create-queues",
            Self::InitializeMessageHandlerFactory => "initialize-message-handler-factory",
            Self::InitializeMessageRouteProvider => "initialize-message-route-provider",
            Self::InitializeForwardingRouteProvider => "initialize-forwarding-route-provider",
            Self::InitializePipelineFactory => "initialize-pipeline-factory",
            Self::InitializeSubscriptionManager => "initialize-subscription-manager",
            Self::InitializeQueueManager => "initialize-queue-manager",
            Self::InitializeReceiveMessageStateService => {
                "initialize-receive-message-state-service"
            }
            Self::InitializeTransactionScopeFactory => "initialize-transaction-scope-factory",
            Self::StartInboxProcessing => "start-inbox-processing",
            Self::StartControlInboxProcessing => "start-control-inbox-processing",
            Self::StartOutboxProcessing => "start-outbox-processing",
            Self::StartDeferredMessageProcessing => "start-deferred-message-processing",
            Self::StartWorker => "start-worker",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Error returned when parsing a stage name fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown startup stage: {0}")]
pub struct StageParseError(String);

impl StageParseError {
    /// Creates a parse error describing the unknown value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the value that could not be parsed.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Stage {
    type Err = StageParseError;

    /// Accepts the kebab-case label; spaces and underscores count as dashes.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised = value
            .trim()
            .to_ascii_lowercase()
            .replace([' ', '_'], "-");
        Self::ALL
            .into_iter()
            .find(|stage| stage.label() == normalised)
            .ok_or_else(|| StageParseError::new(value.trim()))
    }
}
