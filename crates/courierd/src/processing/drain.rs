//! Stock processors: drain the role queue into a dispatcher.

use std::sync::Arc;

use thiserror::Error;

use crate::message::TransportMessage;

use super::{
    PROCESSING_TARGET, ProcessingError, Processor, ProcessorFactory, ProcessorFactoryProvider,
    ProcessorRole, RoleQueues, Work,
};

/// Failure reported by a [`MessageDispatcher`].
#[derive(Debug, Error)]
#[error("{role} could not dispatch '{message_type}': {reason}")]
pub struct DispatchError {
    role: ProcessorRole,
    message_type: String,
    reason: String,
}

impl DispatchError {
    /// Builds a dispatch failure for `message`.
    #[must_use]
    pub fn new(role: ProcessorRole, message: &TransportMessage, reason: impl Into<String>) -> Self {
        Self {
            role,
            message_type: message.message_type().to_owned(),
            reason: reason.into(),
        }
    }

    /// Role whose processor failed.
    #[must_use]
    pub fn role(&self) -> ProcessorRole {
        self.role
    }
}

/// Hands dequeued messages to the node's message handling.
pub trait MessageDispatcher: Send + Sync {
    /// Handles `message` received on `role`'s queue.
    fn dispatch(&self, role: ProcessorRole, message: &TransportMessage)
    -> Result<(), DispatchError>;
}

/// Dispatcher for nodes composed without message handling.
///
/// Every message is rejected, so it lands on the role's error queue (or back
/// on its work queue) instead of being consumed.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnhandledDispatcher;

impl MessageDispatcher for UnhandledDispatcher {
    fn dispatch(
        &self,
        role: ProcessorRole,
        message: &TransportMessage,
    ) -> Result<(), DispatchError> {
        Err(DispatchError::new(role, message, "no message handler installed"))
    }
}

/// Provider building draining processors for every role.
#[derive(Clone)]
pub struct DrainingProcessors {
    dispatcher: Arc<dyn MessageDispatcher>,
}

impl DrainingProcessors {
    /// Builds a provider dispatching through `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Arc<dyn MessageDispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl Default for DrainingProcessors {
    fn default() -> Self {
        Self::new(Arc::new(UnhandledDispatcher))
    }
}

impl ProcessorFactoryProvider for DrainingProcessors {
    fn factory_for(&self, role: ProcessorRole, queues: RoleQueues) -> Arc<dyn ProcessorFactory> {
        Arc::new(DrainFactory {
            role,
            queues,
            dispatcher: Arc::clone(&self.dispatcher),
        })
    }
}

struct DrainFactory {
    role: ProcessorRole,
    queues: RoleQueues,
    dispatcher: Arc<dyn MessageDispatcher>,
}

impl ProcessorFactory for DrainFactory {
    fn create(&self) -> Box<dyn Processor> {
        Box::new(DrainProcessor {
            role: self.role,
            queues: self.queues.clone(),
            dispatcher: Arc::clone(&self.dispatcher),
        })
    }
}

struct DrainProcessor {
    role: ProcessorRole,
    queues: RoleQueues,
    dispatcher: Arc<dyn MessageDispatcher>,
}

impl Processor for DrainProcessor {
    fn execute(&mut self) -> Result<Work, ProcessingError> {
        let Some(message) = self.queues.work.dequeue()? else {
            return Ok(Work::Idle);
        };

        if let Err(error) = self.dispatcher.dispatch(self.role, &message) {
            let Some(error_queue) = self.queues.error.as_ref() else {
                self.queues.work.enqueue(message)?;
                return Err(error.into());
            };
            tracing::warn!(
                target: PROCESSING_TARGET,
                role = %self.role,
                error_queue = %error_queue.uri(),
                error = %error,
                "dispatch failed; moving message to error queue"
            );
            error_queue.enqueue(message)?;
        }
        Ok(Work::Processed)
    }
}
