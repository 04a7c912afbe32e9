//! Queue transports with limited capabilities.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use courier_config::{Config, QueueUri};

use crate::message::TransportMessage;
use crate::queue::{Queue, QueueError, QueueFactory, QueueManagerHooks};

/// Scheme served by [`UnpurgeableQueueFactory`].
pub const UNPURGEABLE_SCHEME: &str = "nopurge";

/// Scheme served by [`BrokenQueueFactory`].
pub const BROKEN_SCHEME: &str = "broken";

/// FIFO queue that exposes neither purge nor create.
#[derive(Debug)]
pub struct UnpurgeableQueue {
    uri: QueueUri,
    messages: Mutex<VecDeque<TransportMessage>>,
}

impl UnpurgeableQueue {
    #[must_use]
    pub fn new(uri: QueueUri) -> Self {
        Self {
            uri,
            messages: Mutex::new(VecDeque::new()),
        }
    }
}

impl Queue for UnpurgeableQueue {
    fn uri(&self) -> &QueueUri {
        &self.uri
    }

    fn enqueue(&self, message: TransportMessage) -> Result<(), QueueError> {
        self.messages
            .lock()
            .expect("queue mutex poisoned")
            .push_back(message);
        Ok(())
    }

    fn dequeue(&self) -> Result<Option<TransportMessage>, QueueError> {
        Ok(self.messages.lock().expect("queue mutex poisoned").pop_front())
    }
}

#[derive(Debug, Default)]
pub struct UnpurgeableQueueFactory;

impl QueueFactory for UnpurgeableQueueFactory {
    fn scheme(&self) -> &str {
        UNPURGEABLE_SCHEME
    }

    fn create(&self, uri: &QueueUri) -> Result<Arc<dyn Queue>, QueueError> {
        Ok(Arc::new(UnpurgeableQueue::new(uri.clone())))
    }
}

/// Factory whose initialisation always fails.
#[derive(Debug, Default)]
pub struct BrokenQueueFactory;

impl QueueFactory for BrokenQueueFactory {
    fn scheme(&self) -> &str {
        BROKEN_SCHEME
    }

    fn attempt_initialization(&self, _config: &Config) -> Result<(), QueueError> {
        Err(QueueError::FactoryInitialization {
            scheme: BROKEN_SCHEME.to_owned(),
            message: String::from("broker unreachable"),
        })
    }

    fn create(&self, uri: &QueueUri) -> Result<Arc<dyn Queue>, QueueError> {
        Err(QueueError::UnsupportedScheme {
            scheme: BROKEN_SCHEME.to_owned(),
            uri: uri.clone(),
        })
    }
}

/// Queue manager hooks whose activation always fails.
#[derive(Debug, Default)]
pub struct FailingManagerHooks;

impl QueueManagerHooks for FailingManagerHooks {
    fn attempt_initialization(&self, _config: &Config) -> Result<(), QueueError> {
        Err(QueueError::ManagerInitialization {
            message: String::from("broker connection refused"),
        })
    }
}
