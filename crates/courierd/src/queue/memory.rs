//! In-process queue transport.
//!
//! Every node registers this transport during startup so `memory://` queues
//! are always resolvable. Queues are FIFO and support purge and create.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use courier_config::QueueUri;

use crate::message::TransportMessage;

use super::{CreateQueue, PurgeQueue, Queue, QueueError, QueueFactory};

/// URI scheme served by [`MemoryQueueFactory`].
pub const MEMORY_SCHEME: &str = "memory";

/// Factory for [`MemoryQueue`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryQueueFactory;

impl MemoryQueueFactory {
    /// Builds the factory.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl QueueFactory for MemoryQueueFactory {
    fn scheme(&self) -> &str {
        MEMORY_SCHEME
    }

    fn create(&self, uri: &QueueUri) -> Result<Arc<dyn Queue>, QueueError> {
        Ok(Arc::new(MemoryQueue::new(uri.clone())))
    }
}

/// FIFO queue held in process memory.
#[derive(Debug)]
pub struct MemoryQueue {
    uri: QueueUri,
    messages: Mutex<VecDeque<TransportMessage>>,
}

impl MemoryQueue {
    /// Builds an empty queue.
    #[must_use]
    pub fn new(uri: QueueUri) -> Self {
        Self {
            uri,
            messages: Mutex::new(VecDeque::new()),
        }
    }

    /// Number of queued messages.
    pub fn len(&self) -> Result<usize, QueueError> {
        Ok(self.messages()?.len())
    }

    /// Whether the queue holds no messages.
    pub fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.messages()?.is_empty())
    }

    fn messages(&self) -> Result<MutexGuard<'_, VecDeque<TransportMessage>>, QueueError> {
        self.messages.lock().map_err(|_| QueueError::Poisoned {
            resource: self.uri.to_string(),
        })
    }
}

impl Queue for MemoryQueue {
    fn uri(&self) -> &QueueUri {
        &self.uri
    }

    fn enqueue(&self, message: TransportMessage) -> Result<(), QueueError> {
        self.messages()?.push_back(message);
        Ok(())
    }

    fn dequeue(&self) -> Result<Option<TransportMessage>, QueueError> {
        Ok(self.messages()?.pop_front())
    }

    fn purger(&self) -> Option<&dyn PurgeQueue> {
        Some(self)
    }

    fn creator(&self) -> Option<&dyn CreateQueue> {
        Some(self)
    }
}

impl PurgeQueue for MemoryQueue {
    fn purge(&self) -> Result<(), QueueError> {
        self.messages()?.clear();
        Ok(())
    }
}

impl CreateQueue for MemoryQueue {
    // The backing storage exists as soon as the queue value does.
    fn create(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> MemoryQueue {
        MemoryQueue::new(QueueUri::parse("memory://work").expect("valid uri"))
    }

    fn message(body: &str) -> TransportMessage {
        TransportMessage::new("test.message", body)
    }

    #[test]
    fn dequeues_in_arrival_order() {
        let queue = queue();
        queue.enqueue(message("first")).expect("enqueue");
        queue.enqueue(message("second")).expect("enqueue");

        let first = queue.dequeue().expect("dequeue").expect("message");
        let second = queue.dequeue().expect("dequeue").expect("message");
        assert_eq!(first.body(), "first");
        assert_eq!(second.body(), "second");
        assert!(queue.dequeue().expect("dequeue").is_none());
    }

    #[test]
    fn purge_discards_everything() {
        let queue = queue();
        queue.enqueue(message("stale")).expect("enqueue");
        let purger = queue.purger().expect("memory queues support purge");
        purger.purge().expect("purge");
        assert!(queue.is_empty().expect("length"));
    }
}
