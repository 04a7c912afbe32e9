//! Bus messages and the send contract.
//!
//! Messages travel between queues inside a [`TransportMessage`] envelope
//! whose body is the JSON encoding of the typed message.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use courier_config::QueueUri;

use crate::queue::{QueueError, QueueManager};

/// A typed message that can be placed on the bus.
pub trait BusMessage: Serialize + DeserializeOwned {
    /// Stable type name carried in the envelope.
    const MESSAGE_TYPE: &'static str;
}

/// Envelope carried by every queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportMessage {
    message_type: String,
    body: String,
    #[serde(with = "time::serde::rfc3339")]
    sent_at: OffsetDateTime,
}

impl TransportMessage {
    /// Wraps an already-encoded body.
    #[must_use]
    pub fn new(message_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            body: body.into(),
            sent_at: OffsetDateTime::now_utc(),
        }
    }

    /// Encodes a typed message into an envelope.
    pub fn from_message<M: BusMessage>(message: &M) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_string(message)?;
        Ok(Self::new(M::MESSAGE_TYPE, body))
    }

    /// Decodes the body as `M`, provided the envelope carries that type.
    pub fn decode<M: BusMessage>(&self) -> Result<Option<M>, serde_json::Error> {
        if self.message_type != M::MESSAGE_TYPE {
            return Ok(None);
        }
        serde_json::from_str(&self.body).map(Some)
    }

    /// Type name of the wrapped message.
    #[must_use]
    pub fn message_type(&self) -> &str {
        self.message_type.as_str()
    }

    /// Encoded body.
    #[must_use]
    pub fn body(&self) -> &str {
        self.body.as_str()
    }
}

/// Announces that a worker is ready to receive distributed work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStartedEvent {
    /// Location of the worker's inbox work queue.
    pub inbox_work_queue_uri: String,
    /// When the worker finished starting its processing pools.
    #[serde(with = "time::serde::rfc3339")]
    pub date_started: OffsetDateTime,
}

impl WorkerStartedEvent {
    /// Builds the announcement for the inbox at `inbox_work_queue`.
    #[must_use]
    pub fn new(inbox_work_queue: &QueueUri, date_started: OffsetDateTime) -> Self {
        Self {
            inbox_work_queue_uri: inbox_work_queue.to_string(),
            date_started,
        }
    }
}

impl BusMessage for WorkerStartedEvent {
    const MESSAGE_TYPE: &'static str = "courier.worker_started";
}

/// Errors raised while sending a message.
#[derive(Debug, Error)]
pub enum SendError {
    /// The message could not be encoded.
    #[error("failed to encode message: {source}")]
    Encode {
        /// Underlying serialisation error.
        #[from]
        source: serde_json::Error,
    },
    /// The destination queue rejected the message.
    #[error("failed to deliver message to '{destination}': {source}")]
    Delivery {
        /// Queue the message was addressed to.
        destination: QueueUri,
        /// Underlying queue error.
        #[source]
        source: QueueError,
    },
}

/// Delivers envelopes to queues.
pub trait MessageSender: Send + Sync {
    /// Sends `message` to the queue at `destination`.
    fn send(&self, message: &TransportMessage, destination: &QueueUri) -> Result<(), SendError>;
}

/// Sender that enqueues directly onto queues resolved by the queue manager.
#[derive(Clone)]
pub struct QueueMessageSender {
    queues: Arc<QueueManager>,
}

impl QueueMessageSender {
    /// Builds a sender over `queues`.
    #[must_use]
    pub fn new(queues: Arc<QueueManager>) -> Self {
        Self { queues }
    }
}

impl fmt::Debug for QueueMessageSender {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("QueueMessageSender").finish_non_exhaustive()
    }
}

impl MessageSender for QueueMessageSender {
    fn send(&self, message: &TransportMessage, destination: &QueueUri) -> Result<(), SendError> {
        let delivery = |source| SendError::Delivery {
            destination: destination.clone(),
            source,
        };
        let queue = self.queues.get_queue(destination).map_err(delivery)?;
        queue.enqueue(message.clone()).map_err(delivery)
    }
}
