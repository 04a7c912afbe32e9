//! Message sender doubles.

use std::sync::Mutex;

use courier_config::QueueUri;
use mockall::mock;

use crate::message::{MessageSender, SendError, TransportMessage, WorkerStartedEvent};
use crate::queue::QueueError;

mock! {
    pub Sender {}

    impl MessageSender for Sender {
        fn send(&self, message: &TransportMessage, destination: &QueueUri) -> Result<(), SendError>;
    }
}

/// Sender that keeps every message it is handed.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(TransportMessage, QueueUri)>>,
    reject: bool,
}

impl RecordingSender {
    /// A sender whose destination always rejects delivery.
    #[must_use]
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sent(&self) -> Vec<(TransportMessage, QueueUri)> {
        self.sent.lock().expect("sender mutex poisoned").clone()
    }

    /// Decoded worker announcements with their destinations.
    #[must_use]
    pub fn announcements(&self) -> Vec<(WorkerStartedEvent, QueueUri)> {
        self.sent()
            .into_iter()
            .filter_map(|(message, destination)| {
                message
                    .decode::<WorkerStartedEvent>()
                    .expect("announcement should decode")
                    .map(|event| (event, destination))
            })
            .collect()
    }
}

impl MessageSender for RecordingSender {
    fn send(&self, message: &TransportMessage, destination: &QueueUri) -> Result<(), SendError> {
        if self.reject {
            return Err(SendError::Delivery {
                destination: destination.clone(),
                source: QueueError::Transport {
                    uri: destination.clone(),
                    operation: "enqueue",
                    message: String::from("destination unavailable"),
                },
            });
        }
        self.sent
            .lock()
            .expect("sender mutex poisoned")
            .push((message.clone(), destination.clone()));
        Ok(())
    }
}
