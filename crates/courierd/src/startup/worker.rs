//! Worker announcement sent once every pool has started.

use courier_config::QueueUri;
use time::OffsetDateTime;

use crate::message::{MessageSender, SendError, TransportMessage, WorkerStartedEvent};

/// Sends one [`WorkerStartedEvent`] for `inbox` to `distributor`.
pub(crate) fn announce(
    sender: &dyn MessageSender,
    inbox: &QueueUri,
    distributor: &QueueUri,
    started: OffsetDateTime,
) -> Result<WorkerStartedEvent, SendError> {
    let event = WorkerStartedEvent::new(inbox, started);
    let message = TransportMessage::from_message(&event)?;
    sender.send(&message, distributor)?;
    Ok(event)
}
