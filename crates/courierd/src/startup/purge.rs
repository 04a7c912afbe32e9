//! Inbox startup action.

use courier_config::QueueStartupAction;

use crate::health::HealthReporter;
use crate::queue::{Queue, QueueError};

/// What the inbox startup action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeOutcome {
    /// No purge was requested.
    Skipped,
    /// The work queue was emptied.
    Purged,
    /// A purge was requested but the queue cannot be purged.
    Unsupported,
}

/// Purges `queue` when `action` asks for it and the queue allows it.
///
/// A queue without purge support is reported and left alone; only a purge
/// that was attempted can fail.
pub(crate) fn apply_startup_action(
    action: QueueStartupAction,
    queue: &dyn Queue,
    reporter: &dyn HealthReporter,
) -> Result<PurgeOutcome, QueueError> {
    if action != QueueStartupAction::Purge {
        return Ok(PurgeOutcome::Skipped);
    }
    let Some(purger) = queue.purger() else {
        reporter.queue_purge_unsupported(queue.uri());
        return Ok(PurgeOutcome::Unsupported);
    };

    reporter.queue_purge_started(queue.uri());
    purger.purge()?;
    reporter.queue_purge_completed(queue.uri());
    Ok(PurgeOutcome::Purged)
}
