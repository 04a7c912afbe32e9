//! Runs a node until a termination signal arrives.

mod shutdown;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::StructuredHealthReporter;
use crate::health::HealthReporter;
use crate::node::{ConfigLoader, NodeComponents, NodeError, SystemConfigLoader, start_node_with};
use crate::processing::{PoolError, PoolProvisioner, ThreadPoolProvisioner};

pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Errors surfaced while running the node process.
#[derive(Debug, Error)]
pub enum RunError {
    /// The node failed to start.
    #[error("node startup failed: {source}")]
    Node {
        /// Underlying node error.
        #[source]
        source: NodeError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
    /// A worker pool did not stop cleanly.
    #[error("failed to stop worker pools: {source}")]
    Stop {
        /// Underlying pool error.
        #[source]
        source: PoolError,
    },
}

impl From<NodeError> for RunError {
    fn from(source: NodeError) -> Self {
        Self::Node { source }
    }
}

impl From<ShutdownError> for RunError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}

impl From<PoolError> for RunError {
    fn from(source: PoolError) -> Self {
        Self::Stop { source }
    }
}

/// Runs the node using the production collaborators.
pub fn run_node() -> Result<(), RunError> {
    let reporter = Arc::new(StructuredHealthReporter::new());
    run_node_with(
        &SystemConfigLoader,
        reporter,
        NodeComponents::<ThreadPoolProvisioner>::default(),
        &SystemShutdownSignal,
    )
}

/// Runs the node with injected collaborators.
///
/// Pools are stopped even when waiting for the signal fails; a stop
/// failure takes precedence over the wait failure.
pub fn run_node_with<P>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    components: NodeComponents<P>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), RunError>
where
    P: PoolProvisioner,
{
    let mut node = start_node_with(loader, reporter, components)?;
    info!(
        target: PROCESS_TARGET,
        pools = node.state().len(),
        "node running; waiting for shutdown signal"
    );

    let waited = shutdown.wait();
    node.shutdown()?;
    waited?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
