//! Node composition, startup, and shutdown.

use std::fmt;
use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use courier_config::Config;

use crate::health::HealthReporter;
use crate::message::MessageSender;
use crate::processing::{
    DrainingProcessors, PoolError, PoolProvisioner, ProcessorFactoryProvider,
    ThreadPoolProvisioner,
};
use crate::queue::QueueManager;
use crate::startup::{StartupError, StartupPipeline, StartupSequencer};
use crate::state::BootstrapState;
use crate::subsystem::{Subsystem, SubsystemKind, Subsystems};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the node configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that reads defaults, file, environment, and command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_layered()
    }
}

/// Loader that returns a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Collaborators a node is composed from.
///
/// Defaults: passive required subsystems with no optional ones, a fresh
/// queue manager, draining processors, and a sender that enqueues through
/// the node's own queue manager.
pub struct NodeComponents<P> {
    pub(crate) queues: Arc<QueueManager>,
    pub(crate) subsystems: Subsystems,
    pub(crate) processors: Arc<dyn ProcessorFactoryProvider>,
    pub(crate) provisioner: P,
    pub(crate) sender: Option<Arc<dyn MessageSender>>,
}

impl<P> NodeComponents<P> {
    /// Default components starting pools through `provisioner`.
    #[must_use]
    pub fn new(provisioner: P) -> Self {
        Self {
            queues: Arc::new(QueueManager::new()),
            subsystems: Subsystems::new(),
            processors: Arc::new(DrainingProcessors::default()),
            provisioner,
            sender: None,
        }
    }

    /// Queue manager shared by startup, processing, and sending.
    ///
    /// Register extra queue factories here before starting the node.
    #[must_use]
    pub fn queues(&self) -> &Arc<QueueManager> {
        &self.queues
    }

    /// Replaces the queue manager, for example one built with hooks.
    #[must_use]
    pub fn with_queue_manager(mut self, queues: Arc<QueueManager>) -> Self {
        self.queues = queues;
        self
    }

    /// Installs the implementation for `kind`; optional kinds become present.
    #[must_use]
    pub fn with_subsystem(mut self, kind: SubsystemKind, subsystem: Arc<dyn Subsystem>) -> Self {
        self.subsystems = self.subsystems.with(kind, subsystem);
        self
    }

    /// Replaces the provider of per-role processors.
    #[must_use]
    pub fn with_processors(mut self, processors: Arc<dyn ProcessorFactoryProvider>) -> Self {
        self.processors = processors;
        self
    }

    /// Sends the worker announcement through `sender`.
    #[must_use]
    pub fn with_sender(mut self, sender: Arc<dyn MessageSender>) -> Self {
        self.sender = Some(sender);
        self
    }
}

impl Default for NodeComponents<ThreadPoolProvisioner> {
    fn default() -> Self {
        Self::new(ThreadPoolProvisioner)
    }
}

impl<P> fmt::Debug for NodeComponents<P> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("NodeComponents")
            .field("queues", &self.queues)
            .field("subsystems", &self.subsystems)
            .field("custom_sender", &self.sender.is_some())
            .finish_non_exhaustive()
    }
}

/// Errors surfaced while starting a node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// A startup stage failed.
    #[error("startup failed: {source}")]
    Startup {
        /// Underlying startup error.
        #[source]
        source: StartupError,
    },
}

/// A started node and the pools it runs.
pub struct Node {
    config: Config,
    state: BootstrapState,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Node {
    /// Configuration the node was started with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Pools started during startup.
    #[must_use]
    pub fn state(&self) -> &BootstrapState {
        &self.state
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Stops every pool, most recently started first.
    ///
    /// Every pool is asked to stop even when an earlier one fails; the first
    /// failure is returned.
    pub fn shutdown(&mut self) -> Result<(), PoolError> {
        let mut first_failure = None;
        for (key, mut pool) in self.state.drain_reverse() {
            match pool.stop() {
                Ok(()) => self.reporter.pool_stopped(&key),
                Err(error) => {
                    self.reporter.pool_stop_failed(&key, &error);
                    if first_failure.is_none() {
                        first_failure = Some(error);
                    }
                }
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Node")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Starts a node using the supplied collaborators.
///
/// Loads configuration, initialises telemetry, then runs every startup
/// stage in order. Pools started before a failing stage are stopped when
/// the partially filled state is dropped.
pub fn start_node_with<P>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    components: NodeComponents<P>,
) -> Result<Node, NodeError>
where
    P: PoolProvisioner,
{
    reporter.startup_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = NodeError::Configuration { source };
            reporter.startup_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = NodeError::Telemetry { source };
            reporter.startup_failed(&error);
            return Err(error);
        }
    };

    let mut sequencer = StartupSequencer::new(config.clone(), components, Arc::clone(&reporter));
    let mut state = BootstrapState::new();
    if let Err(source) = StartupPipeline::new().run(&mut sequencer, &mut state) {
        let error = NodeError::Startup { source };
        reporter.startup_failed(&error);
        return Err(error);
    }

    reporter.startup_succeeded(&config);
    Ok(Node {
        config,
        state,
        telemetry,
        reporter,
    })
}
