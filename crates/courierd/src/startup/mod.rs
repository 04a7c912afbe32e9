//! The startup sequence that brings a node from configuration to running
//! worker pools.
//!
//! [`StartupSequencer`] exposes one method per [`Stage`] plus
//! [`StartupSequencer::execute`], which dispatches on the stage. It holds no
//! record of which stages have run; [`StartupPipeline`] drives it through
//! [`Stage::ALL`] exactly once and in order. Started pools are recorded in
//! the caller's [`BootstrapState`].
//!
//! Absent optional subsystems and inbox queues that cannot be purged are
//! reported and skipped. Every other failure aborts the sequence with a
//! [`StartupError`] naming the stage; pools started by earlier stages are
//! left running in the bootstrap state.

mod pipeline;
mod purge;
mod worker;

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};

use courier_config::{Config, DEFERRED_MESSAGE_THREAD_COUNT, ProcessingSection, QueueUri};

use crate::health::HealthReporter;
use crate::message::{MessageSender, QueueMessageSender, SendError};
use crate::node::NodeComponents;
use crate::processing::{
    PoolError, PoolProvisioner, PoolSpec, ProcessorFactoryProvider, ProcessorRole, RoleQueues,
};
use crate::queue::{MemoryQueueFactory, Queue, QueueError, QueueManager};
use crate::stage::Stage;
use crate::state::{BootstrapState, BootstrapStateError};
use crate::subsystem::{Initialisation, SubsystemError, SubsystemKind, Subsystems};

pub use pipeline::StartupPipeline;
pub use purge::PurgeOutcome;

const STARTUP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::startup");

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A queue factory or the queue manager failed.
    #[error("{stage}: queue subsystem failed: {source}")]
    Queue {
        /// Stage that failed.
        stage: Stage,
        /// Underlying queue error.
        #[source]
        source: QueueError,
    },
    /// A subsystem failed to initialise.
    #[error("{stage}: {source}")]
    Subsystem {
        /// Stage that failed.
        stage: Stage,
        /// Underlying subsystem error.
        #[source]
        source: SubsystemError,
    },
    /// A role's work or error queue could not be resolved.
    #[error("{stage}: failed to resolve queues for {role}: {source}")]
    QueueResolution {
        /// Stage that failed.
        stage: Stage,
        /// Role whose queues were requested.
        role: ProcessorRole,
        /// Underlying queue error.
        #[source]
        source: QueueError,
    },
    /// The inbox work queue supports purging but the purge failed.
    #[error("{stage}: failed to purge '{queue}': {source}")]
    Purge {
        /// Stage that failed.
        stage: Stage,
        /// Queue being purged.
        queue: QueueUri,
        /// Underlying queue error.
        #[source]
        source: QueueError,
    },
    /// A worker pool failed to start.
    #[error("{stage}: failed to start {role}: {source}")]
    PoolStart {
        /// Stage that failed.
        stage: Stage,
        /// Role whose pool failed.
        role: ProcessorRole,
        /// Underlying pool error.
        #[source]
        source: PoolError,
    },
    /// A pool handle could not be recorded.
    #[error("{stage}: {source}")]
    State {
        /// Stage that failed.
        stage: Stage,
        /// Underlying state error.
        #[source]
        source: BootstrapStateError,
    },
    /// The node is a worker but has no inbox to announce.
    #[error("{stage}: worker nodes require an inbox work queue")]
    WorkerWithoutInbox {
        /// Stage that failed.
        stage: Stage,
    },
    /// The worker announcement could not be sent.
    #[error("{stage}: failed to announce worker to '{distributor}': {source}")]
    Announcement {
        /// Stage that failed.
        stage: Stage,
        /// Distributor control inbox.
        distributor: QueueUri,
        /// Underlying send error.
        #[source]
        source: SendError,
    },
    /// A stage was requested out of order.
    #[error("stage {requested} requested out of order (expected {expected:?})")]
    OutOfOrder {
        /// Stage the pipeline expected next, if any.
        expected: Option<Stage>,
        /// Stage that was requested.
        requested: Stage,
    },
    /// An earlier stage failed, so no further stage may run.
    #[error("startup already aborted at {stage}")]
    Aborted {
        /// Stage that failed first.
        stage: Stage,
    },
}

impl StartupError {
    /// Stage the error is attributed to.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Queue { stage, .. }
            | Self::Subsystem { stage, .. }
            | Self::QueueResolution { stage, .. }
            | Self::Purge { stage, .. }
            | Self::PoolStart { stage, .. }
            | Self::State { stage, .. }
            | Self::WorkerWithoutInbox { stage }
            | Self::Announcement { stage, .. }
            | Self::Aborted { stage } => *stage,
            Self::OutOfOrder { requested, .. } => *requested,
        }
    }
}

/// Runs startup stages against one node's configuration and collaborators.
pub struct StartupSequencer<P> {
    config: Config,
    queues: Arc<QueueManager>,
    subsystems: Subsystems,
    processors: Arc<dyn ProcessorFactoryProvider>,
    provisioner: P,
    sender: Arc<dyn MessageSender>,
    reporter: Arc<dyn HealthReporter>,
}

impl<P> StartupSequencer<P>
where
    P: PoolProvisioner,
{
    /// Builds a sequencer from a node's configuration and components.
    ///
    /// Without an explicit sender the worker announcement is enqueued
    /// through the node's own queue manager.
    #[must_use]
    pub fn new(
        config: Config,
        components: NodeComponents<P>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        let NodeComponents {
            queues,
            subsystems,
            processors,
            provisioner,
            sender,
        } = components;
        let sender =
            sender.unwrap_or_else(|| Arc::new(QueueMessageSender::new(Arc::clone(&queues))));
        Self {
            config,
            queues,
            subsystems,
            processors,
            provisioner,
            sender,
            reporter,
        }
    }

    /// Configuration every stage reads.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Queue manager shared with processing and sending.
    #[must_use]
    pub fn queues(&self) -> &Arc<QueueManager> {
        &self.queues
    }

    /// Installed subsystems and their initialisation state.
    #[must_use]
    pub fn subsystems(&self) -> &Subsystems {
        &self.subsystems
    }

    /// Runs `stage`.
    pub fn execute(
        &mut self,
        stage: Stage,
        state: &mut BootstrapState,
    ) -> Result<(), StartupError> {
        self.reporter.stage_entered(stage);
        match stage {
            Stage::InitializeQueueFactories => self.initialize_queue_factories(),
            Stage::CreateQueues => self.create_queues(),
            Stage::InitializeMessageHandlerFactory => self.initialize_message_handler_factory(),
            Stage::InitializeMessageRouteProvider => self.initialize_message_route_provider(),
            Stage::InitializeForwardingRouteProvider => {
                self.initialize_forwarding_route_provider()
            }
            Stage::InitializePipelineFactory => self.initialize_pipeline_factory(),
            Stage::InitializeSubscriptionManager => self.initialize_subscription_manager(),
            Stage::InitializeQueueManager => self.initialize_queue_manager(),
            Stage::InitializeReceiveMessageStateService => {
                self.initialize_receive_message_state_service()
            }
            Stage::InitializeTransactionScopeFactory => {
                self.initialize_transaction_scope_factory()
            }
            Stage::StartInboxProcessing => self.start_inbox_processing(state),
            Stage::StartControlInboxProcessing => self.start_control_inbox_processing(state),
            Stage::StartOutboxProcessing => self.start_outbox_processing(state),
            Stage::StartDeferredMessageProcessing => self.start_deferred_message_processing(state),
            Stage::StartWorker => self.start_worker(),
        }
    }

    /// Activates the queue manager, registers the in-memory transport, and
    /// initialises every registered queue factory.
    pub fn initialize_queue_factories(&mut self) -> Result<(), StartupError> {
        let stage = Stage::InitializeQueueFactories;
        let queue_error = |source| StartupError::Queue { stage, source };

        self.queues
            .attempt_initialization(&self.config)
            .map_err(queue_error)?;
        self.queues
            .register_queue_factory(Arc::new(MemoryQueueFactory::new()))
            .map_err(queue_error)?;
        for factory in self.queues.queue_factories().map_err(queue_error)? {
            factory
                .attempt_initialization(&self.config)
                .map_err(queue_error)?;
            debug!(
                target: STARTUP_TARGET,
                scheme = factory.scheme(),
                "queue factory initialised"
            );
        }
        Ok(())
    }

    /// Materialises configured queues when `create_queues` is set.
    pub fn create_queues(&mut self) -> Result<(), StartupError> {
        if !self.config.create_queues() {
            debug!(target: STARTUP_TARGET, "queue creation disabled");
            return Ok(());
        }
        let created = self
            .queues
            .create_physical_queues(&self.config)
            .map_err(|source| StartupError::Queue {
                stage: Stage::CreateQueues,
                source,
            })?;
        debug!(target: STARTUP_TARGET, created, "physical queues created");
        Ok(())
    }

    /// Initialises the message handler factory.
    pub fn initialize_message_handler_factory(&mut self) -> Result<(), StartupError> {
        self.initialize_subsystem(
            Stage::InitializeMessageHandlerFactory,
            SubsystemKind::MessageHandlerFactory,
        )
    }

    /// Initialises the message route provider.
    pub fn initialize_message_route_provider(&mut self) -> Result<(), StartupError> {
        self.initialize_subsystem(
            Stage::InitializeMessageRouteProvider,
            SubsystemKind::MessageRouteProvider,
        )
    }

    /// Initialises the forwarding route provider.
    pub fn initialize_forwarding_route_provider(&mut self) -> Result<(), StartupError> {
        self.initialize_subsystem(
            Stage::InitializeForwardingRouteProvider,
            SubsystemKind::ForwardingRouteProvider,
        )
    }

    /// Initialises the pipeline factory.
    pub fn initialize_pipeline_factory(&mut self) -> Result<(), StartupError> {
        self.initialize_subsystem(
            Stage::InitializePipelineFactory,
            SubsystemKind::PipelineFactory,
        )
    }

    /// Skipped with a note when the node has no subscription manager.
    pub fn initialize_subscription_manager(&mut self) -> Result<(), StartupError> {
        self.initialize_subsystem(
            Stage::InitializeSubscriptionManager,
            SubsystemKind::SubscriptionManager,
        )
    }

    /// Re-runs queue manager activation; a no-op after the first stage.
    pub fn initialize_queue_manager(&mut self) -> Result<(), StartupError> {
        let activated_now = self
            .queues
            .attempt_initialization(&self.config)
            .map_err(|source| StartupError::Queue {
                stage: Stage::InitializeQueueManager,
                source,
            })?;
        debug!(
            target: STARTUP_TARGET,
            activated_now,
            "queue manager initialised"
        );
        Ok(())
    }

    /// Skipped with a note when the node has no receive-state service.
    pub fn initialize_receive_message_state_service(&mut self) -> Result<(), StartupError> {
        self.initialize_subsystem(
            Stage::InitializeReceiveMessageStateService,
            SubsystemKind::ReceiveMessageStateService,
        )
    }

    /// Initialises the transaction scope factory.
    pub fn initialize_transaction_scope_factory(&mut self) -> Result<(), StartupError> {
        self.initialize_subsystem(
            Stage::InitializeTransactionScopeFactory,
            SubsystemKind::TransactionScopeFactory,
        )
    }

    /// Applies the inbox startup action, then starts the inbox pool.
    ///
    /// The purge finishes before any inbox thread exists, so no consumer
    /// sees messages that are about to be discarded.
    pub fn start_inbox_processing(
        &mut self,
        state: &mut BootstrapState,
    ) -> Result<(), StartupError> {
        let role = ProcessorRole::Inbox;
        let Some(inbox) = self.config.inbox() else {
            debug!(target: STARTUP_TARGET, pool = %role, "no inbox configured");
            return Ok(());
        };
        let queues = self.role_queues(role, inbox.processing())?;
        let outcome = purge::apply_startup_action(
            inbox.startup_action(),
            queues.work.as_ref(),
            self.reporter.as_ref(),
        )
        .map_err(|source| StartupError::Purge {
            stage: role.stage(),
            queue: inbox.work_queue().clone(),
            source,
        })?;
        debug!(target: STARTUP_TARGET, ?outcome, "inbox startup action applied");
        self.start_pool(role, inbox.thread_count(), queues, state)
    }

    /// Starts the control inbox pool when a control inbox is configured.
    pub fn start_control_inbox_processing(
        &mut self,
        state: &mut BootstrapState,
    ) -> Result<(), StartupError> {
        let role = ProcessorRole::ControlInbox;
        let Some(section) = self.config.control_inbox() else {
            debug!(target: STARTUP_TARGET, pool = %role, "no control inbox configured");
            return Ok(());
        };
        let queues = self.role_queues(role, &section)?;
        self.start_pool(role, section.thread_count(), queues, state)
    }

    /// Starts the outbox pool when an outbox is configured.
    pub fn start_outbox_processing(
        &mut self,
        state: &mut BootstrapState,
    ) -> Result<(), StartupError> {
        let role = ProcessorRole::Outbox;
        let Some(section) = self.config.outbox() else {
            debug!(target: STARTUP_TARGET, pool = %role, "no outbox configured");
            return Ok(());
        };
        let queues = self.role_queues(role, &section)?;
        self.start_pool(role, section.thread_count(), queues, state)
    }

    /// Starts single-threaded deferred processing on non-worker nodes.
    ///
    /// Workers receive deferred work through their distributor, so the pool
    /// is never started on a worker.
    pub fn start_deferred_message_processing(
        &mut self,
        state: &mut BootstrapState,
    ) -> Result<(), StartupError> {
        let role = ProcessorRole::DeferredMessage;
        let Some(deferred_queue) = self.config.deferred_queue().cloned() else {
            debug!(target: STARTUP_TARGET, pool = %role, "no deferred queue configured");
            return Ok(());
        };
        if self.config.is_worker() {
            debug!(
                target: STARTUP_TARGET,
                pool = %role,
                "worker nodes do not process deferred messages"
            );
            return Ok(());
        }
        let work = self.resolve(role, &deferred_queue)?;
        let queues = RoleQueues { work, error: None };
        self.start_pool(role, DEFERRED_MESSAGE_THREAD_COUNT, queues, state)
    }

    /// Announces a worker node to its distributor.
    pub fn start_worker(&mut self) -> Result<(), StartupError> {
        let stage = Stage::StartWorker;
        let Some(worker) = self.config.worker() else {
            return Ok(());
        };
        let Some(inbox) = self.config.inbox() else {
            return Err(StartupError::WorkerWithoutInbox { stage });
        };
        let distributor = worker.distributor_control_inbox();
        worker::announce(
            self.sender.as_ref(),
            inbox.work_queue(),
            distributor,
            OffsetDateTime::now_utc(),
        )
        .map_err(|source| StartupError::Announcement {
            stage,
            distributor: distributor.clone(),
            source,
        })?;
        self.reporter.worker_announced(inbox.work_queue(), distributor);
        Ok(())
    }

    fn initialize_subsystem(
        &mut self,
        stage: Stage,
        kind: SubsystemKind,
    ) -> Result<(), StartupError> {
        let outcome = self
            .subsystems
            .ensure_initialised(kind, &self.config)
            .map_err(|source| StartupError::Subsystem { stage, source })?;
        match outcome {
            Initialisation::Initialised => self.reporter.subsystem_initialised(kind),
            Initialisation::Absent => self.reporter.subsystem_absent(kind),
            Initialisation::AlreadyInitialised => {}
        }
        Ok(())
    }

    fn role_queues(
        &self,
        role: ProcessorRole,
        section: &ProcessingSection,
    ) -> Result<RoleQueues, StartupError> {
        let work = self.resolve(role, section.work_queue())?;
        let error = section
            .error_queue()
            .map(|uri| self.resolve(role, uri))
            .transpose()?;
        Ok(RoleQueues { work, error })
    }

    fn resolve(
        &self,
        role: ProcessorRole,
        uri: &QueueUri,
    ) -> Result<Arc<dyn Queue>, StartupError> {
        self.queues
            .get_queue(uri)
            .map_err(|source| StartupError::QueueResolution {
                stage: role.stage(),
                role,
                source,
            })
    }

    fn start_pool(
        &mut self,
        role: ProcessorRole,
        thread_count: usize,
        queues: RoleQueues,
        state: &mut BootstrapState,
    ) -> Result<(), StartupError> {
        let stage = role.stage();
        let key = role.state_key();
        if state.contains(key) {
            return Err(StartupError::State {
                stage,
                source: BootstrapStateError::DuplicateKey {
                    key: key.to_owned(),
                },
            });
        }

        if thread_count == 0 {
            warn!(
                target: STARTUP_TARGET,
                pool = %role,
                "pool configured with no threads; its queue will not be consumed"
            );
        }
        let factory = self.processors.factory_for(role, queues);
        let spec = PoolSpec::new(role, thread_count, factory)
            .with_idle_backoff(self.config.idle_backoff());
        let handle = self
            .provisioner
            .start(spec)
            .map_err(|source| StartupError::PoolStart {
                stage,
                role,
                source,
            })?;
        state
            .insert(key, handle)
            .map_err(|source| StartupError::State { stage, source })?;
        self.reporter.pool_started(role, thread_count);
        Ok(())
    }
}
