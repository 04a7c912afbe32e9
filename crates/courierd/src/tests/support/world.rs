//! BDD test world: encapsulates node configuration, collaborator doubles,
//! and the outcome of one startup run for step functions.

use std::cell::RefCell;
use std::sync::Arc;

use courier_config::{Config, QueueStartupAction, QueueUri};

use crate::message::TransportMessage;
use crate::node::{Node, NodeComponents, NodeError, StaticConfigLoader, start_node_with};
use crate::queue::{MemoryQueueFactory, Queue, QueueManager};
use crate::subsystem::SubsystemKind;

use super::config_loader::{
    CONTROL_INBOX_WORK_QUEUE, DEFERRED_QUEUE, DISTRIBUTOR_CONTROL_INBOX, INBOX_WORK_QUEUE,
    OUTBOX_WORK_QUEUE, uri,
};
use super::processors::RecordingProcessors;
use super::provisioner::RecordingProvisioner;
use super::queues::{UNPURGEABLE_SCHEME, UnpurgeableQueueFactory};
use super::reporter::RecordingHealthReporter;
use super::sender::RecordingSender;
use super::subsystems::CountingSubsystem;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub config: Config,
    pub reporter: Arc<RecordingHealthReporter>,
    pub provisioner: RecordingProvisioner,
    pub processors: Arc<RecordingProcessors>,
    pub sender: Arc<RecordingSender>,
    pub queues: Arc<QueueManager>,
    subsystems: Vec<(SubsystemKind, Arc<CountingSubsystem>)>,
    node: Option<Node>,
    startup_error: Option<NodeError>,
}

impl TestWorld {
    /// Builds a world for a node with no queues configured.
    #[must_use]
    pub fn new() -> Self {
        let queues = Arc::new(QueueManager::new());
        queues
            .register_queue_factory(Arc::new(MemoryQueueFactory::new()))
            .expect("register memory transport");
        queues
            .register_queue_factory(Arc::new(UnpurgeableQueueFactory))
            .expect("register unpurgeable transport");
        Self {
            config: Config {
                log_filter: String::from("warn"),
                ..Config::default()
            },
            reporter: Arc::new(RecordingHealthReporter::default()),
            provisioner: RecordingProvisioner::default(),
            processors: Arc::new(RecordingProcessors::default()),
            sender: Arc::new(RecordingSender::default()),
            queues,
            subsystems: Vec::new(),
            node: None,
            startup_error: None,
        }
    }

    pub fn enable_inbox(&mut self) {
        self.config.inbox_work_queue = Some(uri(INBOX_WORK_QUEUE));
    }

    pub fn set_inbox_startup_action(&mut self, action: QueueStartupAction) {
        self.config.inbox_startup_action = action;
    }

    /// Moves the inbox onto a transport that cannot purge.
    pub fn use_unpurgeable_inbox(&mut self) {
        self.config.inbox_work_queue = Some(uri(&format!("{UNPURGEABLE_SCHEME}://inbox-work")));
    }

    pub fn enable_control_inbox(&mut self) {
        self.config.control_inbox_work_queue = Some(uri(CONTROL_INBOX_WORK_QUEUE));
    }

    pub fn enable_outbox(&mut self) {
        self.config.outbox_work_queue = Some(uri(OUTBOX_WORK_QUEUE));
    }

    pub fn enable_deferred_queue(&mut self) {
        self.config.deferred_queue = Some(uri(DEFERRED_QUEUE));
    }

    pub fn make_worker(&mut self) {
        self.config.distributor_control_inbox = Some(uri(DISTRIBUTOR_CONTROL_INBOX));
    }

    pub fn install_subsystem(&mut self, kind: SubsystemKind, subsystem: CountingSubsystem) {
        self.subsystems.push((kind, Arc::new(subsystem)));
    }

    pub fn reject_sends(&mut self) {
        self.sender = Arc::new(RecordingSender::rejecting());
    }

    /// Places `count` messages on the configured inbox work queue.
    pub fn seed_inbox(&self, count: usize) {
        let queue = self.inbox_queue();
        for index in 0..count {
            queue
                .enqueue(TransportMessage::new("courier.stale", index.to_string()))
                .expect("seed inbox");
        }
    }

    /// Runs startup once.
    pub fn start(&mut self) {
        if self.node.is_some() || self.startup_error.is_some() {
            return;
        }

        let mut components = NodeComponents::new(self.provisioner.clone())
            .with_queue_manager(Arc::clone(&self.queues))
            .with_processors(self.processors.clone())
            .with_sender(self.sender.clone());
        for (kind, subsystem) in &self.subsystems {
            components = components.with_subsystem(*kind, subsystem.clone());
        }

        let loader = StaticConfigLoader::new(self.config.clone());
        match start_node_with(&loader, self.reporter.clone(), components) {
            Ok(node) => self.node = Some(node),
            Err(error) => self.startup_error = Some(error),
        }
    }

    #[must_use]
    pub fn node(&self) -> Option<&Node> {
        self.node.as_ref()
    }

    #[must_use]
    pub fn startup_error(&self) -> Option<&NodeError> {
        self.startup_error.as_ref()
    }

    #[must_use]
    pub fn subsystem(&self, kind: SubsystemKind) -> Option<Arc<CountingSubsystem>> {
        self.subsystems
            .iter()
            .find(|(installed, _)| *installed == kind)
            .map(|(_, subsystem)| Arc::clone(subsystem))
    }

    #[must_use]
    pub fn inbox_uri(&self) -> QueueUri {
        self.config
            .inbox_work_queue
            .clone()
            .expect("inbox should be configured")
    }

    /// Number of messages left on the inbox work queue.
    #[must_use]
    pub fn inbox_depth(&self) -> usize {
        let queue = self.inbox_queue();
        let mut drained = Vec::new();
        while let Some(message) = queue.dequeue().expect("dequeue") {
            drained.push(message);
        }
        let depth = drained.len();
        for message in drained {
            queue.enqueue(message).expect("requeue");
        }
        depth
    }

    fn inbox_queue(&self) -> Arc<dyn Queue> {
        self.queues
            .get_queue(&self.inbox_uri())
            .expect("inbox queue should resolve")
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
