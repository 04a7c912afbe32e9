//! Registry of queue factories and resolved queues.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use once_cell::sync::OnceCell;

use courier_config::{Config, QueueUri};

use super::{QUEUE_TARGET, Queue, QueueError, QueueFactory};

/// Transport-specific work run when the queue manager activates.
pub trait QueueManagerHooks: Send + Sync {
    /// Prepares the transports behind the manager.
    fn attempt_initialization(&self, config: &Config) -> Result<(), QueueError>;
}

/// Owns the queue factories and caches one queue instance per location.
///
/// Purging, processing, and sending all resolve queues through the manager,
/// so they share the same underlying queue.
#[derive(Default)]
pub struct QueueManager {
    activated: OnceCell<()>,
    hooks: Option<Arc<dyn QueueManagerHooks>>,
    factories: RwLock<Vec<Arc<dyn QueueFactory>>>,
    queues: Mutex<HashMap<QueueUri, Arc<dyn Queue>>>,
}

impl QueueManager {
    /// Builds an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a manager that runs `hooks` on activation.
    #[must_use]
    pub fn with_hooks(hooks: Arc<dyn QueueManagerHooks>) -> Self {
        Self {
            hooks: Some(hooks),
            ..Self::default()
        }
    }

    /// Activates the manager, running its hooks.
    ///
    /// Returns `true` for the call that performed the activation; every
    /// later call is a no-op returning `false`. A failed activation leaves
    /// the manager inactive, so the next call runs the hooks again.
    pub fn attempt_initialization(&self, config: &Config) -> Result<bool, QueueError> {
        let mut activated_now = false;
        self.activated.get_or_try_init(|| {
            if let Some(hooks) = &self.hooks {
                hooks.attempt_initialization(config)?;
            }
            activated_now = true;
            tracing::debug!(
                target: QUEUE_TARGET,
                configured_queues = config.configured_queues().len(),
                "queue manager activated"
            );
            Ok::<(), QueueError>(())
        })?;
        Ok(activated_now)
    }

    /// Whether [`QueueManager::attempt_initialization`] has run.
    #[must_use]
    pub fn is_initialised(&self) -> bool {
        self.activated.get().is_some()
    }

    /// Registers a factory; the first factory for a scheme wins.
    ///
    /// Returns `false` when a factory for the same scheme was already present.
    pub fn register_queue_factory(&self, factory: Arc<dyn QueueFactory>) -> Result<bool, QueueError> {
        let mut factories = self.factories.write().map_err(|_| poisoned_registry())?;
        if factories
            .iter()
            .any(|existing| existing.scheme() == factory.scheme())
        {
            tracing::debug!(
                target: QUEUE_TARGET,
                scheme = factory.scheme(),
                "queue factory already registered"
            );
            return Ok(false);
        }
        factories.push(factory);
        Ok(true)
    }

    /// Snapshot of the registered factories in registration order.
    pub fn queue_factories(&self) -> Result<Vec<Arc<dyn QueueFactory>>, QueueError> {
        let factories = self.factories.read().map_err(|_| poisoned_registry())?;
        Ok(factories.clone())
    }

    /// Resolves the queue at `uri`, building it on first use.
    pub fn get_queue(&self, uri: &QueueUri) -> Result<Arc<dyn Queue>, QueueError> {
        let mut queues = self.queues.lock().map_err(|_| QueueError::Poisoned {
            resource: String::from("queue cache"),
        })?;
        if let Some(queue) = queues.get(uri) {
            return Ok(Arc::clone(queue));
        }

        let factory = self.factory_for(uri)?;
        let queue = factory.create(uri)?;
        queues.insert(uri.clone(), Arc::clone(&queue));
        Ok(queue)
    }

    /// Creates every queue named by the configuration.
    ///
    /// Queues whose transport cannot create them are left alone. Returns the
    /// number of queues that were created.
    pub fn create_physical_queues(&self, config: &Config) -> Result<usize, QueueError> {
        let mut created = 0;
        for uri in config.configured_queues() {
            let queue = self.get_queue(&uri)?;
            match queue.creator() {
                Some(creator) => {
                    creator.create()?;
                    created += 1;
                    tracing::debug!(target: QUEUE_TARGET, queue = %uri, "queue created");
                }
                None => {
                    tracing::debug!(
                        target: QUEUE_TARGET,
                        queue = %uri,
                        "transport cannot create queues; skipping"
                    );
                }
            }
        }
        Ok(created)
    }

    fn factory_for(&self, uri: &QueueUri) -> Result<Arc<dyn QueueFactory>, QueueError> {
        let factories = self.factories.read().map_err(|_| poisoned_registry())?;
        factories
            .iter()
            .find(|factory| factory.scheme() == uri.scheme())
            .cloned()
            .ok_or_else(|| QueueError::UnsupportedScheme {
                scheme: uri.scheme().to_owned(),
                uri: uri.clone(),
            })
    }
}

impl fmt::Debug for QueueManager {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schemes: Vec<String> = self
            .factories
            .read()
            .map(|factories| {
                factories
                    .iter()
                    .map(|factory| factory.scheme().to_owned())
                    .collect()
            })
            .unwrap_or_default();
        formatter
            .debug_struct("QueueManager")
            .field("activated", &self.is_initialised())
            .field("hooks", &self.hooks.is_some())
            .field("schemes", &schemes)
            .finish_non_exhaustive()
    }
}

fn poisoned_registry() -> QueueError {
    QueueError::Poisoned {
        resource: String::from("queue factory registry"),
    }
}
