//! Processor provider double recording which queues each role was bound to.

use std::sync::{Arc, Mutex};

use crate::processing::{
    ProcessingError, Processor, ProcessorFactory, ProcessorFactoryProvider, ProcessorRole,
    RoleQueues, Work,
};

/// Queues a role's factory was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundRole {
    pub role: ProcessorRole,
    pub work_queue: String,
    pub error_queue: Option<String>,
}

/// Provider whose processors never find work.
#[derive(Debug, Default)]
pub struct RecordingProcessors {
    bound: Mutex<Vec<BoundRole>>,
}

impl RecordingProcessors {
    #[must_use]
    pub fn bound(&self) -> Vec<BoundRole> {
        self.bound
            .lock()
            .expect("processor provider mutex poisoned")
            .clone()
    }
}

impl ProcessorFactoryProvider for RecordingProcessors {
    fn factory_for(&self, role: ProcessorRole, queues: RoleQueues) -> Arc<dyn ProcessorFactory> {
        self.bound
            .lock()
            .expect("processor provider mutex poisoned")
            .push(BoundRole {
                role,
                work_queue: queues.work.uri().to_string(),
                error_queue: queues.error.as_ref().map(|queue| queue.uri().to_string()),
            });
        Arc::new(IdleFactory)
    }
}

struct IdleFactory;

impl ProcessorFactory for IdleFactory {
    fn create(&self) -> Box<dyn Processor> {
        Box::new(IdleProcessor)
    }
}

struct IdleProcessor;

impl Processor for IdleProcessor {
    fn execute(&mut self) -> Result<Work, ProcessingError> {
        Ok(Work::Idle)
    }
}
