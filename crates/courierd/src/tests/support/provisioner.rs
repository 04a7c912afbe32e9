//! Pool provisioner double that records pool specifications instead of
//! spawning threads.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use time::OffsetDateTime;

use crate::processing::{PoolError, PoolProvisioner, PoolSpec, ProcessorRole, WorkerPoolHandle};

/// A pool start observed by [`RecordingProvisioner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedPool {
    pub role: ProcessorRole,
    pub name: String,
    pub thread_count: usize,
    pub started_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct ProvisionerState {
    started: Vec<StartedPool>,
    stopped: Vec<String>,
    start_failures: HashMap<ProcessorRole, String>,
    stop_failures: HashMap<ProcessorRole, String>,
}

/// Records every pool start and hands back inert handles.
#[derive(Debug, Clone, Default)]
pub struct RecordingProvisioner {
    state: Arc<Mutex<ProvisionerState>>,
}

impl RecordingProvisioner {
    /// Makes the next start for `role` fail with `message`.
    pub fn fail_on(&self, role: ProcessorRole, message: impl Into<String>) {
        self.lock().start_failures.insert(role, message.into());
    }

    /// Makes stopping the pool for `role` fail.
    pub fn fail_stop_on(&self, role: ProcessorRole) {
        self.lock()
            .stop_failures
            .insert(role, format!("{}-0", role.pool_name()));
    }

    #[must_use]
    pub fn started(&self) -> Vec<StartedPool> {
        self.lock().started.clone()
    }

    #[must_use]
    pub fn started_role(&self, role: ProcessorRole) -> Option<StartedPool> {
        self.started().into_iter().find(|pool| pool.role == role)
    }

    /// Pool names in the order they were stopped.
    #[must_use]
    pub fn stopped(&self) -> Vec<String> {
        self.lock().stopped.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProvisionerState> {
        self.state.lock().expect("provisioner mutex poisoned")
    }
}

impl PoolProvisioner for RecordingProvisioner {
    fn start(&self, spec: PoolSpec) -> Result<Box<dyn WorkerPoolHandle>, PoolError> {
        let mut state = self.lock();
        if let Some(message) = state.start_failures.get(&spec.role()) {
            return Err(PoolError::Spawn {
                pool: spec.name().to_owned(),
                index: 0,
                source: io::Error::other(message.clone()),
            });
        }
        // The processor factory must build processors for the pool.
        drop(spec.factory().create());

        state.started.push(StartedPool {
            role: spec.role(),
            name: spec.name().to_owned(),
            thread_count: spec.thread_count(),
            started_at: OffsetDateTime::now_utc(),
        });
        Ok(Box::new(RecordedPool {
            name: spec.name(),
            thread_count: spec.thread_count(),
            failing_thread: state.stop_failures.get(&spec.role()).cloned(),
            provisioner: self.clone(),
        }))
    }
}

#[derive(Debug)]
struct RecordedPool {
    name: &'static str,
    thread_count: usize,
    failing_thread: Option<String>,
    provisioner: RecordingProvisioner,
}

impl WorkerPoolHandle for RecordedPool {
    fn name(&self) -> &str {
        self.name
    }

    fn thread_count(&self) -> usize {
        self.thread_count
    }

    fn stop(&mut self) -> Result<(), PoolError> {
        self.provisioner.lock().stopped.push(self.name.to_owned());
        match self.failing_thread.take() {
            Some(thread) => Err(PoolError::ThreadPanic {
                pool: self.name.to_owned(),
                thread,
            }),
            None => Ok(()),
        }
    }
}
