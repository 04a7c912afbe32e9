//! Worker pool construction and the OS-thread implementation.
//!
//! Construction and start are separate steps: the startup sequence builds a
//! [`PoolSpec`] describing the pool and hands it to a [`PoolProvisioner`],
//! which starts the threads and returns a [`WorkerPoolHandle`].

use std::fmt;
use std::io;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use courier_config::{DEFAULT_IDLE_BACKOFF, DEFAULT_MAX_IDLE_BACKOFF, IdleBackoff};

use super::{PROCESSING_TARGET, Processor, ProcessorFactory, ProcessorRole, Work};

/// Everything needed to start a worker pool.
#[derive(Clone)]
pub struct PoolSpec {
    role: ProcessorRole,
    thread_count: usize,
    factory: Arc<dyn ProcessorFactory>,
    idle_backoff: IdleBackoff,
}

impl PoolSpec {
    /// Describes a pool of `thread_count` threads for `role`.
    #[must_use]
    pub fn new(
        role: ProcessorRole,
        thread_count: usize,
        factory: Arc<dyn ProcessorFactory>,
    ) -> Self {
        Self {
            role,
            thread_count,
            factory,
            idle_backoff: IdleBackoff::new(DEFAULT_IDLE_BACKOFF, DEFAULT_MAX_IDLE_BACKOFF),
        }
    }

    /// Replaces the idle pause schedule.
    #[must_use]
    pub fn with_idle_backoff(mut self, idle_backoff: IdleBackoff) -> Self {
        self.idle_backoff = idle_backoff;
        self
    }

    /// Role served by the pool.
    #[must_use]
    pub fn role(&self) -> ProcessorRole {
        self.role
    }

    /// Pool name, taken from the role.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.role.pool_name()
    }

    /// Number of threads the pool runs.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Factory building one processor per thread.
    #[must_use]
    pub fn factory(&self) -> &Arc<dyn ProcessorFactory> {
        &self.factory
    }

    /// Idle pause schedule for the pool's threads.
    #[must_use]
    pub fn idle_backoff(&self) -> IdleBackoff {
        self.idle_backoff
    }
}

impl fmt::Debug for PoolSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PoolSpec")
            .field("role", &self.role)
            .field("thread_count", &self.thread_count)
            .field("idle_backoff", &self.idle_backoff)
            .finish_non_exhaustive()
    }
}

/// Errors raised while starting or stopping a pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A processing thread could not be spawned.
    #[error("failed to spawn thread {index} for pool {pool}: {source}")]
    Spawn {
        /// Pool being started.
        pool: String,
        /// Index of the thread that failed.
        index: usize,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// A processing thread panicked before it could be joined.
    #[error("thread '{thread}' of pool {pool} panicked")]
    ThreadPanic {
        /// Pool that owned the thread.
        pool: String,
        /// Name of the panicked thread.
        thread: String,
    },
}

/// A running worker pool.
pub trait WorkerPoolHandle: Send + fmt::Debug {
    /// Pool name.
    fn name(&self) -> &str;

    /// Number of threads the pool was started with.
    fn thread_count(&self) -> usize;

    /// Stops every thread and waits for them to exit.
    fn stop(&mut self) -> Result<(), PoolError>;
}

/// Starts worker pools from their specifications.
pub trait PoolProvisioner {
    /// Starts the pool described by `spec`.
    fn start(&self, spec: PoolSpec) -> Result<Box<dyn WorkerPoolHandle>, PoolError>;
}

/// Provisioner backed by [`ProcessorThreadPool`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPoolProvisioner;

impl PoolProvisioner for ThreadPoolProvisioner {
    fn start(&self, spec: PoolSpec) -> Result<Box<dyn WorkerPoolHandle>, PoolError> {
        Ok(Box::new(ProcessorThreadPool::start(spec)?))
    }
}

/// Worker pool running each processor on a named OS thread.
pub struct ProcessorThreadPool {
    name: &'static str,
    thread_count: usize,
    stop: Arc<StopSignal>,
    threads: Vec<thread::JoinHandle<()>>,
}

impl ProcessorThreadPool {
    /// Spawns the pool's threads; they begin processing immediately.
    ///
    /// When a thread cannot be spawned, the threads already running are
    /// stopped before the error is returned.
    pub fn start(spec: PoolSpec) -> Result<Self, PoolError> {
        let mut pool = Self {
            name: spec.name(),
            thread_count: spec.thread_count(),
            stop: Arc::new(StopSignal::default()),
            threads: Vec::with_capacity(spec.thread_count()),
        };

        for index in 0..spec.thread_count() {
            let thread_name = format!("{}-{index}", pool.name);
            let processor = spec.factory().create();
            let stop = Arc::clone(&pool.stop);
            let idle_backoff = spec.idle_backoff();
            let spawned = thread::Builder::new()
                .name(thread_name)
                .spawn(move || run_processor(processor, &stop, idle_backoff));
            match spawned {
                Ok(handle) => pool.threads.push(handle),
                Err(source) => {
                    if let Err(error) = pool.join_all() {
                        warn!(
                            target: PROCESSING_TARGET,
                            pool = pool.name,
                            error = %error,
                            "failed to unwind partially started pool"
                        );
                    }
                    return Err(PoolError::Spawn {
                        pool: pool.name.to_owned(),
                        index,
                        source,
                    });
                }
            }
        }

        info!(
            target: PROCESSING_TARGET,
            pool = pool.name,
            threads = pool.thread_count,
            "worker pool started"
        );
        Ok(pool)
    }

    fn join_all(&mut self) -> Result<(), PoolError> {
        self.stop.raise();
        let mut first_panic = None;
        for handle in self.threads.drain(..) {
            let thread = handle.thread().name().unwrap_or("unnamed").to_owned();
            if handle.join().is_err() && first_panic.is_none() {
                first_panic = Some(PoolError::ThreadPanic {
                    pool: self.name.to_owned(),
                    thread,
                });
            }
        }
        first_panic.map_or(Ok(()), Err)
    }
}

impl WorkerPoolHandle for ProcessorThreadPool {
    fn name(&self) -> &str {
        self.name
    }

    fn thread_count(&self) -> usize {
        self.thread_count
    }

    fn stop(&mut self) -> Result<(), PoolError> {
        self.join_all()?;
        info!(
            target: PROCESSING_TARGET,
            pool = self.name,
            "worker pool stopped"
        );
        Ok(())
    }
}

impl fmt::Debug for ProcessorThreadPool {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProcessorThreadPool")
            .field("name", &self.name)
            .field("thread_count", &self.thread_count)
            .field("running_threads", &self.threads.len())
            .finish()
    }
}

impl Drop for ProcessorThreadPool {
    fn drop(&mut self) {
        self.stop.raise();
    }
}

#[derive(Debug, Default)]
struct StopSignal {
    raised: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    fn raise(&self) {
        if let Ok(mut raised) = self.raised.lock() {
            *raised = true;
        }
        self.wake.notify_all();
    }

    // A poisoned flag counts as raised so threads never spin forever.
    fn is_raised(&self) -> bool {
        self.raised.lock().map_or(true, |raised| *raised)
    }

    /// Sleeps for up to `timeout`; returns `true` once the signal is raised.
    fn wait(&self, timeout: Duration) -> bool {
        let Ok(raised) = self.raised.lock() else {
            return true;
        };
        self.wake
            .wait_timeout_while(raised, timeout, |raised| !*raised)
            .map_or(true, |(raised, _)| *raised)
    }
}

fn run_processor(mut processor: Box<dyn Processor>, stop: &StopSignal, idle_backoff: IdleBackoff) {
    let thread = thread::current();
    let name = thread.name().unwrap_or("processor");
    debug!(target: PROCESSING_TARGET, thread = name, "processing thread running");

    let mut pause = Duration::ZERO;
    while !stop.is_raised() {
        match processor.execute() {
            Ok(Work::Processed) => {
                pause = Duration::ZERO;
                continue;
            }
            Ok(Work::Idle) => {}
            Err(error) => {
                warn!(
                    target: PROCESSING_TARGET,
                    thread = name,
                    error = %error,
                    "processing pass failed"
                );
            }
        }
        pause = idle_backoff.next(pause);
        if stop.wait(pause) {
            break;
        }
    }

    debug!(target: PROCESSING_TARGET, thread = name, "processing thread exiting");
}
