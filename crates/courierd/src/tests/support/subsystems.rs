//! Subsystem double counting initialisation attempts.

use std::sync::atomic::{AtomicUsize, Ordering};

use courier_config::Config;

use crate::subsystem::{Subsystem, SubsystemError, SubsystemKind};

#[derive(Debug)]
pub struct CountingSubsystem {
    kind: SubsystemKind,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl CountingSubsystem {
    #[must_use]
    pub fn new(kind: SubsystemKind) -> Self {
        Self {
            kind,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A subsystem whose every initialisation attempt fails.
    #[must_use]
    pub fn failing(kind: SubsystemKind, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(kind)
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Subsystem for CountingSubsystem {
    fn attempt_initialization(&self, _config: &Config) -> Result<(), SubsystemError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(SubsystemError::new(self.kind, message.clone())),
            None => Ok(()),
        }
    }
}
