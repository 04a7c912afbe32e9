//! Drives the sequencer through every stage once, in order.

use tracing::debug;

use crate::processing::PoolProvisioner;
use crate::stage::Stage;
use crate::state::BootstrapState;

use super::{STARTUP_TARGET, StartupError, StartupSequencer};

/// Tracks progress through [`Stage::ALL`] for one startup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupPipeline {
    next: Option<Stage>,
    aborted: Option<Stage>,
}

impl StartupPipeline {
    /// Builds a pipeline positioned before the first stage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: Stage::ALL.first().copied(),
            aborted: None,
        }
    }

    /// Stage that runs next, or `None` once every stage has run.
    #[must_use]
    pub fn next_stage(&self) -> Option<Stage> {
        self.next
    }

    /// Whether every stage has completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.next.is_none() && self.aborted.is_none()
    }

    /// Stage that aborted the run, if any.
    #[must_use]
    pub fn aborted_at(&self) -> Option<Stage> {
        self.aborted
    }

    /// Runs `stage`, which must be the next stage in order.
    pub fn run_stage<P>(
        &mut self,
        stage: Stage,
        sequencer: &mut StartupSequencer<P>,
        state: &mut BootstrapState,
    ) -> Result<(), StartupError>
    where
        P: PoolProvisioner,
    {
        if let Some(aborted) = self.aborted {
            return Err(StartupError::Aborted { stage: aborted });
        }
        if self.next != Some(stage) {
            return Err(StartupError::OutOfOrder {
                expected: self.next,
                requested: stage,
            });
        }

        if let Err(error) = sequencer.execute(stage, state) {
            self.aborted = Some(stage);
            return Err(error);
        }
        self.next = stage.next();
        Ok(())
    }

    /// Runs the next stage, returning it, or `None` when none remain.
    pub fn advance<P>(
        &mut self,
        sequencer: &mut StartupSequencer<P>,
        state: &mut BootstrapState,
    ) -> Result<Option<Stage>, StartupError>
    where
        P: PoolProvisioner,
    {
        if let Some(aborted) = self.aborted {
            return Err(StartupError::Aborted { stage: aborted });
        }
        let Some(stage) = self.next else {
            return Ok(None);
        };
        self.run_stage(stage, sequencer, state)?;
        Ok(Some(stage))
    }

    /// Runs every remaining stage.
    pub fn run<P>(
        &mut self,
        sequencer: &mut StartupSequencer<P>,
        state: &mut BootstrapState,
    ) -> Result<(), StartupError>
    where
        P: PoolProvisioner,
    {
        while let Some(stage) = self.advance(sequencer, state)? {
            debug!(target: STARTUP_TARGET, stage = %stage, "stage complete");
        }
        Ok(())
    }
}

impl Default for StartupPipeline {
    fn default() -> Self {
        Self::new()
    }
}
