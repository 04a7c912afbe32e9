//! Pluggable subsystems brought up during startup.
//!
//! Each subsystem exposes an idempotent initialisation hook. Required
//! subsystems always have an implementation: a node that does not supply
//! one gets a [`PassiveSubsystem`]. Optional subsystems are simply absent
//! until the node installs one, and the startup sequence skips them.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use courier_config::Config;

const SUBSYSTEM_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::subsystem");

/// Subsystems initialised by the startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubsystemKind {
    /// Builds handlers for incoming messages.
    MessageHandlerFactory,
    /// Resolves destinations for outgoing messages.
    MessageRouteProvider,
    /// Resolves destinations for forwarded messages.
    ForwardingRouteProvider,
    /// Builds the per-message processing pipelines.
    PipelineFactory,
    /// Tracks which nodes subscribe to which events.
    SubscriptionManager,
    /// Remembers which messages have already been received.
    ReceiveMessageStateService,
    /// Opens transaction scopes around message handling.
    TransactionScopeFactory,
}

impl SubsystemKind {
    /// Every subsystem kind.
    pub const ALL: [Self; 7] = [
        Self::MessageHandlerFactory,
        Self::MessageRouteProvider,
        Self::ForwardingRouteProvider,
        Self::PipelineFactory,
        Self::SubscriptionManager,
        Self::ReceiveMessageStateService,
        Self::TransactionScopeFactory,
    ];

    /// Whether a node may run without this subsystem.
    #[must_use]
    pub const fn is_optional(self) -> bool {
        matches!(
            self,
            Self::SubscriptionManager | Self::ReceiveMessageStateService
        )
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::MessageHandlerFactory => "message handler factory",
            Self::MessageRouteProvider => "message route provider",
            Self::ForwardingRouteProvider => "forwarding route provider",
            Self::PipelineFactory => "pipeline factory",
            Self::SubscriptionManager => "subscription manager",
            Self::ReceiveMessageStateService => "receive message state service",
            Self::TransactionScopeFactory => "transaction scope factory",
        };
        formatter.write_str(label)
    }
}

/// Error raised when a subsystem fails to initialise.
#[derive(Debug, Error)]
#[error("{kind} failed to initialise: {message}")]
pub struct SubsystemError {
    /// Subsystem that failed.
    pub kind: SubsystemKind,
    message: String,
    /// Underlying failure reported by the implementation.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SubsystemError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(kind: SubsystemKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(
        kind: SubsystemKind,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message describing the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// A pluggable service initialised during startup.
pub trait Subsystem: Send + Sync {
    /// Prepares the subsystem for use.
    ///
    /// Implementations must tolerate being called more than once.
    fn attempt_initialization(&self, config: &Config) -> Result<(), SubsystemError>;
}

/// Outcome of [`Subsystems::ensure_initialised`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initialisation {
    /// The subsystem was initialised by this call.
    Initialised,
    /// The subsystem had already been initialised.
    AlreadyInitialised,
    /// The node was composed without this optional subsystem.
    Absent,
}

/// Subsystem set for one node, with initialisation bookkeeping.
pub struct Subsystems {
    installed: HashMap<SubsystemKind, Arc<dyn Subsystem>>,
    initialised: HashSet<SubsystemKind>,
}

impl Subsystems {
    /// Passive implementations for required subsystems; optional ones absent.
    #[must_use]
    pub fn new() -> Self {
        let installed = SubsystemKind::ALL
            .into_iter()
            .filter(|kind| !kind.is_optional())
            .map(|kind| {
                let subsystem: Arc<dyn Subsystem> = Arc::new(PassiveSubsystem::new(kind));
                (kind, subsystem)
            })
            .collect();
        Self {
            installed,
            initialised: HashSet::new(),
        }
    }

    /// Installs (or replaces) the implementation for `kind`.
    #[must_use]
    pub fn with(mut self, kind: SubsystemKind, subsystem: Arc<dyn Subsystem>) -> Self {
        self.installed.insert(kind, subsystem);
        self
    }

    /// Whether an implementation is installed for `kind`.
    #[must_use]
    pub fn is_present(&self, kind: SubsystemKind) -> bool {
        self.installed.contains_key(&kind)
    }

    /// Whether `kind` has been initialised successfully.
    #[must_use]
    pub fn is_initialised(&self, kind: SubsystemKind) -> bool {
        self.initialised.contains(&kind)
    }

    /// Initialises `kind` unless that already happened.
    ///
    /// A failed attempt leaves the subsystem uninitialised, so a later call
    /// tries again.
    pub fn ensure_initialised(
        &mut self,
        kind: SubsystemKind,
        config: &Config,
    ) -> Result<Initialisation, SubsystemError> {
        if self.initialised.contains(&kind) {
            return Ok(Initialisation::AlreadyInitialised);
        }
        let Some(subsystem) = self.installed.get(&kind) else {
            if kind.is_optional() {
                return Ok(Initialisation::Absent);
            }
            return Err(SubsystemError::new(kind, "no implementation installed"));
        };

        subsystem.attempt_initialization(config)?;
        self.initialised.insert(kind);
        Ok(Initialisation::Initialised)
    }
}

impl Default for Subsystems {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Subsystems {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut installed: Vec<String> = self.installed.keys().map(ToString::to_string).collect();
        installed.sort();
        formatter
            .debug_struct("Subsystems")
            .field("installed", &installed)
            .field("initialised", &self.initialised.len())
            .finish()
    }
}

/// Stand-in for a required subsystem the node was composed without.
#[derive(Debug, Clone, Copy)]
pub struct PassiveSubsystem {
    kind: SubsystemKind,
}

impl PassiveSubsystem {
    /// Builds a passive stand-in for `kind`.
    #[must_use]
    pub const fn new(kind: SubsystemKind) -> Self {
        Self { kind }
    }
}

impl Subsystem for PassiveSubsystem {
    fn attempt_initialization(&self, _config: &Config) -> Result<(), SubsystemError> {
        tracing::debug!(
            target: SUBSYSTEM_TARGET,
            subsystem = %self.kind,
            "no implementation supplied; nothing to initialise"
        );
        Ok(())
    }
}
