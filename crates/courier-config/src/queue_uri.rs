//! Queue locations.
//!
//! Every queue a node touches is addressed by a URI whose scheme selects the
//! transport (`memory://inbox-work`, for example). The URI is validated once
//! when configuration loads so the rest of the node can treat it as opaque.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Validated location of a work queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueUri(Url);

impl QueueUri {
    /// Parses and validates a queue location.
    pub fn parse(input: &str) -> Result<Self, QueueUriParseError> {
        input.parse()
    }

    /// Transport scheme, used to select the queue factory.
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Queue name: the host component, or the path when no host is present.
    #[must_use]
    pub fn queue_name(&self) -> &str {
        match self.0.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => self.0.path().trim_start_matches('/'),
        }
    }

    /// Full textual form of the location.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for QueueUri {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl FromStr for QueueUri {
    type Err = QueueUriParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input.trim())?;
        let candidate = Self(url);
        if candidate.queue_name().is_empty() {
            return Err(QueueUriParseError::MissingQueueName(input.to_owned()));
        }
        Ok(candidate)
    }
}

impl TryFrom<String> for QueueUri {
    type Error = QueueUriParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QueueUri> for String {
    fn from(value: QueueUri) -> Self {
        value.0.into()
    }
}

/// Errors encountered while parsing a [`QueueUri`].
#[derive(Debug, Error)]
pub enum QueueUriParseError {
    /// The location named a transport but no queue.
    #[error("queue location '{0}' does not name a queue")]
    MissingQueueName(String),
    /// The location is not a valid URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
