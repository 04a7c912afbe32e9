//! Test configurations and loaders for success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::OrthoError;

use courier_config::{Config, QueueStartupAction, QueueUri};

use crate::node::ConfigLoader;

pub const INBOX_WORK_QUEUE: &str = "memory://inbox-work";
pub const INBOX_ERROR_QUEUE: &str = "memory://inbox-error";
pub const CONTROL_INBOX_WORK_QUEUE: &str = "memory://control-inbox-work";
pub const OUTBOX_WORK_QUEUE: &str = "memory://outbox-work";
pub const DEFERRED_QUEUE: &str = "memory://deferred";
pub const DISTRIBUTOR_CONTROL_INBOX: &str = "memory://distributor-control";

#[must_use]
pub fn uri(value: &str) -> QueueUri {
    QueueUri::parse(value).expect("valid queue uri")
}

/// Configuration with every queue role enabled and no worker settings.
#[must_use]
pub fn full_config() -> Config {
    Config {
        log_filter: String::from("warn"),
        inbox_work_queue: Some(uri(INBOX_WORK_QUEUE)),
        inbox_error_queue: Some(uri(INBOX_ERROR_QUEUE)),
        inbox_thread_count: 3,
        control_inbox_work_queue: Some(uri(CONTROL_INBOX_WORK_QUEUE)),
        control_inbox_thread_count: 2,
        outbox_work_queue: Some(uri(OUTBOX_WORK_QUEUE)),
        outbox_thread_count: 1,
        deferred_queue: Some(uri(DEFERRED_QUEUE)),
        ..Config::default()
    }
}

/// [`full_config`] for a worker reporting to the distributor.
#[must_use]
pub fn worker_config() -> Config {
    Config {
        distributor_control_inbox: Some(uri(DISTRIBUTOR_CONTROL_INBOX)),
        ..full_config()
    }
}

/// [`full_config`] with the inbox purged at startup.
#[must_use]
pub fn purging_config() -> Config {
    Config {
        inbox_startup_action: QueueStartupAction::Purge,
        ..full_config()
    }
}

/// Loader that intentionally fails by passing an invalid startup action.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("courierd"),
            OsString::from("--inbox-startup-action"),
            OsString::from("shred"),
        ];
        Config::load_layered_from(args)
    }
}
