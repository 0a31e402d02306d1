//! Logging-only transport for development-like environments
//!
//! The configuration in the debug line is [`Configuration::redacted`], so the
//! API key never reaches the logs.

use serde_json::Value;

use crate::config::Configuration;

use super::{NoticeId, Transport};

pub(crate) const DEVELOPMENT_MODE_MESSAGE: &str =
    "Development mode is enabled; this error will be reported if it occurs after you deploy your app.";

/// Never touches the network and never yields a notice id
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeTransport;

impl Transport for FakeTransport {
    fn send(&self, config: &Configuration, payload: &Value) -> Option<NoticeId> {
        tracing::info!("{}", DEVELOPMENT_MODE_MESSAGE);
        tracing::debug!(
            "The config used is {:?} with payload {}",
            config.redacted(),
            payload
        );
        None
    }
}
