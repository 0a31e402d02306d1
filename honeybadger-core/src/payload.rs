//! Wire payload for `POST /v1/notices/`
//!
//! The payload is a projection of a [`Notice`] plus the [`Configuration`]. The
//! API key is never part of it; the transport sends it as a header.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::config::Configuration;
use crate::context::Context;
use crate::error::Result;
use crate::notice::{Cause, Frame, Notice};

pub const NOTIFIER_NAME: &str = "Honeybadger for Rust";
pub const NOTIFIER_URL: &str = "https://github.com/honeybadger-io/honeybadger-rust";
pub const NOTIFIER_VERSION: &str = env!("CARGO_PKG_VERSION");

const FILTERED: &str = "[FILTERED]";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    pub notifier: NotifierInfo,
    pub error: ErrorPayload,
    pub request: RequestPayload,
    pub server: ServerPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotifierInfo {
    pub name: &'static str,
    pub url: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub class: String,
    pub message: String,
    pub backtrace: Vec<Frame>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<Cause>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestPayload {
    pub context: Context,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerPayload {
    pub project_root: String,
    pub environment_name: String,
    pub hostname: String,
    pub time: DateTime<Utc>,
    pub pid: u32,
}

impl Payload {
    /// Build a payload stamped with the current time
    pub fn build(notice: Notice, config: &Configuration) -> Self {
        Self::build_at(notice, config, Utc::now())
    }

    pub fn build_at(notice: Notice, config: &Configuration, time: DateTime<Utc>) -> Self {
        Self {
            notifier: NotifierInfo {
                name: NOTIFIER_NAME,
                url: NOTIFIER_URL,
                version: NOTIFIER_VERSION,
            },
            error: ErrorPayload {
                class: notice.class,
                message: notice.message,
                backtrace: notice.backtrace,
                causes: notice.causes,
            },
            request: RequestPayload {
                context: filter_context(notice.context, &config.params_filters),
            },
            server: ServerPayload {
                project_root: config.project_root.clone(),
                environment_name: config.environment.clone(),
                hostname: config.hostname.clone(),
                time,
                pid: std::process::id(),
            },
        }
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Replace values under filtered keys, at any depth
fn filter_context(context: Context, filters: &[String]) -> Context {
    context
        .into_iter()
        .map(|(key, value)| {
            if is_filtered(&key, filters) {
                (key, Value::String(FILTERED.to_string()))
            } else {
                (key, filter_value(value, filters))
            }
        })
        .collect()
}

fn filter_value(value: Value, filters: &[String]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| {
                    if is_filtered(&key, filters) {
                        (key, Value::String(FILTERED.to_string()))
                    } else {
                        (key, filter_value(inner, filters))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| filter_value(item, filters))
                .collect(),
        ),
        other => other,
    }
}

fn is_filtered(key: &str, filters: &[String]) -> bool {
    filters.iter().any(|f| f.eq_ignore_ascii_case(key))
}
