//! HTTP transport for the Honeybadger notices API
//!
//! One blocking `POST {endpoint}/v1/notices/` per notice. No retries.
//!
//! reqwest's blocking client refuses to run on a tokio runtime thread, so when
//! `send_notice` is called from async code the request is made on a scoped
//! helper thread and the caller waits for it. On a `current_thread` runtime
//! that wait stalls the runtime for the length of the request.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde_json::Value;

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::payload::NOTIFIER_VERSION;

use super::{NoticeId, Transport};

const API_KEY_HEADER: &str = "X-API-Key";

/// Real network delivery
///
/// The underlying client is built on first use, so constructing a transport is
/// free and safe from any context.
#[derive(Default)]
pub struct HttpTransport {
    client: OnceLock<Client>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let user_agent = format!("honeybadger-rust/{NOTIFIER_VERSION}");
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent)
                .map_err(|e| Error::Transport(format!("invalid user agent: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Transport(format!("failed to create HTTP client: {}", e)))?;

        // A racing thread may have won; either client is equivalent.
        let _ = self.client.set(client);
        self.client
            .get()
            .ok_or_else(|| Error::Transport("HTTP client unavailable".to_string()))
    }

    /// Deliver one payload, surfacing every failure as an [`Error`]
    pub fn send_notice(&self, config: &Configuration, payload: &Value) -> Result<Option<NoticeId>> {
        if tokio::runtime::Handle::try_current().is_err() {
            return self.post_notice(config, payload);
        }

        std::thread::scope(|s| {
            let worker = std::thread::Builder::new()
                .name("honeybadger-send".to_string())
                .spawn_scoped(s, || self.post_notice(config, payload))
                .map_err(|e| Error::Transport(format!("failed to spawn delivery thread: {}", e)))?;

            match worker.join() {
                Ok(result) => result,
                Err(_) => Err(Error::Transport("delivery thread panicked".to_string())),
            }
        })
    }

    fn post_notice(&self, config: &Configuration, payload: &Value) -> Result<Option<NoticeId>> {
        let url = notices_url(&config.endpoint);
        let body = serde_json::to_vec(payload)?;

        let mut request = self
            .client()?
            .post(&url)
            .timeout(Duration::from_secs(config.timeout_secs))
            .body(body);

        match config.api_key.as_deref() {
            Some(api_key) => {
                let value = HeaderValue::from_str(api_key)
                    .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?;
                request = request.header(API_KEY_HEADER, value);
            }
            None => {
                tracing::warn!(
                    endpoint = %config.endpoint,
                    "api_key is not configured; the notices API will reject this request"
                );
            }
        }

        let response = request
            .send()
            .map_err(|e| Error::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            let body: Value = response
                .json()
                .map_err(|e| Error::Transport(format!("failed to parse response: {}", e)))?;
            Ok(notice_id_from(&body))
        } else {
            let error_text = response.text().unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Api {
                status: status.as_u16(),
                body: error_text,
            })
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, config: &Configuration, payload: &Value) -> Option<NoticeId> {
        match self.send_notice(config, payload) {
            Ok(Some(id)) => {
                tracing::debug!(notice_id = %id, "Notice delivered");
                Some(id)
            }
            Ok(None) => {
                tracing::debug!("Notice delivered; response carried no token");
                None
            }
            Err(e @ Error::Api { .. }) => {
                tracing::error!(endpoint = %config.endpoint, error = %e, "Notices API rejected notice");
                None
            }
            Err(e) => {
                tracing::warn!(endpoint = %config.endpoint, error = %e, "Failed to deliver notice");
                None
            }
        }
    }
}

fn notices_url(endpoint: &str) -> String {
    format!("{}/v1/notices/", endpoint.trim_end_matches('/'))
}

/// `error.token`, falling back to a top-level `id`
fn notice_id_from(body: &Value) -> Option<NoticeId> {
    body.pointer("/error/token")
        .or_else(|| body.get("id"))
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(String::from)
}
