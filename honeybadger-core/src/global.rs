//! Process-wide notifier
//!
//! Framework adapters call these free functions instead of threading a
//! [`Notifier`] through the host. The instance is created from
//! `HONEYBADGER_*` variables on first use and reconfigured with [`configure`].

use std::error::Error as StdError;
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::config::{ConfigOverrides, Configuration};
use crate::context::Context;
use crate::error::Result;
use crate::notice::ErrorSource;
use crate::notifier::Notifier;
use crate::transport::NoticeId;

static GLOBAL: OnceLock<Notifier> = OnceLock::new();

/// The shared notifier
pub fn notifier() -> &'static Notifier {
    GLOBAL.get_or_init(Notifier::from_env)
}

/// Apply overrides to the shared notifier's configuration
pub fn configure(overrides: &ConfigOverrides) -> Result<Arc<Configuration>> {
    notifier().configure(overrides)
}

/// Report through the shared notifier
pub fn notify(source: impl Into<ErrorSource>, context: Context) -> Option<NoticeId> {
    notifier().notify(source.into(), context)
}

/// Report a live error through the shared notifier
pub fn notify_error<E>(error: &E) -> Option<NoticeId>
where
    E: StdError + 'static,
{
    notifier().notify_error(error)
}

/// Merge entries into the current unit's context.
///
/// In async code, wrap each request in [`crate::context::scope`]; without one
/// the context is per worker thread and shared by unscoped tasks.
pub fn set_context<I, K, V>(entries: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    crate::context::set(entries);
}

/// Reset the current unit's context
pub fn clear_context() {
    crate::context::clear();
}

/// Snapshot of the current unit's context
pub fn context() -> Context {
    crate::context::get()
}
