//! Notice orchestration
//!
//! `notify` runs on the caller's thread and makes at most one delivery attempt:
//!
//! ```text
//! ErrorSource ─▶ excluded? ─▶ merge context ─▶ Payload ─▶ Route ─▶ Transport::send
//!                   │                                                   │
//!                   └─▶ None (no delivery, no log)                      └─▶ Option<NoticeId>
//! ```
//!
//! Nothing in here returns an error or lets a panic escape to the caller.

use std::error::Error as StdError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use crate::config::{ConfigOverrides, Configuration};
use crate::context::{self, Context};
use crate::error::Result;
use crate::notice::ErrorSource;
use crate::payload::Payload;
use crate::transport::{FakeTransport, HttpTransport, NoticeId, Route, Transport};

/// Cheap, cloneable handle to one notifier instance
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<Inner>,
}

struct Inner {
    config: RwLock<Arc<Configuration>>,
    real: Arc<dyn Transport>,
    fake: Arc<dyn Transport>,
}

impl Notifier {
    /// Notifier with the HTTP and logging transports
    pub fn new(config: Configuration) -> Self {
        Self::with_transports(config, Arc::new(HttpTransport::new()), Arc::new(FakeTransport))
    }

    /// Notifier configured from `HONEYBADGER_*` variables
    pub fn from_env() -> Self {
        Self::new(Configuration::from_env())
    }

    /// Notifier with caller-supplied transports for each route
    pub fn with_transports(
        config: Configuration,
        real: Arc<dyn Transport>,
        fake: Arc<dyn Transport>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: RwLock::new(Arc::new(config)),
                real,
                fake,
            }),
        }
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> Arc<Configuration> {
        match self.inner.config.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Apply `overrides` on top of the current configuration.
    ///
    /// An invalid result is rejected and the previous configuration stays
    /// in effect. Calls already in flight keep the snapshot they started with.
    pub fn configure(&self, overrides: &ConfigOverrides) -> Result<Arc<Configuration>> {
        let mut guard = match self.inner.config.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let next = guard.resolve(overrides);
        next.validate()?;

        let next = Arc::new(next);
        *guard = Arc::clone(&next);
        tracing::debug!(environment = %next.environment, "Notifier reconfigured");
        Ok(next)
    }

    /// Report `source` with call-site `context` layered over this unit's context
    pub fn notify(&self, source: ErrorSource, context: Context) -> Option<NoticeId> {
        let merged = context::merge(context::get(), context);
        self.notify_merged(source, merged)
    }

    /// `notify` with the unit's context already folded in
    pub(crate) fn notify_merged(&self, source: ErrorSource, context: Context) -> Option<NoticeId> {
        let config = self.config();
        if config.is_excluded(source.class()) {
            return None;
        }

        self.deliver(&config, source, context)
    }

    /// Report a live error value
    pub fn notify_error<E>(&self, error: &E) -> Option<NoticeId>
    where
        E: StdError + 'static,
    {
        self.notify(ErrorSource::from_error(error), Context::new())
    }

    /// Report from async code without blocking a runtime worker.
    ///
    /// Context is read on the calling task, then delivery runs on tokio's
    /// blocking pool.
    pub async fn notify_async(&self, source: ErrorSource, context: Context) -> Option<NoticeId> {
        if self.config().is_excluded(source.class()) {
            return None;
        }

        let merged = context::merge(context::get(), context);
        let notifier = self.clone();

        match tokio::task::spawn_blocking(move || notifier.notify_merged(source, merged)).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(error = %e, "Notice delivery task failed");
                None
            }
        }
    }

    fn deliver(
        &self,
        config: &Configuration,
        source: ErrorSource,
        context: Context,
    ) -> Option<NoticeId> {
        let class = source.class().to_string();

        let payload = match Payload::build(source.into_notice(context), config).to_json() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(class = %class, error = %e, "Failed to encode notice");
                return None;
            }
        };

        let transport = match Route::for_config(config) {
            Route::Real => &self.inner.real,
            Route::Fake => &self.inner.fake,
        };

        match catch_unwind(AssertUnwindSafe(|| transport.send(config, &payload))) {
            Ok(id) => id,
            Err(_) => {
                tracing::error!(class = %class, "Transport panicked while sending notice");
                None
            }
        }
    }
}
