//! `tracing` bridge
//!
//! [`NotifierLayer`] turns log events at or above a level (ERROR by default)
//! into notices. The event's target becomes the error class, its `message`
//! field the message, and every other field is added to the context.
//!
//! ```rust,no_run
//! use honeybadger_core::{Notifier, NotifierLayer};
//! use tracing_subscriber::{layer::SubscriberExt, Registry};
//!
//! let subscriber = Registry::default()
//!     .with(NotifierLayer::new(Notifier::from_env()))
//!     .with(tracing_subscriber::fmt::layer());
//!
//! tracing::subscriber::set_global_default(subscriber).expect("failed to set subscriber");
//! ```

use std::cell::Cell;
use std::error::Error as StdError;
use std::fmt;

use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context as LayerContext;

use crate::context::Context;
use crate::notice::ErrorSource;
use crate::notifier::Notifier;

const OWN_TARGET: &str = "honeybadger_core";

thread_local! {
    static IN_LAYER: Cell<bool> = const { Cell::new(false) };
}

/// Reports log events through a [`Notifier`]
#[derive(Clone)]
pub struct NotifierLayer {
    notifier: Notifier,
    min_level: Level,
}

impl NotifierLayer {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            notifier,
            min_level: Level::ERROR,
        }
    }

    /// Also report events less severe than ERROR, down to `level`
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }
}

impl<S> tracing_subscriber::Layer<S> for NotifierLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        let meta = event.metadata();
        // Levels compare by verbosity: ERROR is the smallest.
        if *meta.level() > self.min_level || meta.target().starts_with(OWN_TARGET) {
            return;
        }

        // Events raised while delivering are not reported again.
        if IN_LAYER.try_with(|flag| flag.replace(true)).unwrap_or(true) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let message = visitor.message.unwrap_or_else(|| meta.name().to_string());
        self.notifier
            .notify(ErrorSource::explicit(meta.target(), message), visitor.fields);

        let _ = IN_LAYER.try_with(|flag| flag.set(false));
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Context,
}

impl EventVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn StdError + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }
}
