//! # honeybadger-core
//!
//! In-process error reporting: capture errors and panics, attach context, and
//! deliver them to the Honeybadger notices API.
//!
//! This library provides:
//! - Configuration resolved from defaults, `HONEYBADGER_*` variables and overrides
//! - A per-thread / per-task context store
//! - A notifier that routes each notice to HTTP delivery or a logging-only path
//! - A process-wide notifier and panic hook for adapters
//! - A `tracing` layer that reports ERROR events
//!
//! ## Routing
//!
//! Notices from `development` and `test` environments are only logged, unless
//! `force_report_data` is set. Everything else is posted to
//! `{endpoint}/v1/notices/`. Delivery is one best-effort attempt; failures are
//! logged and `notify` returns `None`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use honeybadger_core::{ConfigOverrides, Context, ErrorSource};
//!
//! honeybadger_core::configure(&ConfigOverrides {
//!     api_key: Some("hbp_xxxxxxxx".to_string()),
//!     environment: Some("production".to_string()),
//!     ..Default::default()
//! })
//! .expect("invalid configuration");
//!
//! honeybadger_core::set_context([("user_id", 42)]);
//!
//! let id = honeybadger_core::notify(
//!     ErrorSource::explicit("CheckoutError", "card declined"),
//!     Context::new(),
//! );
//! println!("notice: {:?}", id);
//! ```

// Re-export commonly used items at the crate root
pub use config::{ConfigOverrides, Configuration};
pub use context::Context;
pub use error::{Error, Result};
pub use layer::NotifierLayer;
pub use global::{clear_context, configure, context, notifier, notify, notify_error, set_context};
pub use notice::{ErrorSource, Notice};
pub use notifier::Notifier;
pub use panic_hook::{install_panic_hook, install_panic_hook_for};
pub use payload::Payload;
pub use transport::{FakeTransport, HttpTransport, NoticeId, Route, Transport};

// Public modules
pub mod config;
pub mod context;
pub mod error;
pub mod global;
pub mod layer;
pub mod logging;
pub mod notice;
pub mod notifier;
pub mod panic_hook;
pub mod payload;
pub mod transport;
