//! Notice delivery
//!
//! Two strategies share the [`Transport`] interface:
//! - [`HttpTransport`] posts to `{endpoint}/v1/notices/`
//! - [`FakeTransport`] only logs; used outside production
//!
//! [`Route::for_config`] picks one per call. It is a pure function of the
//! configuration, so reconfiguring takes effect on the next notice.

mod fake;
mod http;

pub use fake::FakeTransport;
pub use http::HttpTransport;

use serde_json::Value;

use crate::config::Configuration;

/// Token the collection service assigns to a stored notice
pub type NoticeId = String;

/// A delivery strategy.
///
/// Implementations swallow their own failures: a reporting error must never
/// surface in the host application, so the only outcome is "id or nothing".
/// The id is the response's `error.token`; [`HttpTransport`] also accepts a
/// top-level `id` when the token is missing.
pub trait Transport: Send + Sync {
    fn send(&self, config: &Configuration, payload: &Value) -> Option<NoticeId>;
}

/// Which transport a notice goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Real,
    Fake,
}

impl Route {
    pub fn for_config(config: &Configuration) -> Self {
        if config.is_production() || config.force_report_data {
            Route::Real
        } else {
            Route::Fake
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;

    fn config(environment: &str, force: bool) -> Configuration {
        Configuration::default().resolve(&ConfigOverrides {
            environment: Some(environment.to_string()),
            force_report_data: Some(force),
            ..Default::default()
        })
    }

    #[test]
    fn test_route_development_is_fake() {
        assert_eq!(Route::for_config(&config("development", false)), Route::Fake);
        assert_eq!(Route::for_config(&config("test", false)), Route::Fake);
    }

    #[test]
    fn test_route_force_report_data_is_real() {
        assert_eq!(Route::for_config(&config("development", true)), Route::Real);
        assert_eq!(Route::for_config(&config("test", true)), Route::Real);
    }

    #[test]
    fn test_route_production_is_real() {
        assert_eq!(Route::for_config(&config("production", false)), Route::Real);
        assert_eq!(Route::for_config(&config("staging", false)), Route::Real);
    }
}
