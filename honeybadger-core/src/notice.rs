//! Error normalization
//!
//! Every report starts as an [`ErrorSource`]:
//! - `Live`: built from an error value or a panic, with a backtrace captured
//!   at the point of reporting and the `source()` chain as causes
//! - `Explicit`: class and message given directly by the caller
//!
//! Both collapse into the same [`Notice`] shape before a payload is built.

use std::any::Any;
use std::error::Error as StdError;
use std::panic::PanicHookInfo;

use serde::Serialize;

use crate::context::Context;

/// Class used when the caller gives only a message
pub const DEFAULT_CLASS: &str = "Error";

/// Class reported for panics
pub const PANIC_CLASS: &str = "panic";

const MAX_FRAMES: usize = 100;

/// Frames from these paths are dropped from the top of a captured stack
const SKIPPED_INITIAL_PREFIXES: &[&str] = &[
    "backtrace::",
    "honeybadger_core::",
    "std::",
    "core::",
    "alloc::",
    "rust_begin_unwind",
    "__rust",
];

/// One stack frame in the wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub file: String,
    pub number: Option<u32>,
    pub method: String,
}

/// One link of an error's `source()` chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cause {
    pub class: String,
    pub message: String,
}

/// What the caller handed to `notify`
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSource {
    Live {
        class: String,
        message: String,
        backtrace: Vec<Frame>,
        causes: Vec<Cause>,
    },
    Explicit {
        class: String,
        message: String,
    },
}

impl ErrorSource {
    /// Capture a live error. The class is the error's type name without its
    /// module path, so `my_app::errors::ValueError` reports as `ValueError`.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: StdError + 'static,
    {
        Self::Live {
            class: short_type_name(std::any::type_name::<E>()),
            message: error.to_string(),
            backtrace: capture_backtrace(),
            causes: collect_causes(error.source()),
        }
    }

    /// Capture a type-erased error. The class is guessed from its `Debug` output.
    pub fn from_dyn(error: &(dyn StdError + 'static)) -> Self {
        Self::Live {
            class: class_from_debug(error),
            message: error.to_string(),
            backtrace: capture_backtrace(),
            causes: collect_causes(error.source()),
        }
    }

    /// Capture a panic from inside a panic hook
    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let mut message = panic_message(info.payload());
        if let Some(location) = info.location() {
            message = format!("{message} at {}:{}", location.file(), location.line());
        }

        Self::Live {
            class: PANIC_CLASS.to_string(),
            message,
            backtrace: capture_backtrace(),
            causes: Vec::new(),
        }
    }

    /// Use `class` and `message` literally, with no backtrace
    pub fn explicit(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Explicit {
            class: class.into(),
            message: message.into(),
        }
    }

    /// Message-only report under [`DEFAULT_CLASS`]
    pub fn message(message: impl Into<String>) -> Self {
        Self::explicit(DEFAULT_CLASS, message)
    }

    /// Replace the reported class
    pub fn with_class(self, new_class: impl Into<String>) -> Self {
        match self {
            Self::Live {
                message,
                backtrace,
                causes,
                ..
            } => Self::Live {
                class: new_class.into(),
                message,
                backtrace,
                causes,
            },
            Self::Explicit { message, .. } => Self::Explicit {
                class: new_class.into(),
                message,
            },
        }
    }

    pub fn class(&self) -> &str {
        match self {
            Self::Live { class, .. } | Self::Explicit { class, .. } => class,
        }
    }

    pub fn message_text(&self) -> &str {
        match self {
            Self::Live { message, .. } | Self::Explicit { message, .. } => message,
        }
    }

    /// Attach the merged context and normalize
    pub fn into_notice(self, context: Context) -> Notice {
        match self {
            Self::Live {
                class,
                message,
                backtrace,
                causes,
            } => Notice {
                class,
                message,
                backtrace,
                causes,
                context,
            },
            Self::Explicit { class, message } => Notice {
                class,
                message,
                backtrace: Vec::new(),
                causes: Vec::new(),
                context,
            },
        }
    }
}

impl From<&str> for ErrorSource {
    fn from(message: &str) -> Self {
        Self::message(message)
    }
}

impl From<String> for ErrorSource {
    fn from(message: String) -> Self {
        Self::message(message)
    }
}

/// A normalized report, alive for one `notify` call
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub class: String,
    pub message: String,
    pub backtrace: Vec<Frame>,
    pub causes: Vec<Cause>,
    pub context: Context,
}

/// `a::b::Name<c::D>` -> `Name<c::D>`
fn short_type_name(full: &str) -> String {
    let (path, generics) = match full.find('<') {
        Some(idx) => full.split_at(idx),
        None => (full, ""),
    };
    let name = path.rsplit("::").next().unwrap_or(path);
    format!("{name}{generics}")
}

/// Leading identifier of the `Debug` output, e.g. `ParseError { .. }` -> `ParseError`
fn class_from_debug(error: &dyn StdError) -> String {
    let debug = format!("{error:?}");
    let ident: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();

    match ident.chars().next() {
        Some(first) if first.is_uppercase() => ident,
        _ => DEFAULT_CLASS.to_string(),
    }
}

fn collect_causes(mut source: Option<&(dyn StdError + 'static)>) -> Vec<Cause> {
    let mut causes = Vec::new();
    while let Some(err) = source {
        causes.push(Cause {
            class: class_from_debug(err),
            message: err.to_string(),
        });
        source = err.source();
    }
    causes
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Walk the current stack, skipping reporter and runtime frames at the top
pub fn capture_backtrace() -> Vec<Frame> {
    let mut frames = Vec::new();
    let mut initial_filtering = true;

    backtrace::trace(|raw| {
        backtrace::resolve_frame(raw, |symbol| {
            let Some(name) = symbol.name() else {
                return;
            };
            let method = format!("{name:#}");

            if initial_filtering {
                if SKIPPED_INITIAL_PREFIXES
                    .iter()
                    .any(|prefix| method.starts_with(prefix))
                {
                    return;
                }
                initial_filtering = false;
            }

            frames.push(Frame {
                file: symbol
                    .filename()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string()),
                number: symbol.lineno(),
                method,
            });
        });
        frames.len() < MAX_FRAMES
    });

    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fmt;

    #[derive(Debug)]
    struct ValueError(String);

    impl fmt::Display for ValueError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl StdError for ValueError {}

    #[derive(Debug)]
    struct WrappedError {
        inner: ValueError,
    }

    impl fmt::Display for WrappedError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "wrapped: {}", self.inner)
        }
    }

    impl StdError for WrappedError {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.inner)
        }
    }

    #[test]
    fn test_from_error_uses_short_type_name() {
        let source = ErrorSource::from_error(&ValueError("Test value error.".to_string()));
        assert_eq!(source.class(), "ValueError");
        assert_eq!(source.message_text(), "Test value error.");
        assert!(matches!(source, ErrorSource::Live { .. }));
    }

    #[test]
    fn test_from_error_collects_causes() {
        let err = WrappedError {
            inner: ValueError("inner".to_string()),
        };
        let notice = ErrorSource::from_error(&err).into_notice(Context::new());
        assert_eq!(notice.class, "WrappedError");
        assert_eq!(notice.message, "wrapped: inner");
        assert_eq!(
            notice.causes,
            vec![Cause {
                class: "ValueError".to_string(),
                message: "inner".to_string(),
            }]
        );
    }

    #[test]
    fn test_from_dyn_guesses_class_from_debug() {
        let err: Box<dyn StdError> = Box::new(ValueError("boxed".to_string()));
        let source = ErrorSource::from_dyn(err.as_ref());
        assert_eq!(source.class(), "ValueError");
        assert_eq!(source.message_text(), "boxed");
    }

    #[test]
    fn test_explicit_has_no_backtrace() {
        let mut ctx = Context::new();
        ctx.insert("foo".to_string(), json!("bar"));

        let notice = ErrorSource::explicit("Exception", "Test message.").into_notice(ctx.clone());
        assert_eq!(notice.class, "Exception");
        assert_eq!(notice.message, "Test message.");
        assert!(notice.backtrace.is_empty());
        assert_eq!(notice.context, ctx);
    }

    #[test]
    fn test_message_only_uses_default_class() {
        let source: ErrorSource = "Custom Middleware Exception".into();
        assert_eq!(source.class(), DEFAULT_CLASS);
        assert_eq!(source.message_text(), "Custom Middleware Exception");
    }

    #[test]
    fn test_with_class_keeps_message() {
        let source = ErrorSource::from_error(&ValueError("x".to_string())).with_class("Renamed");
        assert_eq!(source.class(), "Renamed");
        assert_eq!(source.message_text(), "x");
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("my_app::errors::ValueError"), "ValueError");
        assert_eq!(short_type_name("Plain"), "Plain");
        assert_eq!(
            short_type_name("my_app::Wrapper<std::io::Error>"),
            "Wrapper<std::io::Error>"
        );
    }

    #[test]
    fn test_class_from_debug_falls_back() {
        let parse_err = "x".parse::<u32>().unwrap_err();
        assert_eq!(class_from_debug(&parse_err), "ParseIntError");

        let fmt_err = fmt::Error;
        assert_eq!(class_from_debug(&fmt_err), "Error");
    }

    #[test]
    fn test_panic_message_payloads() {
        let static_str: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(static_str.as_ref()), "boom");

        let owned: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(owned.as_ref()), "owned boom");

        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "Box<dyn Any>");
    }

    #[test]
    fn test_capture_backtrace_is_bounded() {
        let frames = capture_backtrace();
        assert!(frames.len() <= MAX_FRAMES);
        if let Some(top) = frames.first() {
            assert!(!top.method.starts_with("backtrace::"));
            assert!(!top.method.starts_with("honeybadger_core::"));
        }
    }
}
