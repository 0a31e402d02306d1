//! Panic reporting
//!
//! The hook chains onto whatever hook was installed before it, so the default
//! "thread panicked at" message still prints.

use std::cell::Cell;
use std::panic::PanicHookInfo;

use crate::context;
use crate::global;
use crate::notice::ErrorSource;
use crate::notifier::Notifier;

thread_local! {
    static REPORTING: Cell<bool> = const { Cell::new(false) };
}

/// Report panics through the shared notifier
pub fn install_panic_hook() {
    install_panic_hook_for(global::notifier().clone());
}

/// Report panics through `notifier`
pub fn install_panic_hook_for(notifier: Notifier) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        report_panic(&notifier, info);
        previous(info);
    }));
}

fn report_panic(notifier: &Notifier, info: &PanicHookInfo<'_>) {
    // A panic raised while reporting must not be reported again.
    if REPORTING.try_with(Cell::get).unwrap_or(true) {
        return;
    }

    let source = ErrorSource::from_panic(info);
    let ctx = context::get();
    let notifier = notifier.clone();

    // Delivery runs on its own thread: the panicking thread may be a runtime
    // worker, where blocking I/O is not allowed, and a second panic here aborts.
    let handle = std::thread::Builder::new()
        .name("honeybadger-panic".to_string())
        .spawn(move || {
            let _ = REPORTING.try_with(|flag| flag.set(true));
            notifier.notify_merged(source, ctx)
        });

    match handle {
        Ok(handle) => {
            if handle.join().is_err() {
                tracing::error!("Panic report thread panicked");
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to spawn panic report thread"),
    }
}
