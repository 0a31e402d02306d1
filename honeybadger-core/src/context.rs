//! Per-execution-unit context store
//!
//! Context is keyed by execution unit, not guarded by a lock:
//! - inside a [`scope`] the current tokio task owns its own map
//! - everywhere else the current OS thread does
//!
//! Nothing here clears context automatically. Adapters call [`clear`] (or open
//! a fresh [`scope`]) at the start of each independent unit of work, such as an
//! incoming request.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::future::Future;

use serde_json::Value;

/// Arbitrary metadata attached to notices
pub type Context = BTreeMap<String, Value>;

thread_local! {
    static THREAD_CONTEXT: RefCell<Context> = RefCell::new(Context::new());
}

tokio::task_local! {
    static TASK_CONTEXT: RefCell<Context>;
}

/// Run `f` against the current unit's cell.
///
/// Returns `None` only while the thread's storage is being torn down.
fn with_current<R>(f: impl FnOnce(&RefCell<Context>) -> R) -> Option<R> {
    if in_task_scope() {
        TASK_CONTEXT.try_with(f).ok()
    } else {
        THREAD_CONTEXT.try_with(f).ok()
    }
}

fn in_task_scope() -> bool {
    TASK_CONTEXT.try_with(|_| ()).is_ok()
}

/// Merge `entries` into the current unit's context. Later writes win per key.
///
/// Outside a [`scope`], context belongs to the OS thread. A tokio task that
/// never entered a scope therefore shares its worker thread's map with every
/// other unscoped task that worker polls; async adapters should wrap each unit
/// of work in [`scope`].
pub fn set<I, K, V>(entries: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    // Conversions run before the map is borrowed, so a panicking `Into` leaves
    // the store readable for the panic hook.
    let entries: Vec<(String, Value)> = entries
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect();

    if !in_task_scope() && tokio::runtime::Handle::try_current().is_ok() {
        tracing::debug!(
            "Context set on a runtime thread outside context::scope; it is shared per worker thread"
        );
    }

    with_current(|cell| match cell.try_borrow_mut() {
        Ok(mut ctx) => ctx.extend(entries),
        Err(_) => tracing::warn!("Context store is busy; entries dropped"),
    });
}

/// Snapshot of the current unit's context.
///
/// Empty if the store is unavailable, so it is safe to call from a panic hook.
pub fn get() -> Context {
    with_current(|cell| cell.try_borrow().map(|ctx| ctx.clone()).ok())
        .flatten()
        .unwrap_or_default()
}

/// Reset the current unit's context to empty
pub fn clear() {
    with_current(|cell| {
        if let Ok(mut ctx) = cell.try_borrow_mut() {
            ctx.clear();
        }
    });
}

/// Run `future` with its own empty task-local context.
///
/// Every `set`/`get`/`clear` made while the future is polled goes to that map,
/// whichever worker thread polls it.
pub async fn scope<F: Future>(future: F) -> F::Output {
    scope_with(Context::new(), future).await
}

/// Like [`scope`], seeded with `initial`
pub async fn scope_with<F: Future>(initial: Context, future: F) -> F::Output {
    TASK_CONTEXT.scope(RefCell::new(initial), future).await
}

/// Overlay `overlay` onto `base`; keys in `overlay` win
pub fn merge(mut base: Context, overlay: Context) -> Context {
    base.extend(overlay);
    base
}
