/*!
 * Panic hook: reports Rust panics as fatal runtime errors.
 *
 * `install()` registers a `std::panic::set_hook` handler. When a panic
 * occurs, it:
 *
 * 1. Extracts the panic message, source location and thread name.
 * 2. Captures a backtrace at the panic site.
 * 3. Hands the report to the sink, if the handler reports fatal errors.
 * 4. Calls the previous panic hook, so the default output is preserved.
 *
 * # Recursion safety
 *
 * A panic raised while the hook runs aborts the process, so reporting is
 * not wrapped in `catch_unwind`. The `thread_local` flag only keeps the
 * hook from re-entering itself on the same thread.
 */

use std::cell::Cell;
use std::panic::{self, PanicHookInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::handler::ErrorHandler;
use crate::trace::capture_trace;
use crate::ErrorSink;

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// Keeps `install()` idempotent, so hooks don't stack up.
static INSTALLED: AtomicBool = AtomicBool::new(false);

thread_local! {
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/**
 * Installs the panic hook for the process.
 *
 * Returns `false` if a hook was already installed by an earlier call, in
 * which case nothing changes.
 */
pub fn install(handler: Arc<ErrorHandler>, sink: Arc<dyn ErrorSink>) -> bool {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return false;
    }

    let previous_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        let is_recursive = IN_HOOK.with(|flag| flag.replace(true));

        if !is_recursive {
            handle_panic(&handler, sink.as_ref(), info);
            IN_HOOK.with(|flag| flag.set(false));
        }

        previous_hook(info);
    }));

    true
}

// ---------------------------------------------------------------------------
// Internal: build and report
// ---------------------------------------------------------------------------

fn handle_panic(handler: &ErrorHandler, sink: &dyn ErrorSink, info: &PanicHookInfo) {
    let message = panic_message(info.payload());

    let (file, line) = match info.location() {
        Some(loc) => (loc.file().to_string(), loc.line()),
        None => (String::new(), 0),
    };

    let thread_name = std::thread::current()
        .name()
        .unwrap_or("<unnamed>")
        .to_string();

    if let Some(mut exception) = handler.panic_report(&message, &file, line, capture_trace()) {
        exception.message = format!("{message} [thread: {thread_name}]");
        sink.report(exception, None);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    match payload.downcast_ref::<&str>() {
        Some(s) => (*s).to_string(),
        None => match payload.downcast_ref::<String>() {
            Some(s) => s.clone(),
            None => "<unknown panic>".to_string(),
        },
    }
}
