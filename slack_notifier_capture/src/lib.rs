/*!
 * Slack Notifier Capture: intercepts runtime errors and panics.
 *
 * Raw error signals go through `ErrorHandler`, which filters them by
 * severity, reporting mask and message, and turns the survivors into
 * flattened exceptions. Those are handed to an `ErrorSink`; the facade's
 * listener is the sink that feeds them into the notification pipeline.
 *
 * # Module structure
 *
 * - `handler`: synchronous and shutdown-time handlers, memory reserve
 * - `panic`: process panic hook
 * - `trace`: native backtrace conversion
 */

pub mod handler;
pub mod panic;
pub mod trace;

use slack_notifier_core::{CapturedException, ExecutionContext};

pub use handler::{ErrorHandler, ErrorSignal, MemoryReserve, REPORT_ALL, RESERVE_BYTES};
pub use trace::{capture_trace, convert_backtrace};

/// Receives every captured error that passed the handler's filters.
pub trait ErrorSink: Send + Sync {
    fn report(&self, exception: CapturedException, context: Option<&ExecutionContext>);
}
