/**
 * Runtime error handler: filters raw error signals and forwards the ones
 * worth reporting to an `ErrorSink`.
 *
 * Two entry points, mirroring how the host runtime surfaces errors:
 *
 * - `handle_error`: called synchronously for every raised warning/error.
 *   Always answers "not handled" so the host's own handling still runs.
 * - `handle_shutdown`: called once at process exit with the last fatal
 *   error, if any. Fatal severities are only observable here.
 *
 * A memory reserve is held while capture is armed and dropped at the very
 * start of shutdown handling, so an out-of-memory fatal still leaves room
 * for the report to be built and sent.
 */
use std::sync::Mutex;

use slack_notifier_core::{
    CapturedException, Config, ExecutionContext, NormalizedError, Severity, StackFrame,
};
use tracing::debug;

use crate::trace::capture_trace;
use crate::ErrorSink;

/// Size of the block reserved while capture is armed.
pub const RESERVE_BYTES: usize = 500 * 1024;

/// Reporting mask with every severity enabled.
pub const REPORT_ALL: i32 = 32767;

// ---------------------------------------------------------------------------
// ErrorSignal
// ---------------------------------------------------------------------------

/// A raw error as raised by the host runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorSignal {
    pub severity: i32,
    pub message: String,
    pub file: String,
    pub line: u32,
    /// Variables in scope where the error was raised.
    pub context: Option<ExecutionContext>,
    /// Host reporting mask at the time of the error; `0` means silenced.
    pub reporting_mask: i32,
}

impl ErrorSignal {
    pub fn new(severity: impl Into<i32>, message: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            severity: severity.into(),
            message: message.into(),
            file: file.into(),
            line,
            context: None,
            reporting_mask: REPORT_ALL,
        }
    }

    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Marks the signal as raised with error reporting turned off.
    pub fn silenced(mut self) -> Self {
        self.reporting_mask = 0;
        self
    }
}

// ---------------------------------------------------------------------------
// MemoryReserve
// ---------------------------------------------------------------------------

/// Pre-allocated block, owned by the handler for as long as capture is armed.
#[derive(Debug, Default)]
pub struct MemoryReserve {
    block: Mutex<Option<Vec<u8>>>,
}

impl MemoryReserve {
    pub fn reserve(&self) {
        if let Ok(mut block) = self.block.lock() {
            if block.is_none() {
                *block = Some(vec![0u8; RESERVE_BYTES]);
            }
        }
    }

    pub fn release(&self) {
        if let Ok(mut block) = self.block.lock() {
            block.take();
        }
    }

    pub fn is_held(&self) -> bool {
        self.block.lock().map(|b| b.is_some()).unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// ErrorHandler
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ErrorHandler {
    report_silent: bool,
    report_warnings: bool,
    report_errors: bool,
    ignored_messages: Vec<String>,
    reserve: MemoryReserve,
}

impl ErrorHandler {
    pub fn from_config(config: &Config) -> Self {
        Self {
            report_silent: config.handle_silent_errors,
            report_warnings: config.handle_php_warnings,
            report_errors: config.handle_php_errors,
            ignored_messages: config.ignored_php_errors.clone(),
            reserve: MemoryReserve::default(),
        }
    }

    /// Whether any runtime error can be reported at all.
    pub fn is_enabled(&self) -> bool {
        self.report_errors || self.report_warnings
    }

    pub fn reports_errors(&self) -> bool {
        self.report_errors
    }

    /// Starts capture for a request or command. Idempotent.
    pub fn arm(&self) {
        self.reserve.reserve();
    }

    pub fn is_armed(&self) -> bool {
        self.reserve.is_held()
    }

    /**
     * Synchronous path.
     *
     * Reports the signal unless one of these applies, checked in order:
     * 1. reporting is silenced and silent errors are not wanted
     * 2. the severity is a warning and warnings are not wanted
     * 3. the message is in the ignore list
     *
     * Always returns `false`: the error is never marked as handled.
     */
    pub fn handle_error(&self, signal: &ErrorSignal, sink: &dyn ErrorSink) -> bool {
        if signal.reporting_mask == 0 && !self.report_silent {
            debug!(severity = signal.severity, "Silenced error skipped");
            return false;
        }

        let is_warning = Severity::from_code(signal.severity).is_some_and(Severity::is_warning_class);
        if is_warning && !self.report_warnings {
            debug!(severity = signal.severity, "Warning skipped");
            return false;
        }

        if self.is_ignored_message(&signal.message) {
            debug!(severity = signal.severity, "Ignored error message skipped");
            return false;
        }

        let error = NormalizedError::raised(signal.severity, signal.message.as_str(), signal.file.as_str(), signal.line);
        sink.report(error.into_captured(capture_trace()), signal.context.as_ref());

        false
    }

    /**
     * Shutdown path.
     *
     * Releases the memory reserve first, then reports `last` if its severity
     * is among `shutdown_severities()` and its message is not ignored.
     */
    pub fn handle_shutdown(&self, last: Option<&ErrorSignal>, sink: &dyn ErrorSink) {
        self.reserve.release();

        let Some(last) = last else {
            return;
        };

        let reportable = self
            .shutdown_severities()
            .iter()
            .any(|s| s.code() == last.severity);
        if !reportable || self.is_ignored_message(&last.message) {
            debug!(severity = last.severity, "Shutdown error skipped");
            return;
        }

        let error = NormalizedError::at_shutdown(last.severity, last.message.as_str(), last.file.as_str(), last.line);
        sink.report(error.into_captured(Vec::new()), None);
    }

    /// Severities reported at shutdown under the current flags.
    pub fn shutdown_severities(&self) -> Vec<Severity> {
        let mut severities = Vec::new();
        if self.report_errors {
            severities.extend(Severity::SHUTDOWN_ERRORS);
        }
        if self.report_warnings {
            severities.extend(Severity::SHUTDOWN_WARNINGS);
        }
        severities
    }

    /// Builds the report for a panic, or `None` when fatal errors are not wanted.
    pub fn panic_report(&self, message: &str, file: &str, line: u32, trace: Vec<StackFrame>) -> Option<CapturedException> {
        if !self.report_errors || self.is_ignored_message(message) {
            return None;
        }
        Some(NormalizedError::panic(message, file, line).into_captured(trace))
    }

    fn is_ignored_message(&self, message: &str) -> bool {
        self.ignored_messages.iter().any(|m| m == message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::RecordingSink;

    fn handler(warnings: bool, errors: bool, silent: bool, ignored: &[&str]) -> ErrorHandler {
        let mut config = Config::new("c", "t");
        config.handle_php_warnings = warnings;
        config.handle_php_errors = errors;
        config.handle_silent_errors = silent;
        config.ignored_php_errors = ignored.iter().map(|s| s.to_string()).collect();
        ErrorHandler::from_config(&config)
    }

    #[test]
    fn test_warning_class_needs_warning_flag() {
        for severity in Severity::ALL {
            for warnings in [false, true] {
                let sink = RecordingSink::default();
                let handler = handler(warnings, true, false, &[]);

                let handled = handler.handle_error(&ErrorSignal::new(severity, "boom", "/a.php", 1), &sink);
                assert!(!handled);

                let expected = !severity.is_warning_class() || warnings;
                assert_eq!(
                    sink.count(),
                    usize::from(expected),
                    "severity {severity:?}, warnings {warnings}"
                );
            }
        }
    }

    #[test]
    fn test_ignored_messages_never_reported() {
        for severity in Severity::ALL {
            let sink = RecordingSink::default();
            let handler = handler(true, true, true, &["Undefined index: foo"]);

            handler.handle_error(&ErrorSignal::new(severity, "Undefined index: foo", "/a.php", 1), &sink);
            handler.handle_shutdown(Some(&ErrorSignal::new(severity, "Undefined index: foo", "/a.php", 1)), &sink);
            assert_eq!(sink.count(), 0, "severity {severity:?}");
        }
    }

    #[test]
    fn test_silenced_errors() {
        let signal = ErrorSignal::new(Severity::Warning, "boom", "/a.php", 1).silenced();

        let sink = RecordingSink::default();
        handler(true, true, false, &[]).handle_error(&signal, &sink);
        assert_eq!(sink.count(), 0);

        let sink = RecordingSink::default();
        handler(true, true, true, &[]).handle_error(&signal, &sink);
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn test_sync_report_shape() {
        let sink = RecordingSink::default();
        let context = ExecutionContext::new().with("user", "42");
        let signal = ErrorSignal::new(Severity::Warning, "Division by zero", "/app/src/Math.php", 12)
            .with_context(context.clone());

        handler(false, false, false, &[]).handle_error(&signal, &sink);

        let (exception, reported_context) = sink.last();
        assert_eq!(exception.class_name, "ErrorException");
        assert_eq!(exception.message, "Warning: Division by zero in /app/src/Math.php line 12");
        assert_eq!(exception.code, 0);
        assert_eq!(exception.line, 12);
        assert_eq!(reported_context, Some(context));
    }

    #[test]
    fn test_shutdown_severity_set() {
        assert!(handler(false, false, false, &[]).shutdown_severities().is_empty());
        assert_eq!(
            handler(false, true, false, &[]).shutdown_severities(),
            Severity::SHUTDOWN_ERRORS.to_vec()
        );
        assert_eq!(
            handler(true, false, false, &[]).shutdown_severities(),
            Severity::SHUTDOWN_WARNINGS.to_vec()
        );
        assert_eq!(handler(true, true, false, &[]).shutdown_severities().len(), 7);
    }

    #[test]
    fn test_shutdown_reports_fatal_with_native_code() {
        let sink = RecordingSink::default();
        let handler = handler(false, true, false, &[]);

        handler.handle_shutdown(
            Some(&ErrorSignal::new(Severity::Error, "Allowed memory size exhausted", "/app/a.php", 9)),
            &sink,
        );

        let (exception, context) = sink.last();
        assert_eq!(exception.code, 1);
        assert_eq!(
            exception.message,
            "Error: Allowed memory size exhausted in /app/a.php line 9"
        );
        assert!(exception.trace.is_empty());
        assert_eq!(context, None);
    }

    #[test]
    fn test_shutdown_skips_unlisted_severity() {
        let sink = RecordingSink::default();
        let handler = handler(true, true, false, &[]);

        handler.handle_shutdown(Some(&ErrorSignal::new(Severity::Warning, "w", "/a.php", 1)), &sink);
        handler.handle_shutdown(None, &sink);
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_reserve_released_at_shutdown() {
        let handler = handler(false, true, false, &[]);
        assert!(!handler.is_armed());

        handler.arm();
        handler.arm();
        assert!(handler.is_armed());

        handler.handle_shutdown(None, &RecordingSink::default());
        assert!(!handler.is_armed());
    }

    #[test]
    fn test_panic_report_gated_by_errors_flag() {
        assert!(handler(true, false, false, &[])
            .panic_report("boom", "src/main.rs", 3, vec![])
            .is_none());

        let report = handler(false, true, false, &[])
            .panic_report("boom", "src/main.rs", 3, vec![])
            .unwrap();
        assert_eq!(report.class_name, "panic");
        assert_eq!(report.message, "boom");
        assert_eq!(report.file, "src/main.rs");
    }
}
