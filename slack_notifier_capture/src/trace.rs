/*!
 * Conversion of native backtraces into stack frames.
 */

use slack_notifier_core::{CallType, StackFrame};

/// Captures the current call stack.
pub fn capture_trace() -> Vec<StackFrame> {
    let bt = backtrace::Backtrace::new();
    convert_backtrace(&bt)
}

/**
 * Converts a `backtrace::Backtrace` into stack frames, innermost first.
 *
 * Symbols are split at their last `::`, so `app::db::connect` reads as
 * `app::db :: connect`. Symbols with neither a name nor a file are dropped,
 * as are the frames of the backtrace machinery itself.
 */
pub fn convert_backtrace(bt: &backtrace::Backtrace) -> Vec<StackFrame> {
    let mut frames = Vec::new();

    for frame in bt.frames() {
        for symbol in frame.symbols() {
            let function = symbol.name().map(|n| format!("{n:#}"));
            let file = symbol.filename().map(|p| p.display().to_string());

            if function.is_none() && file.is_none() {
                continue;
            }
            if function.as_deref().is_some_and(is_capture_machinery) {
                continue;
            }

            let mut converted = split_symbol(function.as_deref().unwrap_or("<unknown>"));
            converted.file = file;
            converted.line = symbol.lineno();
            frames.push(converted);
        }
    }

    frames
}

fn split_symbol(symbol: &str) -> StackFrame {
    match symbol.rsplit_once("::") {
        Some((path, name)) if !path.is_empty() && !name.is_empty() => {
            StackFrame::method(path, CallType::Static, name)
        }
        _ => StackFrame::function(symbol),
    }
}

fn is_capture_machinery(function: &str) -> bool {
    function.starts_with("backtrace::") || function.starts_with("slack_notifier_capture::trace::")
}
