/**
 * Flattened exceptions.
 *
 * A `CapturedException` is a serializable snapshot of an error: no live
 * objects, no references back into the host. It is created per error event,
 * handed through the pipeline once, and dropped afterwards.
 *
 * Runtime errors (warnings, notices, fatal errors, panics) enter as a
 * `NormalizedError` and are converted with `NormalizedError::into_captured`.
 *
 * Exceptions form a chain through `previous`, outermost first. A Rust error
 * is flattened together with its `source()` chain by
 * `CapturedException::from_error`.
 */
use std::error::Error;

use serde::{Deserialize, Serialize};

use super::severity::{severity_label, Severity};

/// Status code reported for anything that is not an HTTP exception.
pub const DEFAULT_STATUS_CODE: u16 = 500;

/// Class name given to runtime errors converted into exceptions.
pub const ERROR_EXCEPTION_CLASS: &str = "ErrorException";

/// Class name given to captured panics.
pub const PANIC_CLASS: &str = "panic";

/// Class name given to `source()` links, whose concrete type is erased.
pub const ERROR_SOURCE_CLASS: &str = "source";

// ---------------------------------------------------------------------------
// CapturedException
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapturedException {
    /// Fully qualified type name, e.g. `App\Service\DbException`.
    pub class_name: String,
    pub message: String,
    pub code: i64,
    pub file: String,
    pub line: u32,

    /// Set only for exceptions that carry an HTTP status.
    pub http_status: Option<u16>,

    /// Stack frames, innermost call first.
    pub trace: Vec<StackFrame>,

    /// The exception this one was raised from, if any.
    pub previous: Option<Box<CapturedException>>,
}

impl CapturedException {
    pub fn new(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message: message.into(),
            code: 0,
            file: String::new(),
            line: 0,
            http_status: None,
            trace: Vec::new(),
            previous: None,
        }
    }

    /**
     * Flattens a Rust error and its `source()` chain.
     *
     * The outer link is named after `E`; sources only expose `dyn Error`,
     * so they are named `source`. None of the links carries a trace.
     */
    pub fn from_error<E: Error>(error: &E) -> Self {
        let mut sources = Vec::new();
        let mut next = error.source();
        while let Some(source) = next {
            sources.push(CapturedException::new(ERROR_SOURCE_CLASS, source.to_string()));
            next = source.source();
        }

        let previous = sources
            .into_iter()
            .rev()
            .fold(None, |inner: Option<Box<CapturedException>>, mut link| {
                link.previous = inner;
                Some(Box::new(link))
            });

        let mut exception = Self::new(std::any::type_name::<E>(), error.to_string());
        exception.previous = previous;
        exception
    }

    /// Marks this as an HTTP exception with the given status.
    pub fn http(class_name: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        let mut exception = Self::new(class_name, message);
        exception.http_status = Some(status);
        exception
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    pub fn with_trace(mut self, trace: Vec<StackFrame>) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_previous(mut self, previous: CapturedException) -> Self {
        self.previous = Some(Box::new(previous));
        self
    }

    /// This exception followed by every previous one, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &CapturedException> {
        std::iter::successors(Some(self), |exception| exception.previous.as_deref())
    }

    pub fn is_http(&self) -> bool {
        self.http_status.is_some()
    }

    /// HTTP-style status; 500 unless this is an HTTP exception.
    pub fn status_code(&self) -> u16 {
        self.http_status.unwrap_or(DEFAULT_STATUS_CODE)
    }

    /// Last segment of the class name (`App\Foo\BarException` → `BarException`).
    pub fn short_class_name(&self) -> &str {
        short_name(&self.class_name)
    }
}

/// Last segment of a namespaced type name. Accepts both `\` and `::` separators.
pub fn short_name(full: &str) -> &str {
    let after_backslash = full.rsplit('\\').next().unwrap_or(full);
    after_backslash.rsplit("::").next().unwrap_or(after_backslash)
}

// ---------------------------------------------------------------------------
// StackFrame
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallType {
    Static,
    Instance,
}

impl CallType {
    pub fn as_str(self) -> &'static str {
        match self {
            CallType::Static => "::",
            CallType::Instance => "->",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    pub function_name: String,
    pub class_name: Option<String>,
    pub call_type: Option<CallType>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub arguments: Vec<ArgumentDescriptor>,
}

impl StackFrame {
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            function_name: name.into(),
            ..Default::default()
        }
    }

    pub fn method(class: impl Into<String>, call_type: CallType, name: impl Into<String>) -> Self {
        Self {
            function_name: name.into(),
            class_name: Some(class.into()),
            call_type: Some(call_type),
            ..Default::default()
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_args(mut self, arguments: Vec<ArgumentDescriptor>) -> Self {
        self.arguments = arguments;
        self
    }

    /// File and line, when both are known.
    pub fn location(&self) -> Option<(&str, u32)> {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => Some((file.as_str(), line)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ArgumentDescriptor
// ---------------------------------------------------------------------------

/**
 * Description of one call argument, without serializing the value itself.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ArgumentDescriptor {
    /// An object, described by its type name only.
    Object(String),
    Array(Vec<ArrayEntry>),
    String(String),
    Null,
    Boolean(bool),
    Resource,
    /// Anything else, in its best-effort string form.
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayKey {
    Index(usize),
    Name(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrayEntry {
    pub key: ArrayKey,
    pub value: ArgumentDescriptor,
}

impl ArrayEntry {
    pub fn indexed(index: usize, value: ArgumentDescriptor) -> Self {
        Self {
            key: ArrayKey::Index(index),
            value,
        }
    }

    pub fn named(key: impl Into<String>, value: ArgumentDescriptor) -> Self {
        Self {
            key: ArrayKey::Name(key.into()),
            value,
        }
    }
}

// ---------------------------------------------------------------------------
// NormalizedError
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Warning,
    Notice,
    Error,
    Fatal,
    /// A panic or other uncaught exception seen by the capture adapter.
    Exception,
}

impl ErrorKind {
    fn from_severity(code: i32) -> Self {
        match Severity::from_code(code) {
            Some(Severity::Notice | Severity::UserNotice | Severity::Strict) => ErrorKind::Notice,
            Some(
                Severity::Warning
                | Severity::UserWarning
                | Severity::CoreWarning
                | Severity::CompileWarning
                | Severity::Deprecated
                | Severity::UserDeprecated,
            ) => ErrorKind::Warning,
            Some(
                Severity::Error | Severity::Parse | Severity::CoreError | Severity::CompileError,
            ) => ErrorKind::Fatal,
            Some(Severity::UserError | Severity::RecoverableError) | None => ErrorKind::Error,
        }
    }
}

/**
 * A runtime error signal in uniform shape. Immutable once created.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedError {
    kind: ErrorKind,
    message: String,
    file: String,
    line: u32,
    severity_level: i32,
    native_error_code: Option<i32>,
}

impl NormalizedError {
    /// An error raised while running; carries no native error code.
    pub fn raised(severity_level: i32, message: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            kind: ErrorKind::from_severity(severity_level),
            message: message.into(),
            file: file.into(),
            line,
            severity_level,
            native_error_code: None,
        }
    }

    /// The last error observed at shutdown; its severity doubles as error code.
    pub fn at_shutdown(severity_level: i32, message: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            native_error_code: Some(severity_level),
            ..Self::raised(severity_level, message, file, line)
        }
    }

    /// A panic, reported as an uncaught exception.
    pub fn panic(message: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            kind: ErrorKind::Exception,
            message: message.into(),
            file: file.into(),
            line,
            severity_level: Severity::Error.code(),
            native_error_code: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn severity_level(&self) -> i32 {
        self.severity_level
    }

    pub fn native_error_code(&self) -> Option<i32> {
        self.native_error_code
    }

    /**
     * Converts into a flattened exception with the given stack trace.
     *
     * Runtime errors become `ErrorException` with a message of the form
     * `"{severity}: {message} in {file} line {line}"`. Panics keep their
     * message as is.
     */
    pub fn into_captured(self, trace: Vec<StackFrame>) -> CapturedException {
        let (class_name, message) = match self.kind {
            ErrorKind::Exception => (PANIC_CLASS, self.message),
            _ => (
                ERROR_EXCEPTION_CLASS,
                format!(
                    "{}: {} in {} line {}",
                    severity_label(self.severity_level),
                    self.message,
                    self.file,
                    self.line
                ),
            ),
        };

        CapturedException::new(class_name, message)
            .at(self.file, self.line)
            .with_code(self.native_error_code.map(i64::from).unwrap_or(0))
            .with_trace(trace)
    }
}
