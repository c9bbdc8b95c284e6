/**
 * Runtime error severities.
 *
 * Codes follow the bitmask values of the host runtime's error levels, so a
 * raw `(code, message, file, line)` signal can be classified without a
 * translation table on the caller side.
 */
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Parse,
    Notice,
    CoreError,
    CoreWarning,
    CompileError,
    CompileWarning,
    UserError,
    UserWarning,
    UserNotice,
    Strict,
    RecoverableError,
    Deprecated,
    UserDeprecated,
}

/// Fallback label for codes outside the table.
pub const UNKNOWN_SEVERITY: &str = "Unknown error";

impl Severity {
    pub const ALL: [Severity; 15] = [
        Severity::Error,
        Severity::Warning,
        Severity::Parse,
        Severity::Notice,
        Severity::CoreError,
        Severity::CoreWarning,
        Severity::CompileError,
        Severity::CompileWarning,
        Severity::UserError,
        Severity::UserWarning,
        Severity::UserNotice,
        Severity::Strict,
        Severity::RecoverableError,
        Severity::Deprecated,
        Severity::UserDeprecated,
    ];

    /// Severities the synchronous handler treats as warnings.
    pub const WARNING_CLASS: [Severity; 6] = [
        Severity::Notice,
        Severity::UserWarning,
        Severity::UserNotice,
        Severity::Strict,
        Severity::Deprecated,
        Severity::UserDeprecated,
    ];

    /// Fatal severities only observable at shutdown.
    pub const SHUTDOWN_ERRORS: [Severity; 4] = [
        Severity::Error,
        Severity::Parse,
        Severity::CoreError,
        Severity::CompileError,
    ];

    /// Warning severities only observable at shutdown.
    pub const SHUTDOWN_WARNINGS: [Severity; 3] = [
        Severity::CoreWarning,
        Severity::CompileWarning,
        Severity::Strict,
    ];

    pub fn code(self) -> i32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Parse => 4,
            Severity::Notice => 8,
            Severity::CoreError => 16,
            Severity::CoreWarning => 32,
            Severity::CompileError => 64,
            Severity::CompileWarning => 128,
            Severity::UserError => 256,
            Severity::UserWarning => 512,
            Severity::UserNotice => 1024,
            Severity::Strict => 2048,
            Severity::RecoverableError => 4096,
            Severity::Deprecated => 8192,
            Severity::UserDeprecated => 16384,
        }
    }

    pub fn from_code(code: i32) -> Option<Severity> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Warning => "Warning",
            Severity::Notice => "Notice",
            Severity::UserError => "User Error",
            Severity::UserWarning => "User Warning",
            Severity::UserNotice => "User Notice",
            Severity::Strict => "Runtime Notice",
            Severity::RecoverableError => "Catchable Fatal Error",
            Severity::Deprecated => "Deprecated",
            Severity::UserDeprecated => "User Deprecated",
            Severity::Error => "Error",
            Severity::Parse => "Parse Error",
            Severity::CoreError => "Core Error",
            Severity::CoreWarning => "Core Warning",
            Severity::CompileError => "Compile Error",
            Severity::CompileWarning => "Compile Warning",
        }
    }

    pub fn is_warning_class(self) -> bool {
        Self::WARNING_CLASS.contains(&self)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Severity> for i32 {
    fn from(severity: Severity) -> i32 {
        severity.code()
    }
}

/// Display label for a raw severity code, `"Unknown error"` when unmapped.
pub fn severity_label(code: i32) -> &'static str {
    Severity::from_code(code)
        .map(Severity::label)
        .unwrap_or(UNKNOWN_SEVERITY)
}
