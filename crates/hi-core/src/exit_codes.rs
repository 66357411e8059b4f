//! Exit codes for the hi-core CLI.
//!
//! Exit code ranges:
//! - 0-1: Success/operational outcomes
//! - 10-19: User/environment errors (bad model, config or input)
//! - 20-29: Internal errors

use crate::error::Error;

/// Exit codes for hi-core commands. Stable contract for scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Success / Operational Outcomes (0-1)
    // ========================================================================
    /// Success, and (for replay) no gesture was detected
    Clean = 0,

    /// Replay detected at least one gesture
    GesturesDetected = 1,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Model missing, unreadable or inconsistent
    ModelError = 11,

    /// Configuration unreadable or out of range
    ConfigError = 12,

    /// A recorded frame is malformed or has the wrong shape
    InputError = 13,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error on stdin/stdout
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Codes 0-1.
    pub fn is_success(self) -> bool {
        (self as i32) < 10
    }

    /// Codes 10-19: resolvable by user action.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Codes 20-29.
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Error code name for JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::GesturesDetected => "OK_GESTURES",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ModelError => "ERR_MODEL",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::DimensionMismatch { .. } | Error::NonFiniteFeature { .. } => {
                ExitCode::InputError
            }
            Error::InvalidModelParameter { .. } | Error::ModelLoad(_) => ExitCode::ModelError,
            Error::Config(_) => ExitCode::ConfigError,
            Error::NotInitialized | Error::NumericalInstability { .. } => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
