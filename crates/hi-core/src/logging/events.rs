//! Stable event names and correlation context for structured logs.

use serde::{Deserialize, Serialize};

/// Pipeline stages a log event can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup, configuration and model loading.
    Init,
    /// Projection and chain scoring.
    Recognize,
    /// Offline replay of recorded frames.
    Replay,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Recognize => "recognize",
            Stage::Replay => "replay",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config/model
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const MODEL_LOADED: &str = "model.loaded";

    // Session
    pub const SESSION_STARTED: &str = "session.started";
    pub const SESSION_RESET: &str = "session.reset";
    pub const TRACKING_LOST: &str = "session.tracking_lost";
    pub const FRAME_REJECTED: &str = "frame.rejected";

    // Detection
    pub const GESTURE_STARTED: &str = "gesture.started";
    pub const GESTURE_ENDED: &str = "gesture.ended";
}

/// Correlation IDs attached to every log line of a run.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub session_id: Option<String>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            session_id: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Span carrying the correlation IDs; enter it for the lifetime of the run.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "run",
            run_id = %self.run_id,
            session_id = self.session_id.as_deref().unwrap_or("")
        )
    }
}
