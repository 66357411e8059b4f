//! Gesture event detection.
//!
//! Turns the frame-level classification stream into start/continue/end
//! events and writes them into caller-owned key/value records.

pub mod detector;
pub mod sink;

pub use detector::{
    ContinuePolicy, Detection, DetectorConfig, EventDetector, EventKind, GestureEvent,
};
pub use sink::{keys, ResultSink};
