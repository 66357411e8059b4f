//! handinput core library
//!
//! This library provides the per-frame gesture recognition pipeline:
//! - PCA projection and standardization of raw descriptors
//! - Left-to-right gesture chains scored incrementally in log space
//! - The recognizer's decision rule against a rest/background chain
//! - Start/continue/end edge detection over the classification stream
//! - Session handling, configuration, logging and exit codes
//!
//! The binary entry point is in `main.rs`.

pub mod config;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod inference;
pub mod logging;
pub mod processor;
pub mod projector;
pub mod recognizer;

pub use error::{Error, Result};
pub use events::{
    ContinuePolicy, Detection, DetectorConfig, EventDetector, EventKind, GestureEvent, ResultSink,
};
pub use inference::{GestureModel, ModelSlot, StepResult};
pub use processor::{GestureProcessor, HandFrame};
pub use projector::{Projector, ReducedFeature};
pub use recognizer::{ClassificationResult, GestureId, Recognizer, RecognizerConfig};

pub use hi_model::{load_model, TrainedModel};

#[cfg(test)]
pub(crate) mod test_utils;
