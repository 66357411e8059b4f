//! Per-gesture sequence models.
//!
//! Each vocabulary entry and the rest/background model is a hidden-state chain
//! scored incrementally with a log-space Viterbi recursion. All chains share
//! one immutable [`hi_model::TrainedModel`].

pub mod gesture_model;

pub use gesture_model::{GestureModel, GestureModelState, ModelSlot, StepResult};
