//! handinput trained-model format.
//!
//! This crate provides:
//! - Typed Rust structs for the JSON model file (projection + HMM chains)
//! - Loading with SHA-256 provenance
//! - Dimensional and semantic validation
//! - Compiled emission densities shared by the recognizer

pub mod emission;
pub mod load;
pub mod model;
pub mod validate;

pub use emission::{Emission, EmissionDensity};
pub use load::{load_model, ModelSummary, Provenance, TrainedModel};
pub use model::{ChainParams, GestureParams, ModelFile, ProjectionParams};
pub use validate::{ModelError, ModelResult};

/// Schema version for model files.
pub const MODEL_SCHEMA_VERSION: &str = "1.0.0";

/// Gesture name reserved for the "no gesture" outcome.
pub const NONE_LABEL: &str = "none";
