//! Model file types.
//!
//! These types mirror the on-disk JSON layout one to one. They carry no
//! guarantees until [`crate::validate::validate_model`] has accepted them.

use serde::{Deserialize, Serialize};

use crate::emission::Emission;

/// Complete trained model as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Length of the raw descriptor produced by the feature extractor.
    pub descriptor_len: usize,

    /// Number of principal components kept by the projection.
    pub n_principal_comps: usize,

    /// Hand-position coordinates prepended to the reduced descriptor (0 or 3).
    #[serde(default)]
    pub position_dims: usize,

    pub n_states_per_gesture: usize,

    pub n_vocabularies: usize,

    pub projection: ProjectionParams,

    /// Background chain competing against every gesture.
    pub rest: ChainParams,

    pub gestures: Vec<GestureParams>,
}

impl ModelFile {
    /// Length of the observation vector every emission density scores.
    pub fn feature_len(&self) -> usize {
        self.position_dims + self.n_principal_comps
    }
}

/// PCA projection and standardization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionParams {
    /// Mean subtracted from the raw descriptor, length `descriptor_len`.
    pub pca_mean: Vec<f64>,

    /// One row per principal component, each of length `descriptor_len`.
    pub principal_comp: Vec<Vec<f64>>,

    /// Standardization mean per component.
    pub std_mu: Vec<f64>,

    /// Standardization standard deviation per component.
    pub std_sigma: Vec<f64>,
}

/// One vocabulary entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureParams {
    pub name: String,

    /// Optional phase label per hidden state.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stage_names: Vec<String>,

    #[serde(flatten)]
    pub chain: ChainParams,
}

/// Hidden-state chain parameters, in probability space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainParams {
    /// Initial state distribution.
    pub initial: Vec<f64>,

    /// Row-stochastic transition matrix, `transition[i][j] = P(j | i)`.
    pub transition: Vec<Vec<f64>>,

    /// One emission density per state.
    pub emissions: Vec<Emission>,

    /// Per-frame probability of re-entering the chain from `initial`.
    #[serde(default)]
    pub restart_prob: f64,
}

impl ChainParams {
    /// Number of hidden states.
    pub fn n_states(&self) -> usize {
        self.initial.len()
    }
}
