//! Loading trained models from disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::{ChainParams, GestureParams, ModelFile, ProjectionParams};
use crate::validate::{validate_model, ModelError, ModelResult};

/// Where a model came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Path the model was read from (None for in-memory models).
    pub path: Option<PathBuf>,
    /// SHA-256 of the raw model bytes, hex encoded.
    pub sha256: String,
}

/// A validated, immutable trained model.
///
/// Construction always runs [`validate_model`], so every accessor can rely on
/// the dimensional invariants holding. Share it between sessions with `Arc`.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    file: ModelFile,
    provenance: Provenance,
}

impl TrainedModel {
    /// Validate a parsed model file.
    pub fn new(file: ModelFile, provenance: Provenance) -> ModelResult<Self> {
        validate_model(&file)?;
        Ok(Self { file, provenance })
    }

    /// Parse and validate a model from JSON text.
    pub fn from_json_str(json: &str) -> ModelResult<Self> {
        Self::from_bytes(json.as_bytes(), None)
    }

    fn from_bytes(bytes: &[u8], path: Option<PathBuf>) -> ModelResult<Self> {
        let origin = path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<memory>".to_string());
        let file: ModelFile =
            serde_json::from_slice(bytes).map_err(|source| ModelError::Parse { origin, source })?;
        let provenance = Provenance {
            path,
            sha256: hex::encode(Sha256::digest(bytes)),
        };
        Self::new(file, provenance)
    }

    pub fn descriptor_len(&self) -> usize {
        self.file.descriptor_len
    }

    pub fn n_principal_comps(&self) -> usize {
        self.file.n_principal_comps
    }

    pub fn position_dims(&self) -> usize {
        self.file.position_dims
    }

    /// Observation length seen by the emission densities.
    pub fn feature_len(&self) -> usize {
        self.file.feature_len()
    }

    pub fn n_states_per_gesture(&self) -> usize {
        self.file.n_states_per_gesture
    }

    pub fn n_vocabularies(&self) -> usize {
        self.file.n_vocabularies
    }

    pub fn projection(&self) -> &ProjectionParams {
        &self.file.projection
    }

    pub fn rest(&self) -> &ChainParams {
        &self.file.rest
    }

    pub fn gestures(&self) -> &[GestureParams] {
        &self.file.gestures
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn description(&self) -> Option<&str> {
        self.file.description.as_deref()
    }

    /// Short machine-readable summary for diagnostics.
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            schema_version: self.file.schema_version.clone(),
            description: self.file.description.clone(),
            descriptor_len: self.descriptor_len(),
            n_principal_comps: self.n_principal_comps(),
            position_dims: self.position_dims(),
            feature_len: self.feature_len(),
            n_states_per_gesture: self.n_states_per_gesture(),
            rest_states: self.file.rest.n_states(),
            gestures: self.file.gestures.iter().map(|g| g.name.clone()).collect(),
            emission_families: self
                .file
                .gestures
                .iter()
                .flat_map(|g| g.chain.emissions.iter())
                .chain(self.file.rest.emissions.iter())
                .map(|e| e.family().to_string())
                .fold(Vec::new(), |mut acc, f| {
                    if !acc.contains(&f) {
                        acc.push(f);
                    }
                    acc
                }),
            provenance: self.provenance.clone(),
        }
    }
}

/// Summary of a loaded model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub descriptor_len: usize,
    pub n_principal_comps: usize,
    pub position_dims: usize,
    pub feature_len: usize,
    pub n_states_per_gesture: usize,
    pub rest_states: usize,
    pub gestures: Vec<String>,
    pub emission_families: Vec<String>,
    pub provenance: Provenance,
}

/// Read, parse and validate a model file.
pub fn load_model(path: &Path) -> ModelResult<TrainedModel> {
    let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let model = TrainedModel::from_bytes(&bytes, Some(path.to_path_buf()))?;
    tracing::info!(
        target: "hi_model::load",
        path = %path.display(),
        sha256 = %model.provenance.sha256,
        gestures = model.n_vocabularies(),
        states = model.n_states_per_gesture(),
        "model loaded"
    );
    Ok(model)
}
