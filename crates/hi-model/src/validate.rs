//! Model errors and dimensional/semantic validation.

use std::collections::HashSet;
use std::path::PathBuf;

use hi_math::DensityError;
use thiserror::Error;

use crate::model::{ChainParams, ModelFile, ProjectionParams};
use crate::{MODEL_SCHEMA_VERSION, NONE_LABEL};

/// Validation result type.
pub type ModelResult<T> = Result<T, ModelError>;

/// Tolerance for probability vectors summing to one.
pub const PROB_SUM_TOLERANCE: f64 = 1e-6;

/// Largest backward transition probability still treated as zero.
pub const BACKWARD_TOLERANCE: f64 = 1e-9;

/// Smallest standardization deviation accepted.
pub const MIN_STD_SIGMA: f64 = 1e-10;

/// Errors raised while loading or validating a trained model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in model {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Model schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("Inconsistent dimensions for {field}: {message}")]
    Dimension { field: String, message: String },

    #[error("Invalid model parameter {field}: {message}")]
    InvalidParameter { field: String, message: String },
}

impl ModelError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ModelError::Io { .. } => 40,
            ModelError::Parse { .. } => 41,
            ModelError::VersionMismatch { .. } => 42,
            ModelError::Dimension { .. } => 43,
            ModelError::InvalidParameter { .. } => 44,
        }
    }

    /// True for degenerate numeric parameters, as opposed to I/O, format or
    /// shape problems.
    pub fn is_parameter_error(&self) -> bool {
        matches!(self, ModelError::InvalidParameter { .. })
    }

    fn dimension(field: impl Into<String>, message: impl Into<String>) -> Self {
        ModelError::Dimension {
            field: field.into(),
            message: message.into(),
        }
    }

    fn parameter(field: impl Into<String>, message: impl Into<String>) -> Self {
        ModelError::InvalidParameter {
            field: field.into(),
            message: message.into(),
        }
    }

    fn from_density(field: String, err: DensityError) -> Self {
        match err {
            DensityError::Shape { .. } | DensityError::MixedDimensions { .. } => {
                ModelError::dimension(field, err.to_string())
            }
            _ => ModelError::parameter(field, err.to_string()),
        }
    }
}

/// Validate a parsed model file. Shape problems are reported before numeric ones.
pub fn validate_model(model: &ModelFile) -> ModelResult<()> {
    if model.schema_version != MODEL_SCHEMA_VERSION {
        return Err(ModelError::VersionMismatch {
            expected: MODEL_SCHEMA_VERSION.to_string(),
            actual: model.schema_version.clone(),
        });
    }

    for (field, value) in [
        ("descriptor_len", model.descriptor_len),
        ("n_principal_comps", model.n_principal_comps),
        ("n_states_per_gesture", model.n_states_per_gesture),
        ("n_vocabularies", model.n_vocabularies),
    ] {
        if value == 0 {
            return Err(ModelError::dimension(field, "must be positive"));
        }
    }
    if model.position_dims != 0 && model.position_dims != 3 {
        return Err(ModelError::dimension(
            "position_dims",
            format!("must be 0 or 3, got {}", model.position_dims),
        ));
    }
    if model.n_principal_comps > model.descriptor_len {
        return Err(ModelError::dimension(
            "n_principal_comps",
            format!(
                "{} components exceed descriptor length {}",
                model.n_principal_comps, model.descriptor_len
            ),
        ));
    }

    validate_projection(model, &model.projection)?;

    if model.gestures.len() != model.n_vocabularies {
        return Err(ModelError::dimension(
            "gestures",
            format!(
                "expected {} gestures, got {}",
                model.n_vocabularies,
                model.gestures.len()
            ),
        ));
    }

    let feature_len = model.feature_len();
    if model.rest.n_states() == 0 {
        return Err(ModelError::dimension("rest.initial", "rest chain has no states"));
    }
    validate_chain("rest", &model.rest, model.rest.n_states(), feature_len, false)?;

    let mut seen = HashSet::new();
    for (g, gesture) in model.gestures.iter().enumerate() {
        let prefix = format!("gestures[{}]", g);
        let name = gesture.name.trim();
        if name.is_empty() {
            return Err(ModelError::parameter(
                format!("{}.name", prefix),
                "gesture name is empty",
            ));
        }
        if name.eq_ignore_ascii_case(NONE_LABEL) {
            return Err(ModelError::parameter(
                format!("{}.name", prefix),
                format!("'{}' is reserved for the no-gesture outcome", NONE_LABEL),
            ));
        }
        if !seen.insert(name.to_string()) {
            return Err(ModelError::parameter(
                format!("{}.name", prefix),
                format!("duplicate gesture name '{}'", name),
            ));
        }
        if !gesture.stage_names.is_empty()
            && gesture.stage_names.len() != model.n_states_per_gesture
        {
            return Err(ModelError::dimension(
                format!("{}.stage_names", prefix),
                format!(
                    "expected {} names, got {}",
                    model.n_states_per_gesture,
                    gesture.stage_names.len()
                ),
            ));
        }
        validate_chain(
            &prefix,
            &gesture.chain,
            model.n_states_per_gesture,
            feature_len,
            true,
        )?;
    }

    Ok(())
}

fn validate_projection(model: &ModelFile, p: &ProjectionParams) -> ModelResult<()> {
    let d = model.descriptor_len;
    let k = model.n_principal_comps;

    check_len("projection.pca_mean", p.pca_mean.len(), d)?;
    check_len("projection.principal_comp", p.principal_comp.len(), k)?;
    for (r, row) in p.principal_comp.iter().enumerate() {
        check_len(&format!("projection.principal_comp[{}]", r), row.len(), d)?;
    }
    check_len("projection.std_mu", p.std_mu.len(), k)?;
    check_len("projection.std_sigma", p.std_sigma.len(), k)?;

    check_finite("projection.pca_mean", &p.pca_mean)?;
    for (r, row) in p.principal_comp.iter().enumerate() {
        check_finite(&format!("projection.principal_comp[{}]", r), row)?;
    }
    check_finite("projection.std_mu", &p.std_mu)?;
    for (i, &s) in p.std_sigma.iter().enumerate() {
        if !s.is_finite() || s < MIN_STD_SIGMA {
            return Err(ModelError::parameter(
                format!("projection.std_sigma[{}]", i),
                format!("must be finite and at least {}, got {}", MIN_STD_SIGMA, s),
            ));
        }
    }
    Ok(())
}

fn validate_chain(
    prefix: &str,
    chain: &ChainParams,
    n_states: usize,
    feature_len: usize,
    left_to_right: bool,
) -> ModelResult<()> {
    check_len(&format!("{}.initial", prefix), chain.initial.len(), n_states)?;
    check_len(&format!("{}.transition", prefix), chain.transition.len(), n_states)?;
    for (i, row) in chain.transition.iter().enumerate() {
        check_len(&format!("{}.transition[{}]", prefix, i), row.len(), n_states)?;
    }
    check_len(&format!("{}.emissions", prefix), chain.emissions.len(), n_states)?;
    for (s, emission) in chain.emissions.iter().enumerate() {
        if let Some(dims) = emission.declared_dims() {
            if dims != feature_len {
                return Err(ModelError::dimension(
                    format!("{}.emissions[{}]", prefix, s),
                    format!("expected {} dimensions, got {}", feature_len, dims),
                ));
            }
        }
    }

    check_distribution(&format!("{}.initial", prefix), &chain.initial)?;
    for (i, row) in chain.transition.iter().enumerate() {
        let field = format!("{}.transition[{}]", prefix, i);
        check_distribution(&field, row)?;
        if left_to_right {
            if let Some(j) = row[..i].iter().position(|&p| p > BACKWARD_TOLERANCE) {
                return Err(ModelError::parameter(
                    field,
                    format!(
                        "backward transition {} -> {} has probability {}",
                        i, j, row[j]
                    ),
                ));
            }
        }
    }

    if !chain.restart_prob.is_finite() || !(0.0..1.0).contains(&chain.restart_prob) {
        return Err(ModelError::parameter(
            format!("{}.restart_prob", prefix),
            format!("must be in [0, 1), got {}", chain.restart_prob),
        ));
    }

    for (s, emission) in chain.emissions.iter().enumerate() {
        let field = format!("{}.emissions[{}]", prefix, s);
        let density = emission
            .compile()
            .map_err(|e| ModelError::from_density(field.clone(), e))?;
        if density.dims() != feature_len {
            return Err(ModelError::dimension(
                field,
                format!("expected {} dimensions, got {}", feature_len, density.dims()),
            ));
        }
    }

    Ok(())
}

fn check_len(field: &str, got: usize, expected: usize) -> ModelResult<()> {
    if got != expected {
        return Err(ModelError::dimension(
            field,
            format!("expected length {}, got {}", expected, got),
        ));
    }
    Ok(())
}

fn check_finite(field: &str, values: &[f64]) -> ModelResult<()> {
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(ModelError::parameter(
            format!("{}[{}]", field, i),
            "must be finite",
        ));
    }
    Ok(())
}

fn check_distribution(field: &str, probs: &[f64]) -> ModelResult<()> {
    if let Some(i) = probs
        .iter()
        .position(|p| !p.is_finite() || *p < 0.0 || *p > 1.0)
    {
        return Err(ModelError::parameter(
            format!("{}[{}]", field, i),
            format!("must be in [0, 1], got {}", probs[i]),
        ));
    }
    let sum: f64 = probs.iter().sum();
    if (sum - 1.0).abs() > PROB_SUM_TOLERANCE {
        return Err(ModelError::parameter(
            field,
            format!("probabilities sum to {}, expected 1.0", sum),
        ));
    }
    Ok(())
}
