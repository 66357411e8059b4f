//! PCA projection and z-score standardization of raw descriptors.
//!
//! `reduced[k] = (dot(principal_comp[k], raw - pca_mean) - std_mu[k]) / std_sigma[k]`

use std::ops::Deref;
use std::sync::Arc;

use hi_model::TrainedModel;

use crate::error::{Error, Result};

/// A descriptor after projection and standardization.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedFeature(Vec<f64>);

impl ReducedFeature {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for ReducedFeature {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

/// Deterministic linear map from raw descriptor space to the reduced space.
#[derive(Debug, Clone)]
pub struct Projector {
    model: Arc<TrainedModel>,
}

impl Projector {
    pub fn new(model: Arc<TrainedModel>) -> Self {
        Self { model }
    }

    /// Expected raw descriptor length.
    pub fn input_len(&self) -> usize {
        self.model.descriptor_len()
    }

    /// Reduced feature length.
    pub fn output_len(&self) -> usize {
        self.model.n_principal_comps()
    }

    /// Project one raw descriptor into a freshly allocated feature.
    pub fn apply(&self, raw: &[f64]) -> Result<ReducedFeature> {
        let mut out = vec![0.0; self.output_len()];
        self.apply_into(raw, &mut out)?;
        Ok(ReducedFeature(out))
    }

    /// Project into a caller-owned buffer of length [`Self::output_len`].
    ///
    /// The input is fully checked before `out` is written, so on error `out`
    /// keeps its previous contents.
    pub fn apply_into(&self, raw: &[f64], out: &mut [f64]) -> Result<()> {
        check_input("raw descriptor", raw, self.input_len())?;
        if out.len() != self.output_len() {
            return Err(Error::DimensionMismatch {
                what: "projection output buffer",
                expected: self.output_len(),
                got: out.len(),
            });
        }

        let p = self.model.projection();
        for (k, slot) in out.iter_mut().enumerate() {
            let dot: f64 = p.principal_comp[k]
                .iter()
                .zip(raw.iter().zip(&p.pca_mean))
                .map(|(w, (x, m))| w * (x - m))
                .sum();
            *slot = (dot - p.std_mu[k]) / p.std_sigma[k];
        }
        Ok(())
    }
}

/// Length and finiteness check shared by every per-frame input.
pub(crate) fn check_input(what: &'static str, values: &[f64], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(Error::DimensionMismatch {
            what,
            expected,
            got: values.len(),
        });
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(Error::NonFiniteFeature { what, index });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{model_json, ModelSpec};

    fn projector(json: &str) -> Projector {
        Projector::new(Arc::new(TrainedModel::from_json_str(json).unwrap()))
    }

    #[test]
    fn identity_projection_passes_leading_coords() {
        let p = projector(&model_json(&ModelSpec::default()));
        let out = p.apply(&[1.5, -2.0, 9.0, 9.0]).unwrap();
        assert_eq!(out.len(), p.output_len());
        assert_eq!(out.as_slice(), &[1.5, -2.0]);
    }

    #[test]
    fn centers_rotates_and_standardizes() {
        let json = r#"{
            "schema_version": "1.0.0",
            "descriptor_len": 2,
            "n_principal_comps": 1,
            "n_states_per_gesture": 1,
            "n_vocabularies": 1,
            "projection": {
                "pca_mean": [1.0, 1.0],
                "principal_comp": [[0.6, 0.8]],
                "std_mu": [0.5],
                "std_sigma": [2.0]
            },
            "rest": {
                "initial": [1.0],
                "transition": [[1.0]],
                "emissions": [{"family": "gaussian", "mean": [0.0], "var": [1.0]}]
            },
            "gestures": [{
                "name": "tap",
                "initial": [1.0],
                "transition": [[1.0]],
                "emissions": [{"family": "gaussian", "mean": [1.0], "var": [1.0]}]
            }]
        }"#;
        let p = projector(json);
        // centered = [2, 3]; dot = 1.2 + 2.4 = 3.6; (3.6 - 0.5) / 2 = 1.55
        let out = p.apply(&[3.0, 4.0]).unwrap();
        assert!((out[0] - 1.55).abs() < 1e-12);
    }

    #[test]
    fn applying_twice_is_identical() {
        let p = projector(&model_json(&ModelSpec::default()));
        let raw = [0.25, 0.5, -1.0, 3.0];
        assert_eq!(p.apply(&raw).unwrap(), p.apply(&raw).unwrap());
    }

    #[test]
    fn wrong_length_is_dimension_mismatch() {
        let p = projector(&model_json(&ModelSpec::default()));
        let err = p.apply(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 4,
                got: 3,
                ..
            }
        ));
    }

    #[test]
    fn non_finite_input_is_rejected_without_writing() {
        let p = projector(&model_json(&ModelSpec::default()));
        let mut out = [7.0, 7.0];
        let err = p.apply_into(&[0.0, f64::NAN, 0.0, 0.0], &mut out).unwrap_err();
        assert!(matches!(err, Error::NonFiniteFeature { index: 1, .. }));
        assert_eq!(out, [7.0, 7.0]);
    }

    #[test]
    fn output_buffer_length_is_checked() {
        let p = projector(&model_json(&ModelSpec::default()));
        let mut out = [0.0; 3];
        assert!(matches!(
            p.apply_into(&[0.0; 4], &mut out),
            Err(Error::DimensionMismatch {
                what: "projection output buffer",
                ..
            })
        ));
    }
}
