//! Per-state emission distributions.
//!
//! The distribution family is part of the model file, tagged by `family`:
//!
//! ```json
//! { "family": "gaussian", "mean": [0.0, 1.0], "var": [1.0, 0.5] }
//! { "family": "gaussian_mixture", "components": [
//!     { "weight": 0.6, "mean": [0.0], "var": [1.0] },
//!     { "weight": 0.4, "mean": [2.0], "var": [0.5] } ] }
//! ```

use hi_math::{DensityError, DiagonalGaussian, GaussianMixture, GaussianParams, MixtureComponent};
use serde::{Deserialize, Serialize};

/// Serialized emission parameters for one hidden state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Emission {
    /// Single diagonal-covariance Gaussian.
    Gaussian(GaussianParams),
    /// Weighted mixture of diagonal-covariance Gaussians.
    GaussianMixture { components: Vec<MixtureComponent> },
}

impl Emission {
    /// Dimensionality declared by the parameters, without validating them.
    pub fn declared_dims(&self) -> Option<usize> {
        match self {
            Emission::Gaussian(p) => Some(p.mean.len()),
            Emission::GaussianMixture { components } => {
                components.first().map(|c| c.gaussian.mean.len())
            }
        }
    }

    /// Family name as written in the model file.
    pub fn family(&self) -> &'static str {
        match self {
            Emission::Gaussian(_) => "gaussian",
            Emission::GaussianMixture { .. } => "gaussian_mixture",
        }
    }

    /// Compile into a density that can be evaluated per frame.
    pub fn compile(&self) -> Result<EmissionDensity, DensityError> {
        match self {
            Emission::Gaussian(p) => DiagonalGaussian::new(p).map(EmissionDensity::Gaussian),
            Emission::GaussianMixture { components } => {
                GaussianMixture::new(components).map(EmissionDensity::Mixture)
            }
        }
    }
}

/// Compiled emission density.
#[derive(Debug, Clone)]
pub enum EmissionDensity {
    Gaussian(DiagonalGaussian),
    Mixture(GaussianMixture),
}

impl EmissionDensity {
    pub fn dims(&self) -> usize {
        match self {
            EmissionDensity::Gaussian(g) => g.dims(),
            EmissionDensity::Mixture(m) => m.dims(),
        }
    }

    /// log p(x | state).
    #[inline]
    pub fn log_density(&self, x: &[f64]) -> f64 {
        match self {
            EmissionDensity::Gaussian(g) => g.log_density(x),
            EmissionDensity::Mixture(m) => m.log_density(x),
        }
    }
}
