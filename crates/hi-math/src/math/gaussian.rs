//! Diagonal-covariance Gaussian densities evaluated in log space.
//!
//! Parameters are validated once at construction so that the per-frame
//! evaluation is a branch-free loop over precomputed inverse variances.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::stable::{log_add_exp, LN_2PI};

/// Smallest variance accepted for any dimension.
///
/// Below this the inverse variance and the normalizer are large enough that a
/// single frame can push a log-density past the range where sums of per-frame
/// scores stay meaningful.
pub const MIN_VARIANCE: f64 = 1e-10;

/// Tolerance used when checking that mixture weights sum to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Serializable parameters of one diagonal Gaussian.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianParams {
    /// Per-dimension mean.
    pub mean: Vec<f64>,
    /// Per-dimension variance (diagonal of the covariance).
    pub var: Vec<f64>,
}

/// Serializable component of a Gaussian mixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureComponent {
    pub weight: f64,
    #[serde(flatten)]
    pub gaussian: GaussianParams,
}

/// Reasons a density cannot be built from its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum DensityError {
    /// Mean and variance vectors disagree in length, or are empty.
    Shape { mean: usize, var: usize },
    /// A mean entry is NaN or infinite.
    NonFiniteMean { dim: usize },
    /// A variance entry is non-finite or below [`MIN_VARIANCE`].
    DegenerateVariance { dim: usize, value: f64 },
    /// A mixture has no components.
    EmptyMixture,
    /// A mixture weight is non-positive or non-finite.
    InvalidWeight { component: usize, value: f64 },
    /// Mixture weights do not sum to one.
    WeightSum(f64),
    /// Mixture components disagree on dimensionality.
    MixedDimensions { expected: usize, got: usize },
}

impl fmt::Display for DensityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DensityError::Shape { mean, var } => {
                write!(f, "mean has {} entries but var has {}", mean, var)
            }
            DensityError::NonFiniteMean { dim } => write!(f, "mean[{}] is not finite", dim),
            DensityError::DegenerateVariance { dim, value } => write!(
                f,
                "var[{}] = {} is below the minimum {} or not finite",
                dim, value, MIN_VARIANCE
            ),
            DensityError::EmptyMixture => write!(f, "mixture has no components"),
            DensityError::InvalidWeight { component, value } => {
                write!(f, "weight of component {} is {}", component, value)
            }
            DensityError::WeightSum(sum) => {
                write!(f, "mixture weights sum to {}, expected 1.0", sum)
            }
            DensityError::MixedDimensions { expected, got } => write!(
                f,
                "component has {} dimensions, expected {}",
                got, expected
            ),
        }
    }
}

impl std::error::Error for DensityError {}

/// A diagonal Gaussian ready for log-density evaluation.
#[derive(Debug, Clone)]
pub struct DiagonalGaussian {
    mean: Vec<f64>,
    inv_var: Vec<f64>,
    /// -0.5 * (d * ln(2*pi) + sum(ln var)).
    log_norm: f64,
}

impl DiagonalGaussian {
    /// Build from serialized parameters, rejecting degenerate variances.
    pub fn new(params: &GaussianParams) -> Result<Self, DensityError> {
        let dims = params.mean.len();
        if dims == 0 || dims != params.var.len() {
            return Err(DensityError::Shape {
                mean: dims,
                var: params.var.len(),
            });
        }
        if let Some(dim) = params.mean.iter().position(|m| !m.is_finite()) {
            return Err(DensityError::NonFiniteMean { dim });
        }

        let mut log_det = 0.0;
        let mut inv_var = Vec::with_capacity(dims);
        for (dim, &v) in params.var.iter().enumerate() {
            if !v.is_finite() || v < MIN_VARIANCE {
                return Err(DensityError::DegenerateVariance { dim, value: v });
            }
            log_det += v.ln();
            inv_var.push(1.0 / v);
        }

        Ok(Self {
            mean: params.mean.clone(),
            inv_var,
            log_norm: -0.5 * (dims as f64 * LN_2PI + log_det),
        })
    }

    /// Number of dimensions.
    pub fn dims(&self) -> usize {
        self.mean.len()
    }

    /// Log-density at `x`. `x` must have [`Self::dims`] entries.
    pub fn log_density(&self, x: &[f64]) -> f64 {
        debug_assert_eq!(x.len(), self.mean.len());
        let mahalanobis: f64 = x
            .iter()
            .zip(&self.mean)
            .zip(&self.inv_var)
            .map(|((xi, mi), iv)| {
                let d = xi - mi;
                d * d * iv
            })
            .sum();
        self.log_norm - 0.5 * mahalanobis
    }
}

/// A weighted mixture of diagonal Gaussians.
#[derive(Debug, Clone)]
pub struct GaussianMixture {
    log_weights: Vec<f64>,
    components: Vec<DiagonalGaussian>,
}

impl GaussianMixture {
    /// Build from serialized components. Weights must be positive and sum to one.
    pub fn new(components: &[MixtureComponent]) -> Result<Self, DensityError> {
        if components.is_empty() {
            return Err(DensityError::EmptyMixture);
        }

        let mut sum = 0.0;
        let mut log_weights = Vec::with_capacity(components.len());
        let mut built = Vec::with_capacity(components.len());
        for (i, c) in components.iter().enumerate() {
            if !c.weight.is_finite() || c.weight <= 0.0 {
                return Err(DensityError::InvalidWeight {
                    component: i,
                    value: c.weight,
                });
            }
            let g = DiagonalGaussian::new(&c.gaussian)?;
            if let Some(first) = built.first().map(DiagonalGaussian::dims) {
                if g.dims() != first {
                    return Err(DensityError::MixedDimensions {
                        expected: first,
                        got: g.dims(),
                    });
                }
            }
            sum += c.weight;
            log_weights.push(c.weight.ln());
            built.push(g);
        }
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(DensityError::WeightSum(sum));
        }

        Ok(Self {
            log_weights,
            components: built,
        })
    }

    /// Number of dimensions shared by all components.
    pub fn dims(&self) -> usize {
        self.components[0].dims()
    }

    /// Number of mixture components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Always false; construction rejects empty mixtures.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Log-density at `x`, accumulated with `log_add_exp` so no scratch
    /// buffer is needed.
    pub fn log_density(&self, x: &[f64]) -> f64 {
        self.log_weights
            .iter()
            .zip(&self.components)
            .fold(f64::NEG_INFINITY, |acc, (lw, g)| {
                log_add_exp(acc, lw + g.log_density(x))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mean: &[f64], var: &[f64]) -> GaussianParams {
        GaussianParams {
            mean: mean.to_vec(),
            var: var.to_vec(),
        }
    }

    #[test]
    fn standard_normal_at_zero() {
        let g = DiagonalGaussian::new(&params(&[0.0], &[1.0])).unwrap();
        let expected = -0.5 * LN_2PI;
        assert!((g.log_density(&[0.0]) - expected).abs() < 1e-12);
    }

    #[test]
    fn diagonal_density_factorizes() {
        let a = DiagonalGaussian::new(&params(&[1.0], &[0.5])).unwrap();
        let b = DiagonalGaussian::new(&params(&[-2.0], &[3.0])).unwrap();
        let ab = DiagonalGaussian::new(&params(&[1.0, -2.0], &[0.5, 3.0])).unwrap();
        let x = [0.3, 0.7];
        let joint = ab.log_density(&x);
        let split = a.log_density(&x[..1]) + b.log_density(&x[1..]);
        assert!((joint - split).abs() < 1e-12);
    }

    #[test]
    fn rejects_degenerate_variance() {
        let err = DiagonalGaussian::new(&params(&[0.0, 0.0], &[1.0, 0.0])).unwrap_err();
        assert_eq!(err, DensityError::DegenerateVariance { dim: 1, value: 0.0 });

        let err = DiagonalGaussian::new(&params(&[0.0], &[f64::NAN])).unwrap_err();
        assert!(matches!(err, DensityError::DegenerateVariance { dim: 0, .. }));
    }

    #[test]
    fn rejects_shape_mismatch() {
        let err = DiagonalGaussian::new(&params(&[0.0, 1.0], &[1.0])).unwrap_err();
        assert_eq!(err, DensityError::Shape { mean: 2, var: 1 });
        assert!(DiagonalGaussian::new(&params(&[], &[])).is_err());
    }

    #[test]
    fn single_component_mixture_matches_gaussian() {
        let p = params(&[0.5, -0.5], &[2.0, 0.25]);
        let g = DiagonalGaussian::new(&p).unwrap();
        let m = GaussianMixture::new(&[MixtureComponent {
            weight: 1.0,
            gaussian: p,
        }])
        .unwrap();
        let x = [0.1, 0.2];
        assert!((g.log_density(&x) - m.log_density(&x)).abs() < 1e-12);
        assert_eq!(m.len(), 1);
        assert_eq!(m.dims(), 2);
    }

    #[test]
    fn mixture_of_identical_components_equals_component() {
        let p = params(&[0.0], &[1.0]);
        let m = GaussianMixture::new(&[
            MixtureComponent {
                weight: 0.3,
                gaussian: p.clone(),
            },
            MixtureComponent {
                weight: 0.7,
                gaussian: p.clone(),
            },
        ])
        .unwrap();
        let g = DiagonalGaussian::new(&p).unwrap();
        assert!((m.log_density(&[1.3]) - g.log_density(&[1.3])).abs() < 1e-12);
    }

    #[test]
    fn mixture_rejects_bad_weights() {
        let p = params(&[0.0], &[1.0]);
        let err = GaussianMixture::new(&[
            MixtureComponent {
                weight: 0.3,
                gaussian: p.clone(),
            },
            MixtureComponent {
                weight: 0.3,
                gaussian: p.clone(),
            },
        ])
        .unwrap_err();
        assert!(matches!(err, DensityError::WeightSum(_)));

        let err = GaussianMixture::new(&[MixtureComponent {
            weight: -1.0,
            gaussian: p,
        }])
        .unwrap_err();
        assert!(matches!(err, DensityError::InvalidWeight { component: 0, .. }));

        assert_eq!(GaussianMixture::new(&[]).unwrap_err(), DensityError::EmptyMixture);
    }

    #[test]
    fn mixture_rejects_mixed_dimensions() {
        let err = GaussianMixture::new(&[
            MixtureComponent {
                weight: 0.5,
                gaussian: params(&[0.0], &[1.0]),
            },
            MixtureComponent {
                weight: 0.5,
                gaussian: params(&[0.0, 0.0], &[1.0, 1.0]),
            },
        ])
        .unwrap_err();
        assert_eq!(err, DensityError::MixedDimensions { expected: 1, got: 2 });
    }
}
