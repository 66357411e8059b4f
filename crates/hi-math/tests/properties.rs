//! Property-based tests for hi-math numerical functions.

use hi_math::{
    log_add_exp, log_sum_exp, logistic, DiagonalGaussian, GaussianMixture, GaussianParams,
    MixtureComponent,
};
use proptest::prelude::*;

const TOL: f64 = 1e-10;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_infinite() && b.is_infinite() {
        return a.signum() == b.signum();
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn log_sum_exp_commutative(a in -100.0..100.0f64, b in -100.0..100.0f64) {
        prop_assert!(approx_eq(log_sum_exp(&[a, b]), log_sum_exp(&[b, a]), TOL));
    }

    #[test]
    fn log_sum_exp_bounds(a in -700.0..700.0f64, b in -700.0..700.0f64) {
        let out = log_sum_exp(&[a, b]);
        prop_assert!(out.is_finite());
        prop_assert!(out >= a.max(b) - TOL);
        prop_assert!(out <= a.max(b) + 2.0f64.ln() + TOL);
    }

    #[test]
    fn log_add_exp_matches_log_sum_exp(a in -100.0..100.0f64, b in -100.0..100.0f64) {
        prop_assert!(approx_eq(log_add_exp(a, b), log_sum_exp(&[a, b]), TOL));
    }

    #[test]
    fn logistic_in_unit_interval(x in -1000.0..1000.0f64) {
        let p = logistic(x);
        prop_assert!((0.0..=1.0).contains(&p));
        prop_assert!(approx_eq(p + logistic(-x), 1.0, 1e-12));
    }

    /// The density peaks at the mean.
    #[test]
    fn gaussian_peaks_at_mean(
        mean in prop::collection::vec(-10.0..10.0f64, 1..6),
        offset in 0.01..5.0f64,
        var in 0.01..10.0f64,
    ) {
        let dims = mean.len();
        let g = DiagonalGaussian::new(&GaussianParams { mean: mean.clone(), var: vec![var; dims] }).unwrap();
        let shifted: Vec<f64> = mean.iter().map(|m| m + offset).collect();
        prop_assert!(g.log_density(&mean) > g.log_density(&shifted));
        prop_assert!(g.log_density(&shifted).is_finite());
    }

    /// A mixture never exceeds its best weighted component by more than ln(1).
    #[test]
    fn mixture_bounded_by_components(
        x in -5.0..5.0f64,
        w in 0.05..0.95f64,
        m1 in -3.0..3.0f64,
        m2 in -3.0..3.0f64,
    ) {
        let p1 = GaussianParams { mean: vec![m1], var: vec![1.0] };
        let p2 = GaussianParams { mean: vec![m2], var: vec![0.5] };
        let mix = GaussianMixture::new(&[
            MixtureComponent { weight: w, gaussian: p1.clone() },
            MixtureComponent { weight: 1.0 - w, gaussian: p2.clone() },
        ]).unwrap();
        let l1 = DiagonalGaussian::new(&p1).unwrap().log_density(&[x]);
        let l2 = DiagonalGaussian::new(&p2).unwrap().log_density(&[x]);
        let lm = mix.log_density(&[x]);
        prop_assert!(lm <= l1.max(l2) + TOL);
        prop_assert!(lm >= l1.min(l2) - TOL);
    }
}
