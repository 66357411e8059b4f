//! Synthetic models for unit tests.
//!
//! The default `ModelSpec` mirrors `test/fixtures/models/two_gestures.json`: a
//! 4-dimensional descriptor reduced to its first two coordinates, a one-state
//! rest chain at the origin, and two 3-state gestures walking along the x
//! axis (`swipe`) and the y axis (`circle`).

use serde_json::{json, Value};

pub struct GestureSpec {
    pub name: &'static str,
    /// Per-state mean in reduced space.
    pub means: Vec<[f64; 2]>,
}

pub struct ModelSpec {
    pub position_dims: usize,
    pub gestures: Vec<GestureSpec>,
    pub var: f64,
    pub rest_var: f64,
    pub restart_prob: f64,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            position_dims: 0,
            gestures: vec![
                GestureSpec {
                    name: "swipe",
                    means: vec![[2.0, 0.0], [4.0, 0.0], [6.0, 0.0]],
                },
                GestureSpec {
                    name: "circle",
                    means: vec![[0.0, 2.0], [0.0, 4.0], [0.0, 6.0]],
                },
            ],
            var: 0.5,
            rest_var: 0.5,
            restart_prob: 0.01,
        }
    }
}

impl ModelSpec {
    /// Two gestures with identical parameters, so their scores always tie.
    pub fn twins() -> Self {
        let means = vec![[2.0, 0.0], [4.0, 0.0], [6.0, 0.0]];
        Self {
            gestures: vec![
                GestureSpec {
                    name: "left",
                    means: means.clone(),
                },
                GestureSpec {
                    name: "right",
                    means,
                },
            ],
            ..Self::default()
        }
    }
}

fn emission(position_dims: usize, mean: [f64; 2], var: f64) -> Value {
    let mut m = vec![0.0; position_dims];
    m.extend_from_slice(&mean);
    json!({
        "family": "gaussian",
        "mean": m,
        "var": vec![var; position_dims + 2],
    })
}

/// Left-to-right transition matrix: stay 0.6, advance 0.4, last state absorbs.
fn left_to_right(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| {
            let mut row = vec![0.0; n];
            if i + 1 < n {
                row[i] = 0.6;
                row[i + 1] = 0.4;
            } else {
                row[i] = 1.0;
            }
            row
        })
        .collect()
}

pub fn model_json(spec: &ModelSpec) -> String {
    let n_states = spec.gestures.first().map(|g| g.means.len()).unwrap_or(1);
    let gestures: Vec<Value> = spec
        .gestures
        .iter()
        .map(|g| {
            let mut initial = vec![0.0; g.means.len()];
            initial[0] = 1.0;
            let mut entry = json!({
                "name": g.name,
                "initial": initial,
                "transition": left_to_right(g.means.len()),
                "emissions": g
                    .means
                    .iter()
                    .map(|m| emission(spec.position_dims, *m, spec.var))
                    .collect::<Vec<_>>(),
                "restart_prob": spec.restart_prob,
            });
            if g.means.len() == 3 {
                entry["stage_names"] = json!(["pre_stroke", "nucleus", "post_stroke"]);
            }
            entry
        })
        .collect();

    json!({
        "schema_version": hi_model::MODEL_SCHEMA_VERSION,
        "descriptor_len": 4,
        "n_principal_comps": 2,
        "position_dims": spec.position_dims,
        "n_states_per_gesture": n_states,
        "n_vocabularies": spec.gestures.len(),
        "projection": {
            "pca_mean": [0.0, 0.0, 0.0, 0.0],
            "principal_comp": [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]],
            "std_mu": [0.0, 0.0],
            "std_sigma": [1.0, 1.0]
        },
        "rest": {
            "initial": [1.0],
            "transition": [[1.0]],
            "emissions": [emission(spec.position_dims, [0.0, 0.0], spec.rest_var)]
        },
        "gestures": gestures,
    })
    .to_string()
}

/// Raw 4-dimensional descriptor whose reduced image is `[x, y]`.
pub fn raw(x: f64, y: f64) -> [f64; 4] {
    [x, y, 0.0, 0.0]
}
