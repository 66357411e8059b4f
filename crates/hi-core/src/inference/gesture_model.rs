//! Incremental log-space Viterbi scoring of one hidden-state chain.
//!
//! # Recursion
//!
//! On the first frame after a reset:
//!
//! `delta[j] = ln pi_j + ln b_j(o)`
//!
//! On every later frame, with restart probability `r`:
//!
//! `delta'[j] = ln b_j(o) + max(max_i delta[i] + ln((1 - r) a_ij), ln r + ln pi_j)`
//!
//! The step maximum `m = max_j delta'[j]` is added to the accumulated path
//! log-likelihood and subtracted from the belief, so the belief stays bounded
//! on unbounded streams while `log_likelihood` remains the exact log-probability
//! of the best path. `score = decay * score + m` is the quantity the recognizer
//! compares between chains; with `decay = 1` it equals `log_likelihood`.
//!
//! # Two-phase update
//!
//! [`GestureModel::stage`] computes the next belief into a scratch buffer and
//! [`GestureModel::commit`] publishes it. The recognizer stages every chain
//! before committing any, so a frame that fails part way leaves all chains in
//! their previous state.

use std::sync::Arc;

use hi_math::{argmax, safe_ln};
use hi_model::{ChainParams, EmissionDensity, TrainedModel};

use crate::error::{Error, Result};

/// Which chain of the trained model a [`GestureModel`] scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSlot {
    /// The rest/background chain.
    Rest,
    /// Vocabulary entry by index.
    Gesture(usize),
}

/// Outcome of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    /// Accumulated best-path log-likelihood since the last reset.
    pub log_likelihood: f64,
    /// Decayed comparison score.
    pub score: f64,
    /// Most likely hidden state after this frame.
    pub best_state: usize,
}

/// Mutable per-chain belief.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureModelState {
    /// Normalized Viterbi log-belief; its maximum is 0 after any frame.
    pub belief: Vec<f64>,
    pub log_likelihood: f64,
    pub score: f64,
    pub best_state: usize,
    /// Frames consumed since the last reset.
    pub frames: u64,
}

/// One chain bound to a shared trained model.
#[derive(Debug)]
pub struct GestureModel {
    slot: ModelSlot,
    name: Arc<str>,
    stage_names: Vec<Arc<str>>,
    // Keeps the parameters this chain was compiled from alive and shared.
    model: Arc<TrainedModel>,
    n_states: usize,
    log_initial: Vec<f64>,
    /// Row-major `ln((1 - r) a_ij)`.
    log_transition: Vec<f64>,
    log_restart: f64,
    emissions: Vec<EmissionDensity>,
    decay: f64,
    state: GestureModelState,
    scratch: Vec<f64>,
    staged: Option<StepResult>,
}

impl GestureModel {
    /// Compile the chain in `slot` with the given score decay.
    pub fn new(model: Arc<TrainedModel>, slot: ModelSlot, decay: f64) -> Result<Self> {
        if !decay.is_finite() || decay <= 0.0 || decay > 1.0 {
            return Err(Error::InvalidModelParameter {
                field: "score_decay".to_string(),
                message: format!("must be in (0, 1], got {}", decay),
            });
        }

        let (name, stage_names, chain, prefix): (Arc<str>, Vec<Arc<str>>, &ChainParams, String) =
            match slot {
                ModelSlot::Rest => (Arc::from("rest"), Vec::new(), model.rest(), "rest".into()),
                ModelSlot::Gesture(g) => {
                    let params = model.gestures().get(g).ok_or_else(|| {
                        Error::InvalidModelParameter {
                            field: "gestures".to_string(),
                            message: format!(
                                "no gesture at index {} ({} available)",
                                g,
                                model.gestures().len()
                            ),
                        }
                    })?;
                    (
                        Arc::from(params.name.trim()),
                        params.stage_names.iter().map(|s| Arc::from(s.as_str())).collect(),
                        &params.chain,
                        format!("gestures[{}]", g),
                    )
                }
            };

        let n_states = chain.n_states();
        let log_initial: Vec<f64> = chain.initial.iter().map(|&p| safe_ln(p)).collect();
        let stay = 1.0 - chain.restart_prob;
        let log_transition = chain
            .transition
            .iter()
            .flat_map(|row| row.iter().map(move |&a| safe_ln(stay * a)))
            .collect();
        let emissions = chain
            .emissions
            .iter()
            .enumerate()
            .map(|(s, e)| {
                e.compile().map_err(|err| Error::InvalidModelParameter {
                    field: format!("{}.emissions[{}]", prefix, s),
                    message: err.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let state = GestureModelState {
            belief: log_initial.clone(),
            log_likelihood: 0.0,
            score: 0.0,
            best_state: argmax(&log_initial).map(|(i, _)| i).unwrap_or(0),
            frames: 0,
        };

        Ok(Self {
            slot,
            name,
            stage_names,
            n_states,
            log_initial,
            log_transition,
            log_restart: safe_ln(chain.restart_prob),
            emissions,
            decay,
            state,
            scratch: vec![0.0; n_states],
            staged: None,
            model,
        })
    }

    pub fn slot(&self) -> ModelSlot {
        self.slot
    }

    /// Gesture name, or `"rest"` for the background chain.
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Observation length this chain scores.
    pub fn feature_len(&self) -> usize {
        self.model.feature_len()
    }

    /// Phase label of `stage`, when the model names its stages.
    pub fn stage_name(&self, stage: usize) -> Option<&Arc<str>> {
        self.stage_names.get(stage)
    }

    pub fn state(&self) -> &GestureModelState {
        &self.state
    }

    pub fn score(&self) -> f64 {
        self.state.score
    }

    pub fn log_likelihood(&self) -> f64 {
        self.state.log_likelihood
    }

    pub fn best_state(&self) -> usize {
        self.state.best_state
    }

    /// Restore the initial distribution and clear the accumulators.
    pub fn reset(&mut self) {
        self.state.belief.copy_from_slice(&self.log_initial);
        self.state.log_likelihood = 0.0;
        self.state.score = 0.0;
        self.state.best_state = argmax(&self.log_initial).map(|(i, _)| i).unwrap_or(0);
        self.state.frames = 0;
        self.staged = None;
    }

    /// One complete step: [`Self::stage`] followed by [`Self::commit`].
    pub fn update(&mut self, observation: &[f64]) -> Result<StepResult> {
        let step = self.stage(observation)?;
        self.commit();
        Ok(step)
    }

    /// Compute the next belief without publishing it.
    ///
    /// Calling `stage` again before `commit` discards the earlier staged step.
    pub fn stage(&mut self, observation: &[f64]) -> Result<StepResult> {
        self.staged = None;
        if observation.len() != self.feature_len() {
            return Err(Error::DimensionMismatch {
                what: "observation",
                expected: self.feature_len(),
                got: observation.len(),
            });
        }

        let n = self.n_states;
        let first = self.state.frames == 0;
        for j in 0..n {
            let prior = if first {
                self.log_initial[j]
            } else {
                let mut best = self.log_restart + self.log_initial[j];
                for i in 0..n {
                    let cand = self.state.belief[i] + self.log_transition[i * n + j];
                    if cand > best {
                        best = cand;
                    }
                }
                best
            };
            self.scratch[j] = if prior == f64::NEG_INFINITY {
                f64::NEG_INFINITY
            } else {
                prior + self.emissions[j].log_density(observation)
            };
        }

        let (best_state, step_max) = match argmax(&self.scratch) {
            Some((i, m)) if m.is_finite() => (i, m),
            _ => {
                return Err(Error::NumericalInstability {
                    chain: self.name.to_string(),
                    message: "every hidden state became unreachable".to_string(),
                })
            }
        };
        for v in self.scratch.iter_mut() {
            *v -= step_max;
        }

        let step = StepResult {
            log_likelihood: self.state.log_likelihood + step_max,
            score: self.decay * self.state.score + step_max,
            best_state,
        };
        self.staged = Some(step);
        Ok(step)
    }

    /// Publish the step computed by the last successful [`Self::stage`].
    ///
    /// Returns false when nothing was staged.
    pub fn commit(&mut self) -> bool {
        let Some(step) = self.staged.take() else {
            return false;
        };
        std::mem::swap(&mut self.state.belief, &mut self.scratch);
        self.state.log_likelihood = step.log_likelihood;
        self.state.score = step.score;
        self.state.best_state = step.best_state;
        self.state.frames += 1;
        true
    }

    /// Drop a staged step without publishing it.
    pub fn discard(&mut self) {
        self.staged = None;
    }
}
