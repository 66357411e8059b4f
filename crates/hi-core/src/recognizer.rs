//! Frame-level gesture classification.
//!
//! Per frame the recognizer projects the raw descriptor, assembles the
//! observation (hand position first, then the reduced descriptor), advances
//! the rest chain and every gesture chain, and applies the decision rule:
//!
//! - the best gesture is reported only when its score beats the rest chain by
//!   more than `min_margin` and strictly beats every other gesture;
//! - otherwise the frame is classified as no gesture, with the rest chain's
//!   best state as the stage.
//!
//! Exact ties therefore always resolve to no gesture.

use std::fmt;
use std::sync::Arc;

use hi_math::{argmax, logistic};
use hi_model::TrainedModel;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::error::Result;
use crate::inference::{GestureModel, ModelSlot};
use crate::logging::{event_names, Stage};
use crate::projector::{check_input, Projector};

/// Tuning for the decision rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecognizerConfig {
    /// Score lead over the rest chain a gesture needs to be reported.
    pub min_margin: f64,
    /// Per-frame decay of accumulated chain scores, in (0, 1].
    ///
    /// The decision compares decayed scores so old frames stop dominating an
    /// unbounded stream. With 1.0 each score equals the chain's current path
    /// log-likelihood, and the rule compares plain log-likelihoods.
    pub score_decay: f64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            min_margin: 0.0,
            score_decay: 0.9,
        }
    }
}

impl RecognizerConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.min_margin.is_finite() || self.min_margin < 0.0 {
            return Err(ConfigError::invalid(
                "recognizer.min_margin",
                format!("must be finite and non-negative, got {}", self.min_margin),
            ));
        }
        if !self.score_decay.is_finite() || self.score_decay <= 0.0 || self.score_decay > 1.0 {
            return Err(ConfigError::invalid(
                "recognizer.score_decay",
                format!("must be in (0, 1], got {}", self.score_decay),
            ));
        }
        Ok(())
    }
}

/// Identity of a vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GestureId {
    pub index: usize,
    pub name: Arc<str>,
}

impl fmt::Display for GestureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Outcome of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Recognized gesture, or None for no gesture.
    pub gesture: Option<GestureId>,
    /// Best hidden state of the winning chain (the rest chain for None).
    pub stage: usize,
    /// Phase label of `stage`, when the model names its stages.
    pub stage_name: Option<Arc<str>>,
    /// Logistic of the winner's score lead over the runner-up, in (0, 1).
    pub confidence: f64,
    /// Best gesture score minus rest score.
    pub margin: f64,
    /// Zero-based frame index since the last reset.
    pub frame: u64,
}

impl ClassificationResult {
    pub fn is_none(&self) -> bool {
        self.gesture.is_none()
    }

    pub fn gesture_name(&self) -> Option<&str> {
        self.gesture.as_ref().map(|g| &*g.name)
    }
}

/// Owns the projector, the rest chain and one chain per gesture.
///
/// Not `Clone`: one recognizer carries one session's belief state.
#[derive(Debug)]
pub struct Recognizer {
    model: Arc<TrainedModel>,
    config: RecognizerConfig,
    projector: Projector,
    rest: GestureModel,
    gestures: Vec<GestureModel>,
    reduced: Vec<f64>,
    observation: Vec<f64>,
    scores: Vec<f64>,
    frames: u64,
}

impl Recognizer {
    pub fn new(model: Arc<TrainedModel>, config: RecognizerConfig) -> Result<Self> {
        config.validate()?;

        let rest = GestureModel::new(model.clone(), ModelSlot::Rest, config.score_decay)?;
        let gestures = (0..model.n_vocabularies())
            .map(|g| GestureModel::new(model.clone(), ModelSlot::Gesture(g), config.score_decay))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            target: "hi_core::recognizer",
            gestures = gestures.len(),
            states = model.n_states_per_gesture(),
            feature_len = model.feature_len(),
            min_margin = config.min_margin,
            score_decay = config.score_decay,
            "recognizer created"
        );

        Ok(Self {
            projector: Projector::new(model.clone()),
            reduced: vec![0.0; model.n_principal_comps()],
            observation: vec![0.0; model.feature_len()],
            scores: vec![0.0; gestures.len()],
            frames: 0,
            rest,
            gestures,
            config,
            model,
        })
    }

    pub fn model(&self) -> &Arc<TrainedModel> {
        &self.model
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn rest_model(&self) -> &GestureModel {
        &self.rest
    }

    pub fn gesture_models(&self) -> &[GestureModel] {
        &self.gestures
    }

    /// Frames consumed since the last reset.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Classify one frame of a model without position coordinates.
    pub fn update(&mut self, raw: &[f64]) -> Result<ClassificationResult> {
        self.update_with_position(&[], raw)
    }

    /// Classify one frame. `position` must have exactly `position_dims`
    /// entries (empty for models without position).
    ///
    /// Inputs are validated and every chain is staged before any chain is
    /// committed, so on error no belief state changes.
    pub fn update_with_position(
        &mut self,
        position: &[f64],
        raw: &[f64],
    ) -> Result<ClassificationResult> {
        let position_dims = self.model.position_dims();
        check_input("hand position", position, position_dims)?;
        self.projector.apply_into(raw, &mut self.reduced)?;
        self.observation[..position_dims].copy_from_slice(position);
        self.observation[position_dims..].copy_from_slice(&self.reduced);

        if let Err(err) = stage_all(&mut self.rest, &mut self.gestures, &self.observation) {
            self.rest.discard();
            self.gestures.iter_mut().for_each(GestureModel::discard);
            tracing::warn!(
                target: "hi_core::recognizer",
                event = event_names::FRAME_REJECTED,
                stage = %Stage::Recognize,
                frame = self.frames,
                error = %err,
                "frame rejected"
            );
            return Err(err);
        }
        self.rest.commit();
        for g in self.gestures.iter_mut() {
            g.commit();
        }

        let result = self.decide();
        self.frames += 1;

        tracing::trace!(
            target: "hi_core::recognizer",
            frame = result.frame,
            gesture = result.gesture_name().unwrap_or(hi_model::NONE_LABEL),
            stage = result.stage,
            margin = result.margin,
            confidence = result.confidence,
            "frame classified"
        );
        Ok(result)
    }

    /// Reset every chain to its initial distribution.
    pub fn reset(&mut self) {
        self.rest.reset();
        for g in self.gestures.iter_mut() {
            g.reset();
        }
        self.frames = 0;
    }

    fn decide(&mut self) -> ClassificationResult {
        for (slot, g) in self.scores.iter_mut().zip(&self.gestures) {
            *slot = g.score();
        }
        let rest_score = self.rest.score();
        // Construction guarantees at least one gesture with a finite score.
        let (best_idx, best) = argmax(&self.scores).unwrap_or((0, f64::NEG_INFINITY));
        let runner_up = self
            .scores
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != best_idx)
            .map(|(_, s)| *s)
            .fold(f64::NEG_INFINITY, f64::max);
        let margin = best - rest_score;

        if margin > self.config.min_margin && best > runner_up {
            let winner = &self.gestures[best_idx];
            let stage = winner.best_state();
            ClassificationResult {
                gesture: Some(GestureId {
                    index: best_idx,
                    name: winner.name().clone(),
                }),
                stage,
                stage_name: winner.stage_name(stage).cloned(),
                confidence: logistic(best - runner_up.max(rest_score)),
                margin,
                frame: self.frames,
            }
        } else {
            ClassificationResult {
                gesture: None,
                stage: self.rest.best_state(),
                stage_name: None,
                confidence: logistic(rest_score - best),
                margin,
                frame: self.frames,
            }
        }
    }
}

fn stage_all(rest: &mut GestureModel, gestures: &mut [GestureModel], obs: &[f64]) -> Result<()> {
    rest.stage(obs)?;
    for g in gestures.iter_mut() {
        g.stage(obs)?;
    }
    Ok(())
}
