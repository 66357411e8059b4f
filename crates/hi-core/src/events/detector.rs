//! Start/continue/end state machine over classification results.
//!
//! | previous | current        | emitted                                  |
//! |----------|----------------|------------------------------------------|
//! | none     | none           | `none`                                   |
//! | none     | A              | `start(A)`                               |
//! | A        | A              | `continue(A)` or `none` per the policy   |
//! | A        | none           | `end(A)` at A's last stage               |
//! | A        | B              | `end(A)` then `start(B)`, same frame     |
//!
//! The history is updated after every frame, so every `start` is eventually
//! matched by exactly one `end` (explicit, implicit on a switch, or from
//! [`EventDetector::flush`]).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::sink::{keys, ResultSink};
use crate::config::ConfigError;
use crate::logging::event_names;
use crate::recognizer::{ClassificationResult, GestureId};

/// Kind of a gesture event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    None,
    Start,
    Continue,
    End,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::None => "none",
            EventKind::Start => "start",
            EventKind::Continue => "continue",
            EventKind::End => "end",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a frame of an ongoing gesture emits `continue`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContinuePolicy {
    /// Every frame of an ongoing gesture.
    Always,
    /// Only frames whose stage is past the previous frame's. A stage that
    /// falls back (a repeated performance) is suppressed.
    #[default]
    StageAdvance,
    /// Stage advances, plus frames at or above `min_confidence`.
    StageAdvanceOrConfident { min_confidence: f64 },
}

impl ContinuePolicy {
    fn emits(&self, prev_stage: usize, stage: usize, confidence: f64) -> bool {
        match *self {
            ContinuePolicy::Always => true,
            ContinuePolicy::StageAdvance => stage > prev_stage,
            ContinuePolicy::StageAdvanceOrConfident { min_confidence } => {
                stage > prev_stage || confidence >= min_confidence
            }
        }
    }
}

/// Detector tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    pub continue_policy: ContinuePolicy,
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let ContinuePolicy::StageAdvanceOrConfident { min_confidence } = self.continue_policy {
            if !(0.0..=1.0).contains(&min_confidence) {
                return Err(ConfigError::invalid(
                    "detector.continue_policy.min_confidence",
                    format!("must be in [0, 1], got {}", min_confidence),
                ));
            }
        }
        Ok(())
    }
}

/// One emitted event.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureEvent {
    /// Gesture the event refers to; None only for `none` events at rest.
    pub gesture: Option<GestureId>,
    pub kind: EventKind,
    pub stage: usize,
    pub stage_name: Option<Arc<str>>,
}

impl GestureEvent {
    pub fn gesture_name(&self) -> &str {
        self.gesture
            .as_ref()
            .map(|g| &*g.name)
            .unwrap_or(hi_model::NONE_LABEL)
    }

    /// Write `gesture`, `event`, `stage` and `stage_name` into a record.
    pub fn write_to<S: ResultSink + ?Sized>(&self, sink: &mut S) {
        sink.put(keys::GESTURE, Value::from(self.gesture_name()));
        sink.put(keys::EVENT, Value::from(self.kind.as_str()));
        sink.put(keys::STAGE, Value::from(self.stage));
        if let Some(name) = &self.stage_name {
            sink.put(keys::STAGE_NAME, Value::from(&**name));
        }
    }
}

/// Events produced by one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Implicit `end` of the previous gesture on a direct switch.
    pub ended: Option<GestureEvent>,
    pub event: GestureEvent,
}

impl Detection {
    /// Events in emission order.
    pub fn events(&self) -> impl Iterator<Item = &GestureEvent> {
        self.ended.iter().chain(std::iter::once(&self.event))
    }

    pub fn write_to<S: ResultSink + ?Sized>(&self, sink: &mut S) {
        self.event.write_to(sink);
        if let Some(ended) = &self.ended {
            sink.put(keys::ENDED_GESTURE, Value::from(ended.gesture_name()));
            sink.put(keys::ENDED_STAGE, Value::from(ended.stage));
        }
    }
}

/// What the detector remembers between frames.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    pub stage: usize,
    pub stage_name: Option<Arc<str>>,
    /// Last state-machine edge. `Continue` for every frame of an ongoing
    /// gesture, including frames whose emission the policy suppressed.
    pub event: EventKind,
    pub gesture: Option<GestureId>,
}

impl Default for History {
    fn default() -> Self {
        Self {
            stage: 0,
            stage_name: None,
            event: EventKind::None,
            gesture: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventDetector {
    config: DetectorConfig,
    history: History,
}

impl EventDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            history: History::default(),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Gesture currently between `start` and `end`.
    pub fn active_gesture(&self) -> Option<&GestureId> {
        self.history.gesture.as_ref()
    }

    /// Advance the state machine by one frame.
    pub fn detect(&mut self, result: &ClassificationResult) -> Detection {
        let current = GestureEvent {
            gesture: result.gesture.clone(),
            kind: EventKind::None,
            stage: result.stage,
            stage_name: result.stage_name.clone(),
        };

        let (ended, event) = match (&self.history.gesture, &result.gesture) {
            (None, None) => (None, current),
            (None, Some(_)) => (None, GestureEvent {
                kind: EventKind::Start,
                ..current
            }),
            (Some(prev), Some(now)) if prev == now => {
                let kind = if self.config.continue_policy.emits(
                    self.history.stage,
                    result.stage,
                    result.confidence,
                ) {
                    EventKind::Continue
                } else {
                    EventKind::None
                };
                (None, GestureEvent { kind, ..current })
            }
            (Some(_), Some(_)) => (
                Some(self.end_of_active()),
                GestureEvent {
                    kind: EventKind::Start,
                    ..current
                },
            ),
            (Some(_), None) => (None, self.end_of_active()),
        };

        for e in ended.iter().chain(std::iter::once(&event)) {
            log_edge(e, result.frame);
        }

        // A suppressed frame of the ongoing gesture still counts as continuing.
        let recorded = match event.kind {
            EventKind::None if result.gesture.is_some() => EventKind::Continue,
            kind => kind,
        };
        self.history = History {
            stage: result.stage,
            stage_name: result.stage_name.clone(),
            event: recorded,
            gesture: result.gesture.clone(),
        };

        Detection { ended, event }
    }

    /// [`Self::detect`], then write the record including `confidence` and
    /// `frame`.
    pub fn observe<S: ResultSink + ?Sized>(
        &mut self,
        result: &ClassificationResult,
        sink: &mut S,
    ) -> Detection {
        let detection = self.detect(result);
        detection.write_to(sink);
        sink.put(keys::CONFIDENCE, Value::from(result.confidence));
        sink.put(keys::FRAME, Value::from(result.frame));
        detection
    }

    /// End the active gesture, if any, and reset.
    ///
    /// Used when the stream is interrupted, e.g. on tracking loss. Writes the
    /// `end` record only when a gesture was active.
    pub fn flush<S: ResultSink + ?Sized>(&mut self, sink: &mut S) -> Option<GestureEvent> {
        let ended = self.history.gesture.is_some().then(|| self.end_of_active());
        if let Some(event) = &ended {
            event.write_to(sink);
            tracing::debug!(
                target: "hi_core::events",
                event = event_names::GESTURE_ENDED,
                gesture = event.gesture_name(),
                stage = event.stage,
                "gesture flushed"
            );
        }
        self.reset();
        ended
    }

    /// Forget the history.
    pub fn reset(&mut self) {
        self.history = History::default();
    }

    fn end_of_active(&self) -> GestureEvent {
        GestureEvent {
            gesture: self.history.gesture.clone(),
            kind: EventKind::End,
            stage: self.history.stage,
            stage_name: self.history.stage_name.clone(),
        }
    }
}

fn log_edge(event: &GestureEvent, frame: u64) {
    let name = match event.kind {
        EventKind::Start => event_names::GESTURE_STARTED,
        EventKind::End => event_names::GESTURE_ENDED,
        _ => return,
    };
    tracing::debug!(
        target: "hi_core::events",
        event = name,
        gesture = event.gesture_name(),
        stage = event.stage,
        frame,
        "gesture {}",
        event.kind
    );
}
