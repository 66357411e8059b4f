//! Per-session recognition facade.
//!
//! A [`GestureProcessor`] owns an optional [`Recognizer`] (absent until a
//! model is loaded) and an [`EventDetector`]. It assembles each frame's
//! observation, handles tracking loss, and writes one record per frame into
//! the caller's [`ResultSink`].

use std::sync::Arc;

use hi_model::TrainedModel;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::events::{keys, Detection, EventDetector, EventKind, GestureEvent, ResultSink};
use crate::logging::event_names;
use crate::recognizer::Recognizer;

/// One frame from the feature extractor.
///
/// JSON form: `{"position":[x,y,z],"descriptor":[...]}` or `{"tracked":false}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandFrame {
    #[serde(default = "default_tracked")]
    pub tracked: bool,
    /// Shoulder-relative hand position, used by models with position dims.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descriptor: Vec<f64>,
}

fn default_tracked() -> bool {
    true
}

impl HandFrame {
    pub fn tracked(position: Option<Vec<f64>>, descriptor: Vec<f64>) -> Self {
        Self {
            tracked: true,
            position,
            descriptor,
        }
    }

    /// The hand is not visible in this frame.
    pub fn lost() -> Self {
        Self {
            tracked: false,
            position: None,
            descriptor: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct GestureProcessor {
    config: EngineConfig,
    recognizer: Option<Recognizer>,
    detector: EventDetector,
    session_id: String,
    tracking: bool,
}

impl GestureProcessor {
    /// A processor without a model. Frames are rejected until [`Self::load`].
    pub fn new(config: EngineConfig) -> Self {
        let session_id = generate_session_id();
        tracing::info!(
            target: "hi_core::processor",
            event = event_names::SESSION_STARTED,
            session_id = %session_id,
            "session started"
        );
        Self {
            detector: EventDetector::new(config.detector),
            config,
            recognizer: None,
            session_id,
            tracking: false,
        }
    }

    pub fn with_model(model: Arc<TrainedModel>, config: EngineConfig) -> Result<Self> {
        let mut processor = Self::new(config);
        processor.load(model)?;
        Ok(processor)
    }

    /// Install a model, replacing any previous one and clearing all history.
    pub fn load(&mut self, model: Arc<TrainedModel>) -> Result<()> {
        let recognizer = Recognizer::new(model, self.config.recognizer)?;
        tracing::info!(
            target: "hi_core::processor",
            event = event_names::MODEL_LOADED,
            session_id = %self.session_id,
            sha256 = %recognizer.model().provenance().sha256,
            gestures = recognizer.model().n_vocabularies(),
            "model installed"
        );
        self.recognizer = Some(recognizer);
        self.detector.reset();
        self.tracking = false;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn recognizer(&self) -> Option<&Recognizer> {
        self.recognizer.as_ref()
    }

    pub fn detector(&self) -> &EventDetector {
        &self.detector
    }

    /// Process one frame and write its record into `sink`.
    ///
    /// Returns the detection for tracked frames. On the first untracked frame
    /// after tracking, an active gesture is ended and the session is reset;
    /// the `end` is returned as the detection's event. Further untracked
    /// frames return None. On error nothing is written and no state changes.
    pub fn process<S: ResultSink + ?Sized>(
        &mut self,
        frame: &HandFrame,
        sink: &mut S,
    ) -> Result<Option<Detection>> {
        let Some(recognizer) = self.recognizer.as_mut() else {
            return Err(Error::NotInitialized);
        };
        if !frame.tracked {
            return Ok(self.on_tracking_lost(sink));
        }

        let position: &[f64] = if recognizer.model().position_dims() == 0 {
            &[]
        } else {
            frame.position.as_deref().unwrap_or(&[])
        };
        let result = recognizer.update_with_position(position, &frame.descriptor)?;
        self.tracking = true;

        let detection = self.detector.observe(&result, sink);
        sink.put(keys::TRACKED, Value::Bool(true));
        Ok(Some(detection))
    }

    /// Reset the recognizer and the detector without emitting anything.
    pub fn reset(&mut self) {
        if let Some(r) = self.recognizer.as_mut() {
            r.reset();
        }
        self.detector.reset();
        self.tracking = false;
        tracing::debug!(
            target: "hi_core::processor",
            event = event_names::SESSION_RESET,
            session_id = %self.session_id,
            "session reset"
        );
    }

    fn on_tracking_lost<S: ResultSink + ?Sized>(&mut self, sink: &mut S) -> Option<Detection> {
        let ended = if self.tracking {
            tracing::debug!(
                target: "hi_core::processor",
                event = event_names::TRACKING_LOST,
                session_id = %self.session_id,
                "tracking lost"
            );
            let ended = self.detector.flush(sink);
            self.reset();
            ended
        } else {
            None
        };

        if ended.is_none() {
            GestureEvent {
                gesture: None,
                kind: EventKind::None,
                stage: 0,
                stage_name: None,
            }
            .write_to(sink);
        }
        sink.put(keys::TRACKED, Value::Bool(false));
        ended.map(|event| Detection { ended: None, event })
    }
}

fn generate_session_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("sess-{}", &uuid.simple().to_string()[..12])
}
