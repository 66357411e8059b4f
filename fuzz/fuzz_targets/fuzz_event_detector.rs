//! Fuzz target for the event detector.
//!
//! Feeds arbitrary classification sequences and checks that every start is
//! matched by exactly one end once the detector is flushed.

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use hi_core::{
    ClassificationResult, ContinuePolicy, DetectorConfig, EventDetector, EventKind, GestureId,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Step {
    gesture: Option<u8>,
    stage: u8,
    confidence: u8,
}

#[derive(Debug, Arbitrary)]
struct Input {
    policy: u8,
    steps: Vec<Step>,
}

fuzz_target!(|input: Input| {
    let continue_policy = match input.policy % 3 {
        0 => ContinuePolicy::Always,
        1 => ContinuePolicy::StageAdvance,
        _ => ContinuePolicy::StageAdvanceOrConfident { min_confidence: 0.5 },
    };
    let mut detector = EventDetector::new(DetectorConfig { continue_policy });
    let mut open = 0i64;

    for (frame, step) in input.steps.iter().enumerate() {
        let gesture = step.gesture.map(|g| {
            let index = usize::from(g % 4);
            GestureId {
                index,
                name: Arc::from(format!("g{index}")),
            }
        });
        let result = ClassificationResult {
            gesture,
            stage: usize::from(step.stage % 5),
            stage_name: None,
            confidence: f64::from(step.confidence) / 255.0,
            margin: 0.0,
            frame: frame as u64,
        };
        let detection = detector.detect(&result);
        for event in detection.events() {
            match event.kind {
                EventKind::Start => open += 1,
                EventKind::End => open -= 1,
                _ => {}
            }
            assert!((0..=1).contains(&open));
        }
    }

    if detector.flush(&mut serde_json::Map::new()).is_some() {
        open -= 1;
    }
    assert_eq!(open, 0);
});
