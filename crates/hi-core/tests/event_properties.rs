//! Property tests for the event state machine.

use std::collections::HashSet;
use std::sync::Arc;

use hi_core::{
    ClassificationResult, ContinuePolicy, DetectorConfig, EventDetector, EventKind, GestureId,
};
use proptest::prelude::*;
use serde_json::Map;

const NAMES: [&str; 3] = ["swipe", "circle", "push"];

fn result(gesture: Option<usize>, stage: usize, confidence: f64) -> ClassificationResult {
    ClassificationResult {
        gesture: gesture.map(|i| GestureId {
            index: i,
            name: Arc::from(NAMES[i]),
        }),
        stage,
        stage_name: None,
        confidence,
        margin: 0.0,
        frame: 0,
    }
}

/// Track the set of active gestures across one emitted event.
fn apply_event(
    kind: EventKind,
    name: &str,
    active: &mut HashSet<String>,
) -> Result<(), TestCaseError> {
    match kind {
        EventKind::Start => {
            prop_assert!(active.insert(name.to_string()), "double start of {}", name);
            prop_assert_eq!(active.len(), 1);
        }
        EventKind::Continue => prop_assert!(active.contains(name)),
        EventKind::End => prop_assert!(active.remove(name), "end without start of {}", name),
        EventKind::None => {}
    }
    Ok(())
}

fn frame_strategy() -> impl Strategy<Value = (Option<usize>, usize, f64)> {
    (
        prop::option::weighted(0.7, 0usize..NAMES.len()),
        0usize..4,
        0.0f64..1.0,
    )
}

fn policy_strategy() -> impl Strategy<Value = ContinuePolicy> {
    prop_oneof![
        Just(ContinuePolicy::Always),
        Just(ContinuePolicy::StageAdvance),
        (0.0f64..=1.0).prop_map(|min_confidence| ContinuePolicy::StageAdvanceOrConfident {
            min_confidence
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Starts and ends alternate per gesture; continues and ends only refer
    /// to the gesture that is active.
    #[test]
    fn starts_and_ends_are_balanced(
        frames in prop::collection::vec(frame_strategy(), 0..120),
        policy in policy_strategy(),
        flush in any::<bool>(),
    ) {
        let mut detector = EventDetector::new(DetectorConfig { continue_policy: policy });
        let mut active: HashSet<String> = HashSet::new();

        for (gesture, stage, confidence) in frames {
            let d = detector.detect(&result(gesture, stage, confidence));
            for event in d.events() {
                apply_event(event.kind, event.gesture_name(), &mut active)?;
            }
            // After every frame the detector's active gesture is the frame's.
            prop_assert_eq!(
                detector.active_gesture().map(|g| g.index),
                gesture
            );
            prop_assert_eq!(active.len(), usize::from(gesture.is_some()));
        }

        if flush {
            if let Some(event) = detector.flush(&mut Map::new()) {
                apply_event(event.kind, event.gesture_name(), &mut active)?;
            }
            prop_assert!(active.is_empty());
        }
    }

    /// With the `always` policy every frame of an ongoing gesture continues.
    #[test]
    fn always_policy_never_suppresses(
        stages in prop::collection::vec(0usize..4, 1..40),
    ) {
        let mut detector = EventDetector::new(DetectorConfig {
            continue_policy: ContinuePolicy::Always,
        });
        let kinds: Vec<_> = stages
            .iter()
            .map(|&s| detector.detect(&result(Some(0), s, 0.5)).event.kind)
            .collect();
        prop_assert_eq!(kinds[0], EventKind::Start);
        prop_assert!(kinds[1..].iter().all(|k| *k == EventKind::Continue));
    }

    /// Reset makes the detector indistinguishable from a new one.
    #[test]
    fn reset_matches_fresh_detector(
        prefix in prop::collection::vec(frame_strategy(), 0..30),
        frames in prop::collection::vec(frame_strategy(), 0..30),
    ) {
        let mut used = EventDetector::default();
        for (g, s, c) in prefix {
            used.detect(&result(g, s, c));
        }
        used.reset();
        let mut fresh = EventDetector::default();
        for (g, s, c) in frames {
            let r = result(g, s, c);
            prop_assert_eq!(used.detect(&r), fresh.detect(&r));
        }
    }
}

#[test]
fn ten_frame_scenario() {
    let mut frames = vec![result(None, 0, 0.9); 5];
    frames.extend((0..4).map(|s| result(Some(0), s, 0.9)));
    frames.push(result(None, 0, 0.9));

    let mut detector = EventDetector::default();
    let events: Vec<_> = frames
        .iter()
        .map(|f| {
            let e = detector.detect(f).event;
            (e.kind, e.stage)
        })
        .collect();

    assert_eq!(
        events,
        vec![
            (EventKind::None, 0),
            (EventKind::None, 0),
            (EventKind::None, 0),
            (EventKind::None, 0),
            (EventKind::None, 0),
            (EventKind::Start, 0),
            (EventKind::Continue, 1),
            (EventKind::Continue, 2),
            (EventKind::Continue, 3),
            (EventKind::End, 3),
        ]
    );
}
