//! End-to-end recognition scenarios against the fixture model and recorded
//! frames. No mocks: real model file, real projector, real chains.

use std::path::PathBuf;
use std::sync::Arc;

use hi_core::config::EngineConfig;
use hi_core::events::keys;
use hi_core::{
    ClassificationResult, Error, EventKind, GestureProcessor, HandFrame, Recognizer,
    RecognizerConfig, TrainedModel,
};
use serde_json::{json, Map, Value};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../test/fixtures")
}

fn two_gestures() -> Arc<TrainedModel> {
    let path = fixtures_dir().join("models/two_gestures.json");
    Arc::new(hi_core::load_model(&path).expect("fixture model loads"))
}

fn swipe_session() -> Vec<HandFrame> {
    let text = std::fs::read_to_string(fixtures_dir().join("frames/swipe_session.jsonl"))
        .expect("read frames");
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("valid frame"))
        .collect()
}

fn tracked_descriptors() -> Vec<Vec<f64>> {
    swipe_session()
        .into_iter()
        .filter(|f| f.tracked)
        .map(|f| f.descriptor)
        .collect()
}

fn classify_all(r: &mut Recognizer, frames: &[Vec<f64>]) -> Vec<ClassificationResult> {
    frames.iter().map(|f| r.update(f).expect("frame ok")).collect()
}

#[test]
fn swipe_session_starts_and_ends_once() {
    let mut processor = GestureProcessor::with_model(two_gestures(), EngineConfig::default())
        .expect("processor");

    let mut records: Vec<Map<String, Value>> = Vec::new();
    let mut kinds = Vec::new();
    for frame in swipe_session() {
        let mut record = Map::new();
        if let Some(d) = processor.process(&frame, &mut record).expect("frame ok") {
            kinds.extend(d.events().map(|e| (e.kind, e.gesture_name().to_string())));
        }
        records.push(record);
    }

    let starts: Vec<_> = kinds.iter().filter(|(k, _)| *k == EventKind::Start).collect();
    let ends: Vec<_> = kinds.iter().filter(|(k, _)| *k == EventKind::End).collect();
    assert_eq!(starts.len(), 1);
    assert_eq!(ends.len(), 1);
    assert_eq!(starts[0].1, "swipe");
    assert_eq!(ends[0].1, "swipe");
    let start_pos = kinds.iter().position(|(k, _)| *k == EventKind::Start);
    let end_pos = kinds.iter().position(|(k, _)| *k == EventKind::End);
    assert!(start_pos < end_pos);

    // Five rest frames and three pre-stroke frames pass before the swipe wins.
    let first_start = records
        .iter()
        .position(|r| r[keys::EVENT] == json!("start"))
        .unwrap();
    assert_eq!(first_start, 8);
    assert_eq!(records[first_start][keys::STAGE_NAME], json!("nucleus"));

    let last = records.last().unwrap();
    assert_eq!(last[keys::TRACKED], json!(false));
    assert_eq!(last[keys::EVENT], json!("none"));
}

#[test]
fn reset_then_replay_reproduces_fresh_output() {
    let frames = tracked_descriptors();
    let mut fresh = Recognizer::new(two_gestures(), RecognizerConfig::default()).unwrap();
    let expected = classify_all(&mut fresh, &frames);

    let mut used = Recognizer::new(two_gestures(), RecognizerConfig::default()).unwrap();
    classify_all(&mut used, &frames[5..20]);
    used.reset();
    assert_eq!(classify_all(&mut used, &frames), expected);
}

#[test]
fn wrong_length_descriptor_mutates_nothing() {
    let frames = tracked_descriptors();
    let mut r = Recognizer::new(two_gestures(), RecognizerConfig::default()).unwrap();
    classify_all(&mut r, &frames[..10]);
    let before: Vec<_> = r
        .gesture_models()
        .iter()
        .map(|g| g.state().clone())
        .collect();

    let err = r.update(&[0.0; 5]).unwrap_err();
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 4,
            got: 5,
            ..
        }
    ));
    let after: Vec<_> = r
        .gesture_models()
        .iter()
        .map(|g| g.state().clone())
        .collect();
    assert_eq!(before, after);

    // The next valid frame continues exactly where a clean run would be.
    let mut clean = Recognizer::new(two_gestures(), RecognizerConfig::default()).unwrap();
    let expected = classify_all(&mut clean, &frames[..11]);
    assert_eq!(r.update(&frames[10]).unwrap(), expected[10]);
}

#[test]
fn identical_gestures_tie_to_none() {
    let path = fixtures_dir().join("models/two_gestures.json");
    let mut doc: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    let mut twin = doc["gestures"][0].clone();
    twin["name"] = json!("swipe_twin");
    doc["gestures"][1] = twin;
    let model = Arc::new(TrainedModel::from_json_str(&doc.to_string()).unwrap());

    let mut r = Recognizer::new(model, RecognizerConfig::default()).unwrap();
    let results = classify_all(&mut r, &tracked_descriptors());
    assert!(results.iter().all(|c| c.is_none()));
    // The twins do beat rest during the stroke; only the tie keeps them out.
    assert!(results.iter().any(|c| c.margin > 0.0));
}

#[test]
fn strict_margin_delays_recognition() {
    let frames = tracked_descriptors();
    let first_hit = |config: RecognizerConfig| {
        let mut r = Recognizer::new(two_gestures(), config).unwrap();
        classify_all(&mut r, &frames)
            .iter()
            .position(|c| !c.is_none())
    };
    let loose = first_hit(RecognizerConfig::default()).unwrap();
    let strict = first_hit(RecognizerConfig {
        min_margin: 30.0,
        ..RecognizerConfig::default()
    })
    .unwrap();
    assert!(strict > loose);
}
