//! Key/value result records.

use std::collections::HashMap;
use std::hash::BuildHasher;

use serde_json::{Map, Value};

/// Record keys written by the detector and processor.
pub mod keys {
    pub const GESTURE: &str = "gesture";
    pub const EVENT: &str = "event";
    pub const STAGE: &str = "stage";
    pub const STAGE_NAME: &str = "stage_name";
    pub const CONFIDENCE: &str = "confidence";
    pub const ENDED_GESTURE: &str = "ended_gesture";
    pub const ENDED_STAGE: &str = "ended_stage";
    pub const FRAME: &str = "frame";
    pub const TRACKED: &str = "tracked";
}

/// Destination for per-frame result fields.
///
/// The record is owned by the caller; writers only insert or overwrite keys.
pub trait ResultSink {
    fn put(&mut self, key: &str, value: Value);
}

impl ResultSink for Map<String, Value> {
    fn put(&mut self, key: &str, value: Value) {
        self.insert(key.to_string(), value);
    }
}

impl<S: BuildHasher> ResultSink for HashMap<String, Value, S> {
    fn put(&mut self, key: &str, value: Value) {
        self.insert(key.to_string(), value);
    }
}

impl<T: ResultSink + ?Sized> ResultSink for &mut T {
    fn put(&mut self, key: &str, value: Value) {
        (**self).put(key, value);
    }
}
