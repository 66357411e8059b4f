//! Fuzz target for trained model parsing and validation.
//!
//! Model files are produced by an offline trainer and may be truncated or
//! hand edited. Loading must return an error, never panic.

#![no_main]

use hi_model::TrainedModel;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(model) = TrainedModel::from_json_str(text) {
            // A model that validates must also compile into a recognizer.
            let _ = hi_core::Recognizer::new(
                std::sync::Arc::new(model),
                hi_core::RecognizerConfig::default(),
            );
        }
    }
});
