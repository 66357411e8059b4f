//! Fuzz target for engine.json parsing.

#![no_main]

use hi_core::config::EngineConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<EngineConfig>(data) {
        let _ = config.validate();
    }
});
