//! Fuzz target: `DriveConfig::from_json`
//!
//! Feeds arbitrary text to the config loader.  It must never panic, and
//! anything it accepts must pass validation.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use tiltdrive::config::DriveConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = DriveConfig::from_json(text) {
        assert!(config.validate().is_ok());
        assert!(config.mixer.dead_zone < config.mixer.sensor_range);
    }
});
