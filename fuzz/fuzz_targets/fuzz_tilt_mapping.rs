//! Fuzz target: `mixer::map_tilt` → `codec::encode_command`
//!
//! Interprets the input as raw f32 bit patterns (NaN, infinities and
//! subnormals included) and asserts that the mapped command always stays
//! inside the PWM range and always encodes to a well-formed wire line.
//!
//! cargo fuzz run fuzz_tilt_mapping

#![no_main]

use libfuzzer_sys::fuzz_target;
use tiltdrive::config::MixerConfig;
use tiltdrive::control::{TiltSample, mixer};
use tiltdrive::protocol::codec;

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }
    let x = f32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let y = f32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    let sample = TiltSample::new(x, y);

    for config in [MixerConfig::default(), MixerConfig::wide()] {
        let cmd = mixer::map_tilt(sample, &config);
        assert!(cmd.is_within(config.max_pwm), "command out of range: {cmd:?}");

        let line = codec::encode_command(cmd);
        let body = line.strip_suffix("$\n").expect("line must end with `$\\n`");
        let (left, right) = body.split_once('$').expect("two fields");
        assert_eq!(left.parse::<i16>().ok(), Some(cmd.left));
        assert_eq!(right.parse::<i16>().ok(), Some(cmd.right));
    }
});
