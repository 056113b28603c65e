//! Tilt-to-wheel mixer ("arcade drive").
//!
//! The primary (X) axis sets forward/reverse speed, the secondary (Y) axis
//! bleeds speed off one wheel to steer.  When X is centred the vehicle
//! spins in place at a rate set by Y.
//!
//! ```text
//!            x != 0                         x == 0
//!   y < 0: right = |p|, left  = k(y)·|p|    left  =  pwm(y)
//!   y ≥ 0: left  = |p|, right = k(y)·|p|    right = -pwm(y)
//!   x > 0: negate both
//! ```
//!
//! where `p = pwm(x)` and `k(y)` falls linearly from 1 at `y = 0` to 0 at
//! full tilt.

use crate::config::MixerConfig;

use super::{MotorCommand, TiltSample};

/// Clamp one axis to `[-G, G]` and zero it inside the dead zone.
///
/// The dead-zone test is strict: `|v| == D` passes through.  NaN reads as
/// centred.
pub fn condition_axis(value: f32, config: &MixerConfig) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    let clamped = value.clamp(-config.sensor_range, config.sensor_range);
    if clamped.abs() < config.dead_zone {
        0.0
    } else {
        clamped
    }
}

/// Condition both axes of a raw sample.
pub fn condition(sample: TiltSample, config: &MixerConfig) -> TiltSample {
    TiltSample::new(
        condition_axis(sample.x, config),
        condition_axis(sample.y, config),
    )
}

/// Scale a conditioned axis to a rounded PWM value.
pub fn pwm_from_axis(axis: f32, config: &MixerConfig) -> i16 {
    to_pwm(axis / config.sensor_range * f32::from(config.max_pwm), config.max_pwm)
}

fn to_pwm(value: f32, max_pwm: i16) -> i16 {
    let max = f32::from(max_pwm);
    value.round().clamp(-max, max) as i16
}

/// Map a tilt sample to a motor command.  Pure; conditions the sample first,
/// so raw and pre-conditioned input give the same result.
pub fn map_tilt(sample: TiltSample, config: &MixerConfig) -> MotorCommand {
    let TiltSample { x, y } = condition(sample, config);

    if x == 0.0 {
        let spin = pwm_from_axis(y, config);
        return MotorCommand::new(spin, -spin);
    }

    let magnitude = f32::from(pwm_from_axis(x, config).unsigned_abs());
    let range = config.sensor_range;
    let (left, right) = if y < 0.0 {
        let min = -range;
        let left = (min - y) / min * magnitude;
        (to_pwm(left, config.max_pwm), to_pwm(magnitude, config.max_pwm))
    } else {
        let right = (range - y) / range * magnitude;
        (to_pwm(magnitude, config.max_pwm), to_pwm(right, config.max_pwm))
    };

    let command = MotorCommand::new(left, right);
    if x > 0.0 { -command } else { command }
}
