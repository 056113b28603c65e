//! Drive control: tilt input and motor output types plus the mixer.

pub mod mixer;

/// A two-axis tilt reading.
///
/// Raw samples come straight from the sensor; conditioned samples have been
/// clamped to the sensor range and dead-zoned (see [`mixer::condition`]).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TiltSample {
    pub x: f32,
    pub y: f32,
}

impl TiltSample {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Signed per-wheel duty command.  Positive and negative select direction,
/// zero stops the wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorCommand {
    pub left: i16,
    pub right: i16,
}

impl MotorCommand {
    /// Both wheels stopped.
    pub const STOP: Self = Self { left: 0, right: 0 };

    pub const fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }

    /// Whether both wheels lie within `[-max_pwm, max_pwm]`.
    pub fn is_within(self, max_pwm: i16) -> bool {
        let range = -max_pwm..=max_pwm;
        range.contains(&self.left) && range.contains(&self.right)
    }
}

impl core::ops::Neg for MotorCommand {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.left, -self.right)
    }
}
