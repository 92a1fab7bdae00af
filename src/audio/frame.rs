// The smallest unit of audio; one stereo frame
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn zero() -> Self { // just giving `default` a better name for clarity
        Self::default()
    }

    pub fn mono(x: f32) -> Self {
        Self { left: x, right: x }
    }

    pub fn peak(&self) -> f32 {
        self.left.abs().max(self.right.abs())
    }
}

/// Constant-power gains for a pan lock (-100 hard left .. 100 hard right).
/// No lock means centre.
pub fn pan_gains(pan: Option<i16>) -> (f32, f32) {
    let p = f32::from(pan.unwrap_or(0).clamp(-100, 100));
    let theta = (p / 100.0 + 1.0) * std::f32::consts::FRAC_PI_4; // 0..pi/2
    (theta.cos(), theta.sin())
}
