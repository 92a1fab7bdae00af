use super::frame::StereoFrame;

// Master effects. Parameter locks retarget these right before a hit lands,
// and the change sticks until the next lock moves it again.
pub trait Effect: Send {
    fn process(&mut self, buf: &mut [StereoFrame]);
}

pub const FILTER_OPEN_HZ: f32 = 20_000.0;

// one-pole lowpass
pub struct LowPass {
    sample_rate: f32,
    coeff: f32,
    state: StereoFrame,
}

impl LowPass {
    pub fn new(sample_rate: u32) -> Self {
        let mut f = Self {
            sample_rate: sample_rate as f32,
            coeff: 1.0,
            state: StereoFrame::zero(),
        };
        f.set_cutoff(FILTER_OPEN_HZ);
        f
    }

    pub fn set_cutoff(&mut self, hz: f32) {
        let nyquist = self.sample_rate * 0.5;
        let hz = hz.clamp(20.0, nyquist);
        self.coeff = 1.0 - (-std::f32::consts::TAU * hz / self.sample_rate).exp();
    }
}

impl Effect for LowPass {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        let a = self.coeff;
        for f in buf.iter_mut() {
            self.state.left += a * (f.left - self.state.left);
            self.state.right += a * (f.right - self.state.right);
            *f = self.state;
        }
    }
}

// feedback delay, ~300ms
pub struct Delay {
    line: Vec<StereoFrame>,
    pos: usize,
    feedback: f32,
    mix: f32, // 0.0 - 1.0
}

impl Delay {
    pub fn new(sample_rate: u32) -> Self {
        let len = ((sample_rate as f32) * 0.3) as usize;
        Self {
            line: vec![StereoFrame::zero(); len.max(1)],
            pos: 0,
            feedback: 0.35,
            mix: 0.0,
        }
    }

    pub fn set_mix(&mut self, percent: f32) {
        self.mix = (percent / 100.0).clamp(0.0, 1.0);
    }
}

impl Effect for Delay {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            let echo = self.line[self.pos];
            self.line[self.pos] = StereoFrame {
                left: f.left + echo.left * self.feedback,
                right: f.right + echo.right * self.feedback,
            };
            self.pos = (self.pos + 1) % self.line.len();
            f.left += echo.left * self.mix;
            f.right += echo.right * self.mix;
        }
    }
}

struct Comb {
    line: Vec<f32>,
    pos: usize,
}

impl Comb {
    fn new(len: usize) -> Self {
        Self {
            line: vec![0.0; len.max(1)],
            pos: 0,
        }
    }

    #[inline]
    fn tick(&mut self, input: f32, feedback: f32) -> f32 {
        let out = self.line[self.pos];
        self.line[self.pos] = input + out * feedback;
        self.pos = (self.pos + 1) % self.line.len();
        out
    }
}

// Schroeder-style: parallel combs per side, tunings from 44.1k scaled to the engine rate
const COMB_TUNING: [usize; 4] = [1116, 1188, 1277, 1356];
const STEREO_SPREAD: usize = 23;

pub struct Reverb {
    left: Vec<Comb>,
    right: Vec<Comb>,
    feedback: f32,
    mix: f32,
}

impl Reverb {
    pub fn new(sample_rate: u32) -> Self {
        let scale = sample_rate as f32 / 44_100.0;
        let tune = |n: usize| ((n as f32) * scale) as usize;
        Self {
            left: COMB_TUNING.iter().map(|&n| Comb::new(tune(n))).collect(),
            right: COMB_TUNING
                .iter()
                .map(|&n| Comb::new(tune(n + STEREO_SPREAD)))
                .collect(),
            feedback: 0.84,
            mix: 0.0,
        }
    }

    pub fn set_mix(&mut self, percent: f32) {
        self.mix = (percent / 100.0).clamp(0.0, 1.0);
    }
}

impl Effect for Reverb {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        let gain = 0.25 / COMB_TUNING.len() as f32;
        for f in buf.iter_mut() {
            let input = (f.left + f.right) * 0.5;
            let wet_l: f32 = self.left.iter_mut().map(|c| c.tick(input, self.feedback)).sum();
            let wet_r: f32 = self.right.iter_mut().map(|c| c.tick(input, self.feedback)).sum();
            f.left += wet_l * gain * self.mix;
            f.right += wet_r * gain * self.mix;
        }
    }
}

/// Filter -> delay -> reverb, in that order.
pub struct MasterBus {
    pub filter: LowPass,
    pub delay: Delay,
    pub reverb: Reverb,
}

impl MasterBus {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            filter: LowPass::new(sample_rate),
            delay: Delay::new(sample_rate),
            reverb: Reverb::new(sample_rate),
        }
    }
}

impl Effect for MasterBus {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        self.filter.process(buf);
        self.delay.process(buf);
        self.reverb.process(buf);
    }
}
