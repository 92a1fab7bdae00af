use super::frame::{StereoFrame, pan_gains};
use super::sample_buffer::SampleBuffer;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

// One playing sampler hit.
#[derive(Clone, Debug)]
pub struct Voice {
    pub pad: usize,
    pub pos: f32,
    pub rate: f32, // 1.0 = original pitch
    pub active: bool,
    gain_l: f32,
    gain_r: f32,
    start: usize,
    length: usize,
    stutter_period: Option<u32>, // grain: loop the first N frames
    played: f32,                 // source frames consumed, wraps included
}

impl Voice {
    pub fn new(
        pad: usize,
        start: usize,
        length: usize,
        semitones: Option<i16>,
        velocity: f32,
        pan: Option<i16>,
        stutter_period: Option<u32>,
    ) -> Self {
        let (l, r) = pan_gains(pan);
        let rate = match semitones {
            Some(st) => 2.0_f32.powf(f32::from(st) / 12.0),
            None => 1.0,
        };
        Self {
            pad,
            pos: 0.0,
            rate,
            active: length > 0,
            gain_l: velocity * l,
            gain_r: velocity * r,
            start,
            length,
            stutter_period,
            played: 0.0,
        }
    }

    pub fn render_into(&mut self, buffer: &SampleBuffer, out: &mut [StereoFrame]) {
        // we're at a certain playback position, it's our job to mix this voice into the output
        if !self.active {
            return;
        }
        let available = buffer.data.len().saturating_sub(self.start);
        self.length = self.length.min(available);
        if self.length == 0 {
            self.active = false;
            return;
        }

        let data = &buffer.data;
        let last = (self.length - 1) as f32;

        for frame in out.iter_mut() {
            // a stuttering voice still lives only as long as its slice
            if self.played >= self.length as f32 {
                self.active = false;
                break;
            }

            // read sample at current position
            let read_pos = self.pos.clamp(0.0, last);
            let i = read_pos as usize;
            let frac = read_pos - i as f32;
            let idx = self.start + i;
            let s0 = data[idx];
            let s1 = if i + 1 < self.length { data[idx + 1] } else { s0 };

            frame.left += lerp(s0.left, s1.left, frac) * self.gain_l;
            frame.right += lerp(s0.right, s1.right, frac) * self.gain_r;

            self.pos += self.rate;
            self.played += self.rate;

            // stutter wrap
            if let Some(period) = self.stutter_period {
                let p = (period as f32).min(self.length as f32);
                if p > 0.0 {
                    while self.pos >= p {
                        self.pos -= p;
                    }
                }
            }
        }
    }
}
