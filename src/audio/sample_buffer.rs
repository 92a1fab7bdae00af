use std::ops::Range;
use std::path::Path;

use anyhow::Context;

use super::frame::StereoFrame;

// the sampler chops every buffer into this many equal slices for slice locks
pub const SLICES: usize = 16;

#[derive(Clone, Debug, Default)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>, // the audio data array
}

impl SampleBuffer {
    pub fn from_frames(data: Vec<StereoFrame>) -> Self {
        Self { data }
    }

    // Load a WAV file from disk, folded to stereo and resampled to `target_rate`
    pub fn load_wav(path: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        // Read the samples from the WAV file
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader // float, just pass it through
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => { // int, convert to float
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
            #[allow(unreachable_patterns)]
            other => anyhow::bail!("unsupported sample format: {:?}", other),
        };

        // mono is duplicated, anything past two channels is dropped
        let mut frames: Vec<StereoFrame> = samples
            .chunks_exact(channels)
            .map(|c| StereoFrame {
                left: c[0],
                right: if channels > 1 { c[1] } else { c[0] },
            })
            .collect();

        if spec.sample_rate != target_rate {
            frames = resample_linear(&frames, spec.sample_rate, target_rate);
        }
        log::debug!("loaded {} ({} frames)", path.display(), frames.len());
        Ok(Self { data: frames })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // frame range for a slice lock; out-of-range slices clamp to the last one
    pub fn slice_range(&self, slice: usize) -> Range<usize> {
        let slice = slice.min(SLICES - 1);
        let size = self.data.len() / SLICES;
        if size == 0 {
            return 0..self.data.len();
        }
        let start = slice * size;
        let end = if slice == SLICES - 1 { self.data.len() } else { start + size };
        start..end
    }
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate || frames.is_empty() {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let last = frames.len() - 1;

    (0..out_len)
        .map(|i| {
            // fractional position in the source buffer
            let src_pos = i as f64 / ratio;
            let idx = src_pos.floor() as usize;
            if idx >= last {
                return frames[last];
            }
            let frac = (src_pos - idx as f64) as f32;
            let (a, b) = (frames[idx], frames[idx + 1]);
            StereoFrame { // blend via frac and linear interpolation
                left: a.left * (1.0 - frac) + b.left * frac,
                right: a.right * (1.0 - frac) + b.right * frac,
            }
        })
        .collect()
}
