// Offline rendering. Drives the sequencer from a virtual clock measured in
// frames instead of a thread, so a render is exact and repeatable.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use crossbeam_channel::Receiver;

use super::engine::Engine;
use super::frame::StereoFrame;
use crate::audio_api::AudioCommand;
use crate::pipeline::arrangement::Arrangement;
use crate::pipeline::scenes::SceneBank;
use crate::sequencer::{Sequencer, swing_offset};

const BLOCK: usize = 256;

pub struct Renderer<'a> {
    engine: Engine,
    rx: Receiver<AudioCommand>,
    song: Option<(&'a mut Arrangement, &'a SceneBank)>,
    out: Vec<StereoFrame>,
}

impl<'a> Renderer<'a> {
    // `rx` is the receiving end of the channel the sequencer's instruments send into
    pub fn new(engine: Engine, rx: Receiver<AudioCommand>) -> Self {
        Self {
            engine,
            rx,
            song: None,
            out: Vec::new(),
        }
    }

    // Follow an arrangement: every pattern wrap advances it, and block
    // changes recall the named scene from `bank`.
    pub fn with_arrangement(mut self, arrangement: &'a mut Arrangement, bank: &'a SceneBank) -> Self {
        self.song = Some((arrangement, bank));
        self
    }

    fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    fn frames_for(&self, d: Duration) -> usize {
        (d.as_secs_f64() * f64::from(self.sample_rate())).round() as usize
    }

    fn drain(&mut self) {
        while let Ok(cmd) = self.rx.try_recv() {
            self.engine.handle_cmd(cmd);
        }
    }

    // render until the output holds `frames` frames
    fn render_to(&mut self, frames: usize) {
        let mut block = [StereoFrame::zero(); BLOCK];
        while self.out.len() < frames {
            let n = (frames - self.out.len()).min(BLOCK);
            self.engine.render_block(&mut block[..n]);
            self.out.extend_from_slice(&block[..n]);
        }
    }

    /// Play `loops` passes of the pattern (after the arrangement, if any,
    /// has set the scene) followed by `tail` of ring-out.
    pub fn run(mut self, seq: &mut Sequencer, loops: u64, tail: Duration) -> Vec<StereoFrame> {
        // kit/bed registration queued before the render starts
        self.drain();

        if let Some((arr, bank)) = self.song.as_mut() {
            if let Some(scene) = arr.start().and_then(|s| bank.get(s)) {
                seq.recall_scene(scene);
            }
        }

        seq.play();
        let start_loop = seq.loop_count();
        let mut grid = Duration::ZERO;

        while seq.loop_count() - start_loop < loops {
            let interval = seq.step_interval();
            let deadline = grid + swing_offset(seq.current_step(), interval, seq.swing());
            let at = self.frames_for(deadline);
            self.render_to(at);

            seq.tick();
            self.drain();
            grid += interval;

            if seq.current_step() == 0 {
                if let Some((arr, bank)) = self.song.as_mut() {
                    if let Some(scene) = arr.on_loop_complete().and_then(|s| bank.get(s)) {
                        seq.recall_scene(scene);
                    }
                }
            }
        }
        seq.stop();

        let end = self.frames_for(grid + tail);
        self.render_to(end);
        log::info!(
            "rendered {} loops, {:.2}s",
            loops,
            self.out.len() as f64 / f64::from(self.sample_rate())
        );
        self.out
    }
}

// 16-bit stereo
pub fn write_wav(path: &Path, frames: &[StereoFrame], sample_rate: u32) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;
    let to_i16 = |x: f32| (x.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
    for f in frames {
        writer.write_sample(to_i16(f.left))?;
        writer.write_sample(to_i16(f.right))?;
    }
    writer.finalize().context("finalizing wav")?;
    log::info!("wrote {}", path.display());
    Ok(())
}
