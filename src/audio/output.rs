use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use super::engine::Engine;
use super::frame::StereoFrame;
use crate::audio_api::AudioCommand;

const COMMAND_QUEUE: usize = 1024;
const MAX_BLOCK: usize = 4096;

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    sample_rate: u32,
    _stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        let _ = self.tx.try_send(cmd);
    }

    // for building `Instruments::from_channel`
    pub fn sender(&self) -> Sender<AudioCommand> {
        self.tx.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(COMMAND_QUEUE);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    log::info!(
        "audio out: {} ({} Hz, {} ch)",
        device.name().unwrap_or_else(|_| "unknown".into()),
        sample_rate,
        channels
    );

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => {
            build_output_stream_f32(&device, &config.into(), rx, sample_rate, channels)?
        }
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 supported for now)"),
    };
    stream.play().context("failed to play output stream")?;

    Ok(AudioHandle {
        tx,
        sample_rate,
        _stream: stream,
    })
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    sample_rate: u32,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new(sample_rate);
    // scratch buffer allocated once, outside the callback
    let mut scratch = vec![StereoFrame::zero(); MAX_BLOCK];

    let err_fn = |err| log::error!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            // the device may want any channel count; render in chunks and spread stereo over it
            for chunk in data.chunks_mut(MAX_BLOCK * channels.max(1)) {
                let n_frames = chunk.len() / channels.max(1);
                let frames = &mut scratch[..n_frames];
                engine.render_block(frames);
                for (out, f) in chunk.chunks_mut(channels.max(1)).zip(frames.iter()) {
                    match out.len() {
                        1 => out[0] = (f.left + f.right) * 0.5,
                        _ => {
                            out[0] = f.left;
                            out[1] = f.right;
                            out[2..].fill(0.0);
                        }
                    }
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
