use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::audio::SampleBuffer;
use crate::audio_api::{AudioCommand, PulseChannel};
use crate::shared::NUM_TRACKS;

// Every .wav directly inside `dir`, sorted by file name so pad order is stable
pub fn index_wav_in_dir(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

// Load a WAV from disk, prepare for registration with the engine
pub fn load(pad: usize, path: &Path, target_rate: u32) -> anyhow::Result<AudioCommand> {
    let buffer = SampleBuffer::load_wav(path, target_rate)?;
    Ok(AudioCommand::RegisterSample { pad, buffer })
}

// The first eight WAVs in a directory become pads 0-7. Files that fail to
// decode are skipped with a warning rather than failing the whole kit.
pub fn load_kit(dir: &Path, target_rate: u32) -> anyhow::Result<Vec<AudioCommand>> {
    let mut cmds = Vec::new();
    for (pad, path) in index_wav_in_dir(dir)?.into_iter().take(NUM_TRACKS).enumerate() {
        match load(pad, &path, target_rate) {
            Ok(cmd) => cmds.push(cmd),
            Err(e) => log::warn!("skipping {}: {e:#}", path.display()),
        }
    }
    log::info!("loaded {} pads from {}", cmds.len(), dir.display());
    Ok(cmds)
}

pub fn load_bed(channel: PulseChannel, path: &Path, target_rate: u32) -> anyhow::Result<AudioCommand> {
    let buffer = SampleBuffer::load_wav(path, target_rate)?;
    Ok(AudioCommand::SetBed { channel, buffer })
}
