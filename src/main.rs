use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use crossbeam_channel::Sender;
use log::{info, warn};

use ondas::audio::render::{self, Renderer};
use ondas::audio::Engine;
use ondas::audio_api::{AudioCommand, Instruments, PulseChannel};
use ondas::loader::sample_loader;
use ondas::pipeline::generator::{self, Vibe};
use ondas::pipeline::persistence;
use ondas::sequencer::Sequencer;

const SAMPLE_RATE: u32 = 44100;

#[derive(Parser)]
#[command(name = "ondas")]
#[command(about = "Eight-track step sequencer with Euclidean and vibe pattern generation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the pattern to a 16-bit stereo WAV file
    Render {
        #[command(flatten)]
        pattern: PatternArgs,

        /// Output file
        #[arg(long, short, default_value = "ondas.wav")]
        out: PathBuf,

        /// Output sample rate (Hz)
        #[arg(long, default_value_t = SAMPLE_RATE)]
        sample_rate: u32,

        /// Ring-out after the last loop (ms)
        #[arg(long, default_value_t = 1500)]
        tail_ms: u64,
    },

    /// Play the pattern on the default output device (needs the `audio` feature)
    Play {
        #[command(flatten)]
        pattern: PatternArgs,
    },

    /// Print a Euclidean rhythm, e.g. `ondas euclid 3 8`
    Euclid {
        hits: usize,
        steps: usize,
        #[arg(default_value_t = 0)]
        rotation: usize,
    },
}

#[derive(Args)]
struct PatternArgs {
    /// Tempo in BPM (30-300)
    #[arg(long)]
    bpm: Option<f32>,

    /// Swing amount (0-100)
    #[arg(long)]
    swing: Option<f32>,

    /// Generate from a vibe: calm, urban, nature or chaos
    #[arg(long)]
    vibe: Option<Vibe>,

    /// Share of generated hits kept (0-100)
    #[arg(long, default_value_t = 100.0)]
    density: f32,

    /// Above 50, scatter step probabilities (0-100)
    #[arg(long, default_value_t = 0.0)]
    complexity: f32,

    /// Pattern length in steps (1-64)
    #[arg(long)]
    length: Option<usize>,

    /// Number of pattern loops to play
    #[arg(long, default_value_t = 4)]
    loops: u64,

    /// Directory of WAV files; the first eight become pads 1-8
    #[arg(long)]
    kit: Option<PathBuf>,

    /// WAV looped under radio tracks
    #[arg(long)]
    radio: Option<PathBuf>,

    /// WAV looped under mic tracks
    #[arg(long)]
    mic: Option<PathBuf>,

    /// Seed for probability gates and generation
    #[arg(long)]
    seed: Option<u64>,

    /// Project directory; .ondas/project.json is loaded on start and saved on exit
    #[arg(long)]
    project: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run(Cli::parse()) {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Render {
            pattern,
            out,
            sample_rate,
            tail_ms,
        } => render_cmd(&pattern, &out, sample_rate, Duration::from_millis(tail_ms)),
        Command::Play { pattern } => play_cmd(&pattern),
        Command::Euclid {
            hits,
            steps,
            rotation,
        } => {
            let rhythm = generator::generate_euclidean(hits, steps, rotation);
            let line: String = rhythm.iter().map(|&hit| if hit { 'x' } else { '.' }).collect();
            println!("{line}");
            Ok(())
        }
    }
}

fn build_sequencer(args: &PatternArgs, instruments: Instruments) -> anyhow::Result<Sequencer> {
    let mut seq = Sequencer::new(instruments);
    if let Some(seed) = args.seed {
        seq = seq.with_seed(seed);
    }

    let mut loaded = false;
    if let Some(dir) = &args.project {
        if let Some(state) = persistence::load_project(dir)? {
            info!("loaded project from {}", dir.display());
            seq.load_project(state);
            loaded = true;
        }
    }

    if let Some(length) = args.length {
        seq.set_pattern_length(length);
    }
    match args.vibe {
        Some(vibe) => seq.generate_vibe_pattern(vibe, args.density, args.complexity),
        None if !loaded => {
            let s = seq.generate_surprise();
            info!(
                "surprise: {} at {:.0} BPM (density {:.0}%, complexity {:.0}%)",
                s.vibe, s.tempo, s.density, s.complexity
            );
        }
        None => {}
    }
    if let Some(bpm) = args.bpm {
        seq.set_tempo(bpm);
    }
    if let Some(swing) = args.swing {
        seq.set_swing(swing);
    }
    Ok(seq)
}

fn load_sounds(args: &PatternArgs, sample_rate: u32, tx: &Sender<AudioCommand>) -> anyhow::Result<()> {
    let mut cmds = Vec::new();
    if let Some(dir) = &args.kit {
        cmds.extend(sample_loader::load_kit(dir, sample_rate)?);
    }
    if let Some(path) = &args.radio {
        cmds.push(sample_loader::load_bed(PulseChannel::Radio, path, sample_rate)?);
    }
    if let Some(path) = &args.mic {
        cmds.push(sample_loader::load_bed(PulseChannel::Mic, path, sample_rate)?);
    }
    for cmd in cmds {
        if tx.send(cmd).is_err() {
            warn!("audio engine gone before the kit was loaded");
            break;
        }
    }
    Ok(())
}

fn save(args: &PatternArgs, seq: &Sequencer) -> anyhow::Result<()> {
    if let Some(dir) = &args.project {
        persistence::save_project(dir, &seq.project_state())?;
    }
    Ok(())
}

fn render_cmd(args: &PatternArgs, out: &Path, sample_rate: u32, tail: Duration) -> anyhow::Result<()> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);
    load_sounds(args, sample_rate, &tx)?;
    let mut seq = build_sequencer(args, Instruments::from_channel(tx))?;

    let frames = Renderer::new(Engine::new(sample_rate), rx).run(&mut seq, args.loops, tail);
    render::write_wav(out, &frames, sample_rate)?;
    save(args, &seq)
}

#[cfg(feature = "audio")]
fn play_cmd(args: &PatternArgs) -> anyhow::Result<()> {
    use ondas::shared::SequencerEvent;
    use ondas::transport::{self, Transport};

    let audio = ondas::audio::start_audio()?;
    let tx = audio.sender();
    load_sounds(args, audio.sample_rate(), &tx)?;

    let mut seq = build_sequencer(args, Instruments::from_channel(tx))?;
    let events = seq.subscribe();
    let transport = Transport::spawn(transport::shared(seq))?;
    let shared = transport.sequencer();

    transport.play();
    loop {
        match events.recv() {
            Ok(SequencerEvent::Step(_)) => {
                if transport::lock(&shared).loop_count() >= args.loops {
                    break;
                }
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    transport.stop();

    let guard = transport::lock(&shared);
    save(args, &guard)
}

#[cfg(not(feature = "audio"))]
fn play_cmd(_args: &PatternArgs) -> anyhow::Result<()> {
    anyhow::bail!("this build has no live output; rebuild with `--features audio` or use `render`")
}
